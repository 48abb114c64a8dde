//! HTTP transport.
//!
//! A minimal HTTP/1.1 client over `tokio::net::TcpStream`. Plain `http://`
//! only; put a proxy in front of TLS endpoints.

use crate::error::{ErrorCode, ResultExt, SdkError, SdkResult};
use crate::transport::{GraphQLParams, GraphQLResponse, Transport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts requests as JSON to a single endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    timeout: Duration,
    headers: HashMap<String, String>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            headers: HashMap::new(),
        }
    }

    /// Sets the timeout applied to each of connect, write and read.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, body: &str, headers: &HashMap<String, String>) -> SdkResult<String> {
        let (host, port, path) = parse_url(&self.url)?;

        let connect_future = TcpStream::connect(format!("{host}:{port}"));
        let mut stream = timeout(self.timeout, connect_future)
            .await
            .map_err(|_| SdkError::timeout())?
            .map_sdk_err_with(ErrorCode::ConnectionRefused, "Connection failed")?;

        let request = build_request(&host, &path, body, headers);

        timeout(self.timeout, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| SdkError::timeout())?
            .map_sdk_err_with(ErrorCode::NetworkError, "Write failed")?;

        let mut response_bytes = Vec::new();
        timeout(self.timeout, stream.read_to_end(&mut response_bytes))
            .await
            .map_err(|_| SdkError::timeout())?
            .map_sdk_err_with(ErrorCode::NetworkError, "Read failed")?;

        parse_http_response(&String::from_utf8_lossy(&response_bytes))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        params: GraphQLParams,
        headers: &HashMap<String, String>,
    ) -> SdkResult<GraphQLResponse> {
        let body = serde_json::to_string(&params).map_sdk_err(ErrorCode::SerializeError)?;

        let mut merged = self.headers.clone();
        merged.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!(url = %self.url, bytes = body.len(), "posting request");
        let response = self.post(&body, &merged).await?;

        serde_json::from_str(&response).map_sdk_err_with(
            ErrorCode::DeserializeError,
            format!(
                "Failed to parse response body: {}",
                response.chars().take(200).collect::<String>()
            ),
        )
    }
}

fn build_request(host: &str, path: &str, body: &str, headers: &HashMap<String, String>) -> String {
    let mut request = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Content-Type: application/json\r\n\
         Accept: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n",
        body.len()
    );

    for (key, value) in headers {
        request.push_str(&format!("{key}: {value}\r\n"));
    }
    request.push_str("\r\n");
    request.push_str(body);
    request
}

/// Parses a URL into host, port, and path.
fn parse_url(url: &str) -> SdkResult<(String, u16, String)> {
    let url = url.trim();

    if url.starts_with("https://") {
        return Err(SdkError::new(
            ErrorCode::HttpsNotSupported,
            "HTTPS is not supported by HttpTransport. Use a proxy or implement Transport.",
        ));
    }
    let without_protocol = url.strip_prefix("http://").unwrap_or(url);

    let (host_port, path) = match without_protocol.find('/') {
        Some(slash_pos) => without_protocol.split_at(slash_pos),
        None => (without_protocol, "/"),
    };

    if host_port.is_empty() {
        return Err(SdkError::new(
            ErrorCode::InvalidUrl,
            format!("Missing host in `{url}`"),
        ));
    }

    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str.parse().map_err(|_| {
                SdkError::new(ErrorCode::InvalidUrl, format!("Invalid port: {port_str}"))
            })?;
            (host.to_string(), port)
        }
        None => (host_port.to_string(), 80),
    };

    Ok((host, port, path.to_string()))
}

/// Parses an HTTP response and extracts the body.
fn parse_http_response(response: &str) -> SdkResult<String> {
    let status_line = response
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| SdkError::invalid_response("Empty response"))?;

    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| {
            SdkError::invalid_response(format!("Malformed status line: {status_line}"))
        })?;

    if !(200..300).contains(&status) {
        return Err(
            SdkError::new(ErrorCode::HttpError, format!("HTTP error: {status_line}"))
                .with_extension("status", status),
        );
    }

    let (head, body) = response
        .split_once("\r\n\r\n")
        .or_else(|| response.split_once("\n\n"))
        .ok_or_else(|| SdkError::invalid_response("Could not find response body"))?;

    let chunked = head.lines().any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.trim().eq_ignore_ascii_case("chunked")
        })
    });

    if chunked {
        parse_chunked_body(body)
    } else {
        Ok(body.to_string())
    }
}

/// Parses a chunked transfer encoding body.
fn parse_chunked_body(body: &str) -> SdkResult<String> {
    let mut result = String::new();
    let mut remaining = body;

    loop {
        let Some((size_line, rest)) = remaining.split_once('\n') else {
            break;
        };

        // Chunk extensions after `;` are ignored.
        let size_str = size_line.trim().split(';').next().unwrap_or_default();
        let chunk_size = usize::from_str_radix(size_str.trim(), 16).map_err(|_| {
            SdkError::invalid_response(format!("Invalid chunk size: {size_str}"))
        })?;
        if chunk_size == 0 {
            break;
        }

        let Some(chunk) = rest.get(..chunk_size) else {
            result.push_str(rest);
            break;
        };
        result.push_str(chunk);

        remaining = &rest[chunk_size..];
        remaining = remaining
            .strip_prefix("\r\n")
            .or_else(|| remaining.strip_prefix('\n'))
            .unwrap_or(remaining);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        let (host, port, path) = parse_url("http://localhost:4000/graphql").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 4000);
        assert_eq!(path, "/graphql");

        let (host, port, path) = parse_url("http://example.com").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(port, 80);
        assert_eq!(path, "/");
    }

    #[test]
    fn test_parse_url_errors() {
        assert_eq!(
            parse_url("https://example.com/graphql").unwrap_err().code,
            ErrorCode::HttpsNotSupported
        );
        assert_eq!(
            parse_url("http://example.com:http/graphql").unwrap_err().code,
            ErrorCode::InvalidUrl
        );
        assert_eq!(parse_url("http:///graphql").unwrap_err().code, ErrorCode::InvalidUrl);
    }

    #[test]
    fn test_parse_http_response() {
        let response = "HTTP/1.1 200 OK\r\n\
                       Content-Type: application/json\r\n\
                       \r\n\
                       {\"data\":{\"shop\":{\"name\":\"Hats\"}}}";
        let body = parse_http_response(response).unwrap();
        assert_eq!(body, "{\"data\":{\"shop\":{\"name\":\"Hats\"}}}");
    }

    #[test]
    fn test_parse_http_error_status() {
        let response = "HTTP/1.1 502 Bad Gateway\r\n\r\n";
        let err = parse_http_response(response).unwrap_err();
        assert_eq!(err.code, ErrorCode::HttpError);
        assert_eq!(
            err.extensions.get("status"),
            Some(&serde_json::json!(502))
        );

        assert_eq!(
            parse_http_response("").unwrap_err().code,
            ErrorCode::InvalidResponse
        );
    }

    #[test]
    fn test_chunked_response() {
        let response = "HTTP/1.1 200 OK\r\n\
                        transfer-encoding: chunked\r\n\
                        \r\n\
                        5\r\nhello\r\n5\r\nworld\r\n0\r\n\r\n";
        assert_eq!(parse_http_response(response).unwrap(), "helloworld");
    }

    #[test]
    fn test_chunked_body_parsing() {
        let chunked = "5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\n";
        assert_eq!(parse_chunked_body(chunked).unwrap(), "hello world");
        assert!(parse_chunked_body("zz\r\nhello\r\n").is_err());
    }

    #[test]
    fn test_build_request() {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer token".to_string());
        let request = build_request("localhost", "/graphql", "{}", &headers);
        assert!(request.starts_with("POST /graphql HTTP/1.1\r\nHost: localhost\r\n"));
        assert!(request.contains("Content-Length: 2\r\n"));
        assert!(request.contains("Authorization: Bearer token\r\n"));
        assert!(request.ends_with("\r\n\r\n{}"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_https_before_connecting() {
        let transport = HttpTransport::new("https://shop.example/graphql")
            .timeout(Duration::from_millis(10));
        let err = transport
            .fetch(GraphQLParams::new("{ shop { name } }"), &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::HttpsNotSupported);
    }
}
