//! Client errors.
//!
//! An [`SdkError`] says which stage of a round trip failed through its
//! [`ErrorCode`]. Builder, document and model errors convert with `From`;
//! transport failures keep the underlying I/O or JSON error as their source.

use gqlc_builder::BuildError;
use gqlc_runtime::ModelError;
use gqlc_syntax::OperationSelectionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Where in a round trip an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Before anything was sent: building, selecting or following up a query.
    Client,
    /// Getting the request to the server and the response back.
    Transport,
    /// The server answered, but not with usable data.
    Server,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    BuildError,
    NoOperation,
    PaginationError,
    RefetchError,
    InvalidUrl,
    HttpsNotSupported,
    SerializeError,

    ConnectionRefused,
    NetworkError,
    Timeout,
    HttpError,
    InvalidResponse,
    DeserializeError,

    ExecutionError,
    NoData,
    NotFound,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BuildError => "BUILD_ERROR",
            Self::NoOperation => "NO_OPERATION",
            Self::PaginationError => "PAGINATION_ERROR",
            Self::RefetchError => "REFETCH_ERROR",
            Self::InvalidUrl => "INVALID_URL",
            Self::HttpsNotSupported => "HTTPS_NOT_SUPPORTED",
            Self::SerializeError => "SERIALIZE_ERROR",
            Self::ConnectionRefused => "CONNECTION_REFUSED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::HttpError => "HTTP_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::DeserializeError => "DESERIALIZE_ERROR",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::NoData => "NO_DATA",
            Self::NotFound => "NOT_FOUND",
        }
    }

    pub const fn stage(&self) -> Stage {
        match self {
            Self::BuildError
            | Self::NoOperation
            | Self::PaginationError
            | Self::RefetchError
            | Self::InvalidUrl
            | Self::HttpsNotSupported
            | Self::SerializeError => Stage::Client,
            Self::ConnectionRefused
            | Self::NetworkError
            | Self::Timeout
            | Self::HttpError
            | Self::InvalidResponse
            | Self::DeserializeError => Stage::Transport,
            Self::ExecutionError | Self::NoData | Self::NotFound => Stage::Server,
        }
    }

    /// Sending the same request again may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused | Self::NetworkError | Self::Timeout
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by the client and its transports.
#[derive(Error, Debug, Clone, Serialize)]
#[error("[{code}] {message}")]
pub struct SdkError {
    pub code: ErrorCode,
    pub message: String,
    /// Server error entries, HTTP status and similar details.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, JsonValue>,
    #[source]
    #[serde(skip)]
    pub source: Option<Cause>,
}

impl SdkError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            extensions: Map::new(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Values that fail to serialize are dropped.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.extensions.insert(key.into(), value);
        }
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, "Request timed out")
    }

    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{resource} not found"))
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    pub fn stage(&self) -> Stage {
        self.code.stage()
    }

    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl From<BuildError> for SdkError {
    fn from(error: BuildError) -> Self {
        Self::new(ErrorCode::BuildError, error.to_string()).with_source(error)
    }
}

impl From<OperationSelectionError> for SdkError {
    fn from(error: OperationSelectionError) -> Self {
        Self::new(ErrorCode::NoOperation, error.to_string()).with_source(error)
    }
}

impl From<ModelError> for SdkError {
    fn from(error: ModelError) -> Self {
        let code = match &error {
            ModelError::Build(inner) => return inner.clone().into(),
            ModelError::NotNodeType { .. }
            | ModelError::MissingNodeId { .. }
            | ModelError::NoNodeField => ErrorCode::RefetchError,
            _ => ErrorCode::PaginationError,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

pub type SdkResult<T> = std::result::Result<T, SdkError>;

/// Tags foreign errors with an [`ErrorCode`], keeping them as the source.
pub trait ResultExt<T> {
    fn map_sdk_err(self, code: ErrorCode) -> SdkResult<T>;

    /// Like `map_sdk_err`, with `message` in front of the original one.
    fn map_sdk_err_with(self, code: ErrorCode, message: impl Into<String>) -> SdkResult<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn map_sdk_err(self, code: ErrorCode) -> SdkResult<T> {
        self.map_err(|error| SdkError::new(code, error.to_string()).with_source(error))
    }

    fn map_sdk_err_with(self, code: ErrorCode, message: impl Into<String>) -> SdkResult<T> {
        self.map_err(|error| {
            SdkError::new(code, format!("{}: {error}", message.into())).with_source(error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_stages() {
        assert_eq!(ErrorCode::NoOperation.stage(), Stage::Client);
        assert_eq!(ErrorCode::DeserializeError.stage(), Stage::Transport);
        assert_eq!(ErrorCode::ExecutionError.stage(), Stage::Server);

        assert!(SdkError::timeout().is_transient());
        assert!(!SdkError::not_found("node").is_transient());
    }

    #[test]
    fn test_serialize_skips_source() {
        let err = SdkError::new(ErrorCode::HttpError, "HTTP error: 502")
            .with_extension("status", 502)
            .with_source(std::io::Error::other("reset"));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({
                "code": "HTTP_ERROR",
                "message": "HTTP error: 502",
                "extensions": { "status": 502 },
            })
        );

        let bare = serde_json::to_value(SdkError::network("down")).unwrap();
        assert!(bare.get("extensions").is_none());
    }

    #[test]
    fn test_from_lower_level_errors() {
        let err: SdkError = OperationSelectionError::Ambiguous { count: 2 }.into();
        assert_eq!(err.code, ErrorCode::NoOperation);
        assert!(err.to_string().starts_with("[NO_OPERATION]"));
        assert!(err.source().is_some());

        let err: SdkError = ModelError::NoNodeField.into();
        assert_eq!(err.code, ErrorCode::RefetchError);

        let err: SdkError = ModelError::Build(BuildError::NoMutationType).into();
        assert_eq!(err.code, ErrorCode::BuildError);

        let err: SdkError = ModelError::EmptyConnection.into();
        assert_eq!(err.code, ErrorCode::PaginationError);
    }

    #[test]
    fn test_map_sdk_err_keeps_source() {
        let result: Result<JsonValue, _> = serde_json::from_str("{");
        let err = result
            .map_sdk_err_with(ErrorCode::DeserializeError, "Bad body")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeserializeError);
        assert!(err.message.starts_with("Bad body: "));
        let original = serde_json::from_str::<JsonValue>("{").unwrap_err();
        assert_eq!(
            err.source().map(ToString::to_string),
            Some(original.to_string())
        );
    }
}
