//! The gqlc client.
//!
//! A [`Client`] pairs a type bundle with a [`Transport`]. It serializes built
//! operations, sends them, and decodes the response into models. Pagination
//! and refetching go through the same path with the follow-up queries the
//! models construct.
//!
//! # Example
//!
//! ```ignore
//! use gqlc_sdk::{Client, FieldOptions, HttpTransport};
//!
//! let client = Client::new(bundle, HttpTransport::new("http://localhost:4000/graphql"));
//! let query = client.query(|root| {
//!     root.add("shop", |shop| {
//!         shop.add_connection("products", FieldOptions::new().arg("first", 10), |product| {
//!             product.add_field("title")
//!         })
//!     })
//! })?;
//!
//! let root = client.send(&query, Default::default()).await?.into_model()?;
//! ```

use crate::error::{ErrorCode, SdkError, SdkResult};
use crate::transport::{GraphQLError, GraphQLParams, Transport};
use gqlc_builder::{BuildResult, DocumentBuilder, OperationBuilder, SelectionSetBuilder};
use gqlc_runtime::{
    decode_operation, ClassRegistry, Connection, DecodeOptions, DecodedValue, FollowUpQuery,
    GraphModel, Model,
};
use gqlc_schema::TypeBundle;
use gqlc_syntax::{Directive, Document, Operation, OperationKind};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Headers sent with every request.
    pub headers: HashMap<String, String>,
    /// Directive appended to every operation sent, e.g. `@inContext(country: CA)`.
    pub context_directive: Option<Directive>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn context_directive(mut self, directive: Directive) -> Self {
        self.context_directive = Some(directive);
        self
    }
}

/// Options for [`Client::send_document`].
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Operation to run. Required when the document defines more than one.
    pub operation_name: Option<String>,
    pub variables: Map<String, JsonValue>,
    /// Additional request properties.
    pub extra: Map<String, JsonValue>,
    /// Headers for this request only.
    pub headers: HashMap<String, String>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn variables(mut self, variables: Map<String, JsonValue>) -> Self {
        self.variables = variables;
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// A response with its data decoded.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    /// The decoded root model, when the response carried data.
    pub model: Option<Arc<dyn GraphModel>>,
    pub data: Option<JsonValue>,
    pub errors: Vec<GraphQLError>,
    pub extensions: Option<Map<String, JsonValue>>,
}

impl ClientResponse {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the root model, failing if the response carried any errors.
    pub fn into_model(self) -> SdkResult<Arc<dyn GraphModel>> {
        if let Some(first) = self.errors.first() {
            return Err(
                SdkError::new(ErrorCode::ExecutionError, first.message.clone())
                    .with_extension("errors", &self.errors),
            );
        }
        self.model
            .ok_or_else(|| SdkError::new(ErrorCode::NoData, "Response carried no data"))
    }
}

/// The gqlc client.
#[derive(Clone)]
pub struct Client {
    bundle: Arc<TypeBundle>,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    registry: Option<Arc<ClassRegistry>>,
}

impl Client {
    pub fn new(bundle: Arc<TypeBundle>, transport: impl Transport + 'static) -> Self {
        Self {
            bundle,
            transport: Arc::new(transport),
            config: ClientConfig::default(),
            registry: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Decodes registered types with their application constructors.
    pub fn with_registry(mut self, registry: ClassRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn bundle(&self) -> &Arc<TypeBundle> {
        &self.bundle
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts building an operation against this client's bundle.
    pub fn operation(&self, kind: OperationKind) -> OperationBuilder<'_> {
        OperationBuilder::new(&self.bundle, kind)
    }

    pub fn document(&self) -> DocumentBuilder<'_> {
        DocumentBuilder::new(&self.bundle)
    }

    /// Builds an anonymous query.
    pub fn query<F>(&self, build: F) -> SdkResult<Operation>
    where
        F: for<'b> FnOnce(&mut SelectionSetBuilder<'b>) -> BuildResult<()>,
    {
        Ok(OperationBuilder::query(&self.bundle).build(build)?)
    }

    /// Builds an anonymous mutation.
    pub fn mutation<F>(&self, build: F) -> SdkResult<Operation>
    where
        F: for<'b> FnOnce(&mut SelectionSetBuilder<'b>) -> BuildResult<()>,
    {
        Ok(OperationBuilder::mutation(&self.bundle).build(build)?)
    }

    /// Sends a single operation.
    pub async fn send(
        &self,
        operation: &Operation,
        variables: Map<String, JsonValue>,
    ) -> SdkResult<ClientResponse> {
        self.send_shared(&Arc::new(operation.clone()), variables)
            .await
    }

    /// Sends one operation of `document`.
    ///
    /// The operation is selected before anything is sent: a document with
    /// several operations and no `operation_name` fails without a request.
    pub async fn send_document(
        &self,
        document: &Document,
        options: SendOptions,
    ) -> SdkResult<ClientResponse> {
        let operation = Arc::clone(document.operation(options.operation_name.as_deref())?);

        let params = GraphQLParams::new(
            document.to_query_string(self.config.context_directive.as_ref()),
        )
        .variables(options.variables.clone())
        .operation_name(operation.name.clone())
        .extra(options.extra);

        self.execute(&operation, params, options.variables, &options.headers)
            .await
    }

    /// Fetches the page after `connection`.
    pub async fn fetch_next_page(&self, connection: &Connection) -> SdkResult<Connection> {
        let next = connection.next_page_query_and_path()?;
        let root = self.send_follow_up(&next).await?;
        root.model()
            .drill(&next.path)
            .and_then(DecodedValue::as_connection)
            .cloned()
            .ok_or_else(|| {
                SdkError::invalid_response(format!(
                    "No connection at `{}` in next page",
                    next.path.join(".")
                ))
            })
    }

    /// Fetches every page after `connection`, one request at a time, and
    /// returns all nodes including the ones already loaded.
    pub async fn fetch_all_pages(
        &self,
        connection: &Connection,
    ) -> SdkResult<Vec<Arc<dyn GraphModel>>> {
        let mut nodes = connection.nodes.clone();
        let mut current = connection.clone();

        while current.has_next_page() && !current.is_empty() {
            current = self.fetch_next_page(&current).await?;
            nodes.extend(current.nodes.iter().cloned());
        }

        debug!(count = nodes.len(), "fetched all pages");
        Ok(nodes)
    }

    /// Reloads `model` through the `node` root field.
    pub async fn refetch(&self, model: &Model) -> SdkResult<Arc<dyn GraphModel>> {
        let refetch = model.refetch_query()?;
        let root = self.send_follow_up(&refetch).await?;
        match root.model().drill(&refetch.path) {
            Some(DecodedValue::Object(node)) => Ok(Arc::clone(node)),
            Some(DecodedValue::Null) | None => Err(SdkError::not_found(format!(
                "{} `{}`",
                model.type_name(),
                model.id().unwrap_or_default()
            ))),
            Some(_) => Err(SdkError::invalid_response("Refetched node is not an object")),
        }
    }

    async fn send_follow_up(&self, follow_up: &FollowUpQuery) -> SdkResult<Arc<dyn GraphModel>> {
        self.send(&follow_up.operation, follow_up.variables.clone())
            .await?
            .into_model()
    }

    async fn send_shared(
        &self,
        operation: &Arc<Operation>,
        variables: Map<String, JsonValue>,
    ) -> SdkResult<ClientResponse> {
        let params = GraphQLParams::new(
            operation.to_query_string(self.config.context_directive.as_ref()),
        )
        .variables(variables.clone())
        .operation_name(operation.name.clone());

        self.execute(operation, params, variables, &HashMap::new())
            .await
    }

    async fn execute(
        &self,
        operation: &Arc<Operation>,
        params: GraphQLParams,
        variables: Map<String, JsonValue>,
        headers: &HashMap<String, String>,
    ) -> SdkResult<ClientResponse> {
        let mut merged = self.config.headers.clone();
        merged.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!(
            operation = operation.name.as_deref().unwrap_or("<anonymous>"),
            kind = operation.kind.keyword(),
            "sending operation"
        );
        let response = self.transport.fetch(params, &merged).await?;

        let errors = response.errors.unwrap_or_default();
        if !errors.is_empty() {
            warn!(count = errors.len(), "response carried errors");
        }

        let options = DecodeOptions {
            registry: self.registry.clone(),
            variables,
        };
        let model = response
            .data
            .as_ref()
            .filter(|data| !data.is_null())
            .map(|data| decode_operation(&self.bundle, operation, data, &options));

        Ok(ClientResponse {
            model,
            data: response.data,
            errors,
            extensions: response.extensions,
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlc_syntax::Value;

    #[test]
    fn test_client_config() {
        let config = ClientConfig::new()
            .header("Authorization", "Bearer token")
            .context_directive(Directive::new("inContext").arg("country", Value::enum_value("CA")));

        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
        assert_eq!(
            config.context_directive.map(|d| d.name),
            Some("inContext".to_string())
        );
    }

    #[test]
    fn test_into_model_reports_errors() {
        let response = ClientResponse {
            model: None,
            data: None,
            errors: vec![GraphQLError::new("Throttled")],
            extensions: None,
        };
        assert!(response.has_errors());
        let err = response.into_model().unwrap_err();
        assert_eq!(err.code, ErrorCode::ExecutionError);
        assert_eq!(err.message, "Throttled");

        let empty = ClientResponse {
            model: None,
            data: None,
            errors: Vec::new(),
            extensions: None,
        };
        assert_eq!(empty.into_model().unwrap_err().code, ErrorCode::NoData);
    }
}
