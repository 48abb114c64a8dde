//! The transport boundary.
//!
//! A [`Transport`] receives the request parameters and headers for one
//! operation and returns the parsed response. The client never looks at how
//! the request travels.

use crate::error::SdkResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Parameters for a single GraphQL request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Additional request properties, sent next to the standard ones.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl GraphQLParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the variables, leaving them out when empty.
    pub fn variables(mut self, variables: Map<String, JsonValue>) -> Self {
        self.variables = (!variables.is_empty()).then_some(variables);
        self
    }

    pub fn operation_name(mut self, name: Option<String>) -> Self {
        self.operation_name = name;
        self
    }

    pub fn extra(mut self, extra: Map<String, JsonValue>) -> Self {
        self.extra = extra;
        self
    }
}

/// A GraphQL response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, JsonValue>>,
}

impl GraphQLResponse {
    /// A response carrying only `data`.
    pub fn data(data: JsonValue) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

/// A GraphQL error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<HashMap<String, JsonValue>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }
}

/// Sends GraphQL requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        params: GraphQLParams,
        headers: &HashMap<String, String>,
    ) -> SdkResult<GraphQLResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(
        &self,
        params: GraphQLParams,
        headers: &HashMap<String, String>,
    ) -> SdkResult<GraphQLResponse> {
        (**self).fetch(params, headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_serialization() {
        let mut extra = Map::new();
        extra.insert("extensions".into(), json!({ "persisted": true }));
        let params = GraphQLParams::new("query Hello { shop { name } }")
            .operation_name(Some("Hello".into()))
            .extra(extra);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            json!({
                "query": "query Hello { shop { name } }",
                "operationName": "Hello",
                "extensions": { "persisted": true }
            })
        );
    }

    #[test]
    fn test_empty_variables_are_omitted() {
        let params = GraphQLParams::new("{ shop { name } }").variables(Map::new());
        assert!(params.variables.is_none());
    }

    #[test]
    fn test_response_deserialization() {
        let response: GraphQLResponse = serde_json::from_str(
            r#"{"data":null,"errors":[{"message":"boom","path":["shop"]}]}"#,
        )
        .unwrap();
        assert!(response.data.is_none());
        let errors = response.errors.unwrap();
        assert_eq!(errors[0].message, "boom");
        assert_eq!(errors[0].path, Some(vec![json!("shop")]));
    }
}
