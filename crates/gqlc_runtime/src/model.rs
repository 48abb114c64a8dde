//! Decoded models, values and connections.

use crate::error::{ModelError, ModelResult};
use crate::pagination::{self, FollowUpQuery, PaginationMetadata};
use gqlc_schema::{TypeBundle, TypeDescriptor};
use gqlc_syntax::{Operation, SelectionSet};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A decoded object, either a plain [`Model`] or a registered wrapper around one.
pub trait GraphModel: Any + fmt::Debug + Send + Sync {
    fn model(&self) -> &Model;

    fn as_any(&self) -> &dyn Any;
}

impl dyn GraphModel {
    /// Returns the concrete wrapper if it is a `T`.
    pub fn downcast_ref<T: GraphModel>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A decoded field value.
#[derive(Debug, Clone)]
pub enum DecodedValue {
    Null,
    /// Scalar or enum, including lists of them, as received.
    Scalar(JsonValue),
    Object(Arc<dyn GraphModel>),
    List(Vec<DecodedValue>),
    Connection(Connection),
}

impl DecodedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Scalar(JsonValue::Null))
    }

    pub fn as_scalar(&self) -> Option<&JsonValue> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(JsonValue::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(JsonValue::as_bool)
    }

    pub fn as_object(&self) -> Option<&Arc<dyn GraphModel>> {
        match self {
            Self::Object(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DecodedValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_connection(&self) -> Option<&Connection> {
        match self {
            Self::Connection(connection) => Some(connection),
            _ => None,
        }
    }
}

/// Page info of a decoded connection.
///
/// Cursors fall back to the first and last edge cursors when the response
/// does not carry `startCursor` / `endCursor`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// A decoded connection field: its `edges.node` models in order.
#[derive(Debug, Clone)]
pub struct Connection {
    pub nodes: Vec<Arc<dyn GraphModel>>,
    pub page_info: PageInfo,
    /// Present when the connection has at least one edge, positioned at the last edge cursor.
    pub pagination: Option<PaginationMetadata>,
}

impl Connection {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.nodes.iter().map(|node| node.model())
    }

    pub fn has_next_page(&self) -> bool {
        self.page_info.has_next_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_info.has_previous_page
    }

    /// Builds the query for the page after the last node.
    pub fn next_page_query_and_path(&self) -> ModelResult<FollowUpQuery> {
        self.pagination
            .as_ref()
            .ok_or(ModelError::EmptyConnection)?
            .next_page_query_and_path()
    }
}

/// A decoded object.
#[derive(Clone)]
pub struct Model {
    pub(crate) bundle: Arc<TypeBundle>,
    pub(crate) ty: Arc<TypeDescriptor>,
    pub(crate) selection_set: Arc<SelectionSet>,
    pub(crate) values: IndexMap<String, DecodedValue>,
    pub(crate) operation: Arc<Operation>,
    pub(crate) variables: Arc<Map<String, JsonValue>>,
    pub(crate) pagination: Option<PaginationMetadata>,
}

impl Model {
    /// The concrete type this object was decoded as.
    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        &self.ty.name
    }

    /// The value answering to `response_key`; absent when the response omitted it.
    pub fn get(&self, response_key: &str) -> Option<&DecodedValue> {
        self.values.get(response_key)
    }

    pub fn values(&self) -> &IndexMap<String, DecodedValue> {
        &self.values
    }

    /// The `id` field, if it was selected and is a string.
    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(DecodedValue::as_str)
    }

    /// Variable values of the operation this model was decoded for.
    pub fn variables(&self) -> &Map<String, JsonValue> {
        &self.variables
    }

    /// The selection set this object was decoded with.
    pub fn selection_set(&self) -> &Arc<SelectionSet> {
        &self.selection_set
    }

    pub fn operation(&self) -> &Arc<Operation> {
        &self.operation
    }

    pub fn bundle(&self) -> &Arc<TypeBundle> {
        &self.bundle
    }

    /// Pagination metadata; only set on nodes decoded from a connection.
    pub fn pagination(&self) -> Option<&PaginationMetadata> {
        self.pagination.as_ref()
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.as_ref().is_some_and(|p| p.has_next_page)
    }

    pub fn has_previous_page(&self) -> bool {
        self.pagination.as_ref().is_some_and(|p| p.has_previous_page)
    }

    /// The cursor of the edge this node was decoded from.
    pub fn cursor(&self) -> Option<&str> {
        self.pagination.as_ref().map(|p| p.cursor.as_str())
    }

    /// Follows `path` of response keys through nested objects.
    pub fn drill<S: AsRef<str>>(&self, path: &[S]) -> Option<&DecodedValue> {
        let (first, rest) = path.split_first()?;
        let mut current = self.values.get(first.as_ref())?;
        for key in rest {
            current = match current {
                DecodedValue::Object(model) => model.model().get(key.as_ref())?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Builds the query for the page after this node.
    pub fn next_page_query_and_path(&self) -> ModelResult<FollowUpQuery> {
        self.pagination
            .as_ref()
            .ok_or_else(|| ModelError::NoPagination {
                type_name: self.ty.name.clone(),
            })?
            .next_page_query_and_path()
    }

    /// Builds `node(id: ..) { ... on Type { .. } }` re-selecting this model.
    pub fn refetch_query(&self) -> ModelResult<FollowUpQuery> {
        pagination::refetch_query(self)
    }
}

impl GraphModel for Model {
    fn model(&self) -> &Model {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type", &self.ty.name)
            .field("values", &self.values)
            .field("cursor", &self.cursor())
            .finish_non_exhaustive()
    }
}
