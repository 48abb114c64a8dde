//! Errors raised while building follow-up queries from decoded models.

use gqlc_builder::BuildError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Model error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("`{type_name}` does not implement Node and cannot be refetched")]
    NotNodeType { type_name: String },

    #[error("`{type_name}` was decoded without an `id`")]
    MissingNodeId { type_name: String },

    #[error("the query root has no `node` field")]
    NoNodeField,

    #[error("`{type_name}` was not decoded from a connection")]
    NoPagination { type_name: String },

    #[error("the connection has no edges to paginate from")]
    EmptyConnection,

    #[error("the originating operation has no selection at `{path}`")]
    PathNotFound { path: String },

    #[error(transparent)]
    Build(#[from] BuildError),
}
