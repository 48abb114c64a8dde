//! Build errors.

use gqlc_syntax::TypeRefParseError;
use thiserror::Error;

/// Result type for builder operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors raised while building selection sets, operations and documents.
///
/// Every variant carries the names needed to locate the offending selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unknown type `{type_name}`")]
    UnknownType { type_name: String },

    #[error("type `{type_name}` has no field `{field_name}`")]
    UnknownField {
        type_name: String,
        field_name: String,
    },

    #[error("field `{type_name}.{field_name}` has no argument `{argument}`")]
    UnknownArgument {
        type_name: String,
        field_name: String,
        argument: String,
    },

    #[error(
        "field `{type_name}.{field_name}` returns `{return_type}`, which needs a sub-selection"
    )]
    SubselectionRequired {
        type_name: String,
        field_name: String,
        return_type: String,
    },

    #[error(
        "field `{type_name}.{field_name}` returns leaf type `{return_type}` and cannot take a sub-selection"
    )]
    SubselectionForbidden {
        type_name: String,
        field_name: String,
        return_type: String,
    },

    #[error("field `{type_name}.{field_name}` returns `{return_type}`, which is not a connection")]
    NotAConnection {
        type_name: String,
        field_name: String,
        return_type: String,
    },

    #[error("selection on `{type_name}` is empty")]
    EmptySelection { type_name: String },

    #[error("a fragment on `{type_condition}` can never apply within `{scope}`")]
    InvalidFragmentType {
        scope: String,
        type_condition: String,
    },

    #[error("argument `{argument}` of `{type_name}.{field_name}` is not a finite number")]
    NonFiniteFloat {
        type_name: String,
        field_name: String,
        argument: String,
    },

    #[error("variable `${name}` is used but not declared")]
    UndeclaredVariable { name: String },

    #[error("variable `${name}` is declared more than once")]
    DuplicateVariable { name: String },

    #[error("variable `${name}`: {source}")]
    InvalidVariableType {
        name: String,
        #[source]
        source: TypeRefParseError,
    },

    #[error("`{type_name}` already selects a different field as `{response_key}`")]
    DuplicateField {
        type_name: String,
        response_key: String,
    },

    #[error("the schema has no mutation root type")]
    NoMutationType,

    #[error("the document already has an operation named `{name}`")]
    DuplicateOperationName { name: String },

    #[error("an anonymous operation must be the only operation in its document")]
    AnonymousOperationInDocument,

    #[error("the document already defines a different fragment named `{name}`")]
    DuplicateFragmentName { name: String },
}
