//! Query syntax layer for gqlc.
//!
//! This crate provides:
//! - `ast`: Selection sets, operations, documents and argument values
//! - `type_ref`: GraphQL type annotations (`[Product!]!`)
//! - `formatter`: Rendering of operations and documents to query text

pub mod ast;
pub mod formatter;
pub mod type_ref;

pub use ast::*;
pub use formatter::{format_document, format_operation, Formatter};
pub use type_ref::{TypeRef, TypeRefParseError};
