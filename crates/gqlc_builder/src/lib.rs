//! Schema-validated query builders for gqlc.
//!
//! This crate provides:
//! - `selection_set_builder`: Field, connection and fragment selections checked against a type bundle
//! - `operation_builder`: Query and mutation operations with variable definitions
//! - `document_builder`: Documents holding several operations and shared fragments
//! - `tracker`: Recording of the schema types a build touches
//! - `error`: Build errors
//!
//! # Example
//!
//! ```ignore
//! use gqlc_builder::{FieldOptions, OperationBuilder};
//!
//! let query = OperationBuilder::query(&bundle)
//!     .name("FirstProducts")
//!     .variable_with_default("first", "Int", 10)
//!     .build(|root| {
//!         root.add("shop", |shop| {
//!             shop.add_field("name")?;
//!             shop.add_connection(
//!                 "products",
//!                 FieldOptions::new().arg("first", Value::variable("first")),
//!                 |product| product.add_field("title"),
//!             )
//!         })
//!     })?;
//! ```

pub mod document_builder;
pub mod error;
pub mod operation_builder;
pub mod selection_set_builder;
pub mod tracker;

pub use document_builder::DocumentBuilder;
pub use error::{BuildError, BuildResult};
pub use operation_builder::OperationBuilder;
pub use selection_set_builder::{FieldOptions, SelectionSetBuilder};
pub use tracker::{NoopRecorder, TypeRecorder, TypeTracker};
