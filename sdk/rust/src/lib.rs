//! gqlc SDK
//!
//! This crate ties the query builders and the response decoder to a
//! transport. Build operations against a type bundle, send them, and get back
//! models that know how to fetch their next page or refetch themselves.
//!
//! # Client
//!
//! ```ignore
//! use gqlc_sdk::{Client, FieldOptions, HttpTransport, TypeBundle};
//! use std::sync::Arc;
//!
//! let bundle = Arc::new(TypeBundle::from_path("shop_bundle.json")?);
//! let client = Client::new(bundle, HttpTransport::new("http://localhost:4000/graphql"));
//!
//! let query = client.query(|root| {
//!     root.add("shop", |shop| {
//!         shop.add_connection("products", FieldOptions::new().arg("first", 10), |product| {
//!             product.add_field("title")
//!         })
//!     })
//! })?;
//!
//! let root = client.send(&query, Default::default()).await?.into_model()?;
//! let products = root
//!     .model()
//!     .drill(&["shop", "products"])
//!     .and_then(|value| value.as_connection())
//!     .ok_or("no products")?;
//! let everything = client.fetch_all_pages(products).await?;
//! ```
//!
//! # Custom transports
//!
//! Implement [`Transport`] to send requests some other way (TLS, retries,
//! persisted queries). The client hands it the serialized request and the
//! merged headers.

pub mod client;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{Client, ClientConfig, ClientResponse, SendOptions};
pub use error::{ErrorCode, ResultExt, SdkError, SdkResult, Stage};
pub use http::HttpTransport;
pub use transport::{GraphQLError, GraphQLParams, GraphQLResponse, Transport};

// Re-exports for convenience
pub use gqlc_builder::{
    BuildError, DocumentBuilder, FieldOptions, OperationBuilder, SelectionSetBuilder, TypeTracker,
};
pub use gqlc_runtime::{ClassRegistry, Connection, DecodedValue, GraphModel, Model, PageInfo};
pub use gqlc_schema::TypeBundle;
pub use gqlc_syntax::{Directive, Document, Operation, OperationKind, Value};
