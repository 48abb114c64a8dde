//! Response decoding for gqlc.
//!
//! This crate provides:
//! - `decoder`: Walks an operation's selection sets next to a JSON response
//! - `model`: Decoded models, values and connections
//! - `registry`: Per-type model constructors
//! - `pagination`: Next-page and refetch query construction
//! - `error`: Errors raised while building follow-up queries

pub mod decoder;
pub mod error;
pub mod model;
pub mod pagination;
pub mod registry;

pub use decoder::{decode, decode_operation, DecodeOptions};
pub use error::{ModelError, ModelResult};
pub use model::{Connection, DecodedValue, GraphModel, Model, PageInfo};
pub use pagination::{FollowUpQuery, NodeAnchor, PaginationMetadata};
pub use registry::{ClassRegistry, ModelConstructor};
