//! Type bundle for gqlc.
//!
//! A type bundle is the static schema description every builder and decoder
//! validates against:
//! - `types`: Type and field descriptors
//! - `bundle`: The bundle itself, its builder and consistency checks
//! - `loader`: JSON loading

pub mod bundle;
pub mod loader;
pub mod types;

pub use bundle::{BundleIssue, TypeBundle, TypeBundleBuilder, BUILTIN_SCALARS, NODE_FIELD};
pub use gqlc_syntax::TypeRef;
pub use loader::SchemaLoadError;
pub use types::{FieldDescriptor, TypeDescriptor, TypeKind};
