//! JSON loading of type bundles.
//!
//! ```json
//! {
//!   "queryType": "QueryRoot",
//!   "mutationType": "Mutation",
//!   "types": {
//!     "Shop": {
//!       "kind": "OBJECT",
//!       "fields": {
//!         "name": { "type": "String!" },
//!         "products": { "type": "ProductConnection!", "args": { "first": "Int" } }
//!       }
//!     },
//!     "Node": { "kind": "INTERFACE", "implementsNode": true, "possibleTypes": ["Product"] }
//!   }
//! }
//! ```
//!
//! Type and field names default to their map keys.

use crate::bundle::{TypeBundle, TypeBundleBuilder};
use crate::types::{FieldDescriptor, TypeDescriptor, TypeKind};
use gqlc_syntax::{TypeRef, TypeRefParseError};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a type bundle.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("failed to read type bundle `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid type bundle JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{type_name}.{field_name}`: {source}")]
    InvalidTypeAnnotation {
        type_name: String,
        field_name: String,
        #[source]
        source: TypeRefParseError,
    },

    #[error("the type bundle does not name a query root type")]
    MissingQueryType,

    #[error("root type `{0}` is not defined in the type bundle")]
    UnknownRootType(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBundle {
    query_type: Option<String>,
    #[serde(default)]
    mutation_type: Option<String>,
    #[serde(default)]
    types: IndexMap<String, RawType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawType {
    #[serde(default)]
    name: Option<String>,
    kind: TypeKind,
    #[serde(default)]
    fields: IndexMap<String, RawField>,
    #[serde(default)]
    possible_types: Vec<String>,
    #[serde(default)]
    implements_node: bool,
    #[serde(default)]
    enum_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    args: IndexMap<String, String>,
}

impl TypeBundle {
    /// Loads a bundle from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaLoadError> {
        let raw: RawBundle = serde_json::from_str(json)?;
        raw.into_bundle()
    }

    /// Loads a bundle from an already parsed JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, SchemaLoadError> {
        let raw: RawBundle = serde_json::from_value(value)?;
        raw.into_bundle()
    }

    /// Loads a bundle from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

impl RawBundle {
    fn into_bundle(self) -> Result<TypeBundle, SchemaLoadError> {
        let mut builder = TypeBundleBuilder::new();
        if let Some(query_type) = self.query_type {
            builder = builder.query_type(query_type);
        }
        if let Some(mutation_type) = self.mutation_type {
            builder = builder.mutation_type(mutation_type);
        }

        for (key, raw) in self.types {
            let name = raw.name.unwrap_or(key);
            let mut ty = TypeDescriptor::new(name, raw.kind);
            ty.possible_types = raw.possible_types;
            ty.implements_node = raw.implements_node;
            ty.enum_values = raw.enum_values;

            for (field_name, raw_field) in raw.fields {
                let annotation_error = |source| SchemaLoadError::InvalidTypeAnnotation {
                    type_name: ty.name.clone(),
                    field_name: field_name.clone(),
                    source,
                };
                let return_type: TypeRef = raw_field.ty.parse().map_err(annotation_error)?;
                let mut field = FieldDescriptor::new(field_name.clone(), return_type);
                for (arg_name, arg_ty) in raw_field.args {
                    let arg_ty: TypeRef = arg_ty.parse().map_err(annotation_error)?;
                    field.arguments.insert(arg_name, arg_ty);
                }
                ty.fields.insert(field_name.clone(), field);
            }

            builder = builder.add_type(ty);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP_BUNDLE: &str = include_str!("../../../fixtures/shop_bundle.json");

    #[test]
    fn test_load_fixture() {
        let bundle = TypeBundle::from_json_str(SHOP_BUNDLE).unwrap();
        assert_eq!(bundle.query_root().name, "QueryRoot");
        assert_eq!(bundle.mutation_root().unwrap().name, "Mutation");

        let shop = bundle.get("Shop").unwrap();
        let products = shop.get_field("products").unwrap();
        assert_eq!(products.return_type.to_string(), "ProductConnection!");
        assert_eq!(products.arguments["first"], TypeRef::named("Int"));

        let node = bundle.get("Node").unwrap();
        assert!(node.implements_node);
        assert!(node.can_be("ProductVariant"));

        assert!(bundle.get("Float").is_some(), "built-in scalars are always present");
        assert!(bundle.validate().is_empty());
    }

    #[test]
    fn test_load_rejects_bad_annotations() {
        let err = TypeBundle::from_json_str(
            r#"{
                "queryType": "QueryRoot",
                "types": {
                    "QueryRoot": { "kind": "OBJECT", "fields": { "shop": { "type": "[Shop" } } }
                }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaLoadError::InvalidTypeAnnotation { ref field_name, .. } if field_name == "shop"
        ));
    }

    #[test]
    fn test_load_rejects_missing_root() {
        let err = TypeBundle::from_json_str(r#"{ "types": {} }"#).unwrap_err();
        assert!(matches!(err, SchemaLoadError::MissingQueryType));

        let err = TypeBundle::from_json_str("not json").unwrap_err();
        assert!(matches!(err, SchemaLoadError::Json(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = TypeBundle::from_path("/nonexistent/bundle.json").unwrap_err();
        assert!(matches!(err, SchemaLoadError::Io { .. }));
    }
}
