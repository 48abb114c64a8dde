//! The type bundle.

use crate::loader::SchemaLoadError;
use crate::types::{FieldDescriptor, TypeDescriptor, TypeKind};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

/// Scalars every bundle provides even when its source omits them.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Name of the query root field used for global-ID refetch.
pub const NODE_FIELD: &str = "node";

/// A static schema description.
///
/// Created once, then shared by reference across builders and decoders.
#[derive(Debug, Clone)]
pub struct TypeBundle {
    query_root: Arc<TypeDescriptor>,
    mutation_root: Option<Arc<TypeDescriptor>>,
    types: IndexMap<String, Arc<TypeDescriptor>>,
}

impl TypeBundle {
    /// Creates a bundle builder with the built-in scalars registered.
    pub fn builder() -> TypeBundleBuilder {
        TypeBundleBuilder::new()
    }

    /// Gets a type by name.
    pub fn get(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    /// Returns all types in definition order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The root type of query operations.
    pub fn query_root(&self) -> &Arc<TypeDescriptor> {
        &self.query_root
    }

    /// The root type of mutation operations, if the schema has one.
    pub fn mutation_root(&self) -> Option<&Arc<TypeDescriptor>> {
        self.mutation_root.as_ref()
    }

    /// The query root's `node(id:)` field, if declared.
    pub fn node_field(&self) -> Option<&FieldDescriptor> {
        self.query_root.get_field(NODE_FIELD)
    }

    /// Checks that every name the bundle mentions resolves to a type.
    ///
    /// Loading never fails on dangling references so partially generated
    /// bundles stay usable; this reports them instead.
    pub fn validate(&self) -> Vec<BundleIssue> {
        let mut issues = Vec::new();

        for ty in self.types.values() {
            for field in ty.fields.values() {
                let referenced = field.return_type_name();
                if !self.types.contains_key(referenced) {
                    issues.push(BundleIssue::UnknownFieldType {
                        type_name: ty.name.clone(),
                        field_name: field.name.clone(),
                        referenced: referenced.to_string(),
                    });
                }
                for (argument, arg_ty) in &field.arguments {
                    let referenced = arg_ty.named_type();
                    if !self.types.contains_key(referenced) {
                        issues.push(BundleIssue::UnknownArgumentType {
                            type_name: ty.name.clone(),
                            field_name: field.name.clone(),
                            argument: argument.clone(),
                            referenced: referenced.to_string(),
                        });
                    }
                }
            }

            if ty.is_abstract() {
                if ty.possible_types.is_empty() {
                    issues.push(BundleIssue::NoPossibleTypes {
                        type_name: ty.name.clone(),
                    });
                }
                for possible in &ty.possible_types {
                    match self.types.get(possible) {
                        Some(concrete) if concrete.kind == TypeKind::Object => {}
                        Some(_) => issues.push(BundleIssue::PossibleTypeNotObject {
                            type_name: ty.name.clone(),
                            referenced: possible.clone(),
                        }),
                        None => issues.push(BundleIssue::UnknownPossibleType {
                            type_name: ty.name.clone(),
                            referenced: possible.clone(),
                        }),
                    }
                }
            }
        }

        issues
    }
}

/// A dangling or inconsistent reference found by [`TypeBundle::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleIssue {
    #[error("field `{type_name}.{field_name}` returns unknown type `{referenced}`")]
    UnknownFieldType {
        type_name: String,
        field_name: String,
        referenced: String,
    },

    #[error(
        "argument `{argument}` of `{type_name}.{field_name}` has unknown type `{referenced}`"
    )]
    UnknownArgumentType {
        type_name: String,
        field_name: String,
        argument: String,
        referenced: String,
    },

    #[error("`{type_name}` lists unknown possible type `{referenced}`")]
    UnknownPossibleType {
        type_name: String,
        referenced: String,
    },

    #[error("`{type_name}` lists `{referenced}` as a possible type, but it is not an object type")]
    PossibleTypeNotObject {
        type_name: String,
        referenced: String,
    },

    #[error("abstract type `{type_name}` has no possible types")]
    NoPossibleTypes { type_name: String },
}

/// Type bundle builder.
#[derive(Debug)]
pub struct TypeBundleBuilder {
    query_type: Option<String>,
    mutation_type: Option<String>,
    types: IndexMap<String, TypeDescriptor>,
}

impl Default for TypeBundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeBundleBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        // Add built-in scalars
        for name in BUILTIN_SCALARS {
            types.insert(name.to_string(), TypeDescriptor::scalar(name));
        }
        Self {
            query_type: None,
            mutation_type: None,
            types,
        }
    }

    /// Sets the query root type.
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = Some(name.into());
        self
    }

    /// Sets the mutation root type.
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    /// Adds a type, replacing any previous type with the same name.
    pub fn add_type(mut self, ty: TypeDescriptor) -> Self {
        self.types.insert(ty.name.clone(), ty);
        self
    }

    /// Builds the bundle.
    pub fn build(self) -> Result<TypeBundle, SchemaLoadError> {
        let types: IndexMap<String, Arc<TypeDescriptor>> = self
            .types
            .into_iter()
            .map(|(name, ty)| (name, Arc::new(ty)))
            .collect();

        let query_type = self.query_type.ok_or(SchemaLoadError::MissingQueryType)?;
        let query_root = types
            .get(&query_type)
            .cloned()
            .ok_or(SchemaLoadError::UnknownRootType(query_type))?;

        let mutation_root = match self.mutation_type {
            Some(name) => Some(
                types
                    .get(&name)
                    .cloned()
                    .ok_or(SchemaLoadError::UnknownRootType(name))?,
            ),
            None => None,
        };

        Ok(TypeBundle {
            query_root,
            mutation_root,
            types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlc_syntax::TypeRef;

    fn small_bundle() -> TypeBundle {
        TypeBundle::builder()
            .query_type("QueryRoot")
            .add_type(
                TypeDescriptor::object("QueryRoot")
                    .field(FieldDescriptor::new("shop", TypeRef::named("Shop")))
                    .field(
                        FieldDescriptor::new("node", TypeRef::named("Node"))
                            .argument("id", TypeRef::non_null(TypeRef::named("ID"))),
                    ),
            )
            .add_type(
                TypeDescriptor::object("Shop")
                    .field(FieldDescriptor::new("name", TypeRef::named("String"))),
            )
            .add_type(TypeDescriptor::interface("Node").node())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_registers_builtin_scalars() {
        let bundle = small_bundle();
        for name in BUILTIN_SCALARS {
            assert_eq!(bundle.get(name).unwrap().kind, TypeKind::Scalar);
        }
        assert_eq!(bundle.query_root().name, "QueryRoot");
        assert!(bundle.mutation_root().is_none());
        assert!(bundle.node_field().is_some());
    }

    #[test]
    fn test_builder_requires_known_roots() {
        let missing = TypeBundle::builder().build().unwrap_err();
        assert!(matches!(missing, SchemaLoadError::MissingQueryType));

        let unknown = TypeBundle::builder()
            .query_type("QueryRoot")
            .build()
            .unwrap_err();
        assert!(matches!(unknown, SchemaLoadError::UnknownRootType(name) if name == "QueryRoot"));
    }

    #[test]
    fn test_validate_reports_dangling_references() {
        let issues = small_bundle().validate();
        assert_eq!(
            issues,
            vec![BundleIssue::NoPossibleTypes {
                type_name: "Node".into()
            }]
        );

        let bundle = TypeBundle::builder()
            .query_type("QueryRoot")
            .add_type(
                TypeDescriptor::object("QueryRoot").field(
                    FieldDescriptor::new("cart", TypeRef::named("Cart"))
                        .argument("id", TypeRef::named("CartId")),
                ),
            )
            .add_type(TypeDescriptor::union("Result").possible_type("String"))
            .build()
            .unwrap();
        let issues = bundle.validate();
        assert_eq!(issues.len(), 3);
        assert_eq!(
            issues[0].to_string(),
            "field `QueryRoot.cart` returns unknown type `Cart`"
        );
        assert!(matches!(issues[1], BundleIssue::UnknownArgumentType { .. }));
        assert!(matches!(issues[2], BundleIssue::PossibleTypeNotObject { .. }));
    }
}
