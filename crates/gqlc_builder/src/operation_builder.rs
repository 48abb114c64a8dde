//! Operation builder.

use crate::error::{BuildError, BuildResult};
use crate::selection_set_builder::{BuildContext, SelectionSetBuilder};
use crate::tracker::{TypeRecorder, NOOP_RECORDER};
use gqlc_schema::TypeBundle;
use gqlc_syntax::{
    Directive, Operation, OperationKind, TypeRef, TypeRefParseError, Value, VariableDefinition,
};
use std::sync::Arc;

/// A variable whose type annotation is checked when the operation is built.
#[derive(Debug, Clone)]
struct PendingVariable {
    name: String,
    ty: Result<TypeRef, TypeRefParseError>,
    default_value: Option<Value>,
}

/// Builds a query or mutation against a type bundle.
pub struct OperationBuilder<'a> {
    bundle: &'a TypeBundle,
    kind: OperationKind,
    name: Option<String>,
    variables: Vec<PendingVariable>,
    directives: Vec<Directive>,
    recorder: &'a dyn TypeRecorder,
}

impl<'a> OperationBuilder<'a> {
    /// Starts a query rooted at the bundle's query type.
    pub fn query(bundle: &'a TypeBundle) -> Self {
        Self::new(bundle, OperationKind::Query)
    }

    /// Starts a mutation; building fails if the bundle has no mutation type.
    pub fn mutation(bundle: &'a TypeBundle) -> Self {
        Self::new(bundle, OperationKind::Mutation)
    }

    pub fn new(bundle: &'a TypeBundle, kind: OperationKind) -> Self {
        Self {
            bundle,
            kind,
            name: None,
            variables: Vec::new(),
            directives: Vec::new(),
            recorder: &NOOP_RECORDER,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a variable, for example `.variable("id", "ID!")`.
    pub fn variable(self, name: impl Into<String>, ty: &str) -> Self {
        self.push_variable(name.into(), ty.parse(), None)
    }

    /// Declares a variable with a default value.
    pub fn variable_with_default(
        self,
        name: impl Into<String>,
        ty: &str,
        default_value: impl Into<Value>,
    ) -> Self {
        self.push_variable(name.into(), ty.parse(), Some(default_value.into()))
    }

    /// Declares an already parsed variable definition.
    pub fn variable_definition(self, definition: VariableDefinition) -> Self {
        self.push_variable(
            definition.name,
            Ok(definition.ty),
            definition.default_value,
        )
    }

    /// Adds an operation directive.
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    /// Reports visited types to `recorder` instead of discarding them.
    pub fn recorder(mut self, recorder: &'a dyn TypeRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    fn push_variable(
        mut self,
        name: String,
        ty: Result<TypeRef, TypeRefParseError>,
        default_value: Option<Value>,
    ) -> Self {
        self.variables.push(PendingVariable {
            name,
            ty,
            default_value,
        });
        self
    }

    /// Builds the operation; `f` selects on the root type.
    pub fn build<F>(self, f: F) -> BuildResult<Operation>
    where
        F: for<'b> FnOnce(&mut SelectionSetBuilder<'b>) -> BuildResult<()>,
    {
        let root = match self.kind {
            OperationKind::Query => self.bundle.query_root(),
            OperationKind::Mutation => self
                .bundle
                .mutation_root()
                .ok_or(BuildError::NoMutationType)?,
        };

        let variables = self.resolve_variables()?;
        let ctx = BuildContext {
            bundle: self.bundle,
            recorder: self.recorder,
            variables: &variables,
        };

        for directive in &self.directives {
            for value in directive.arguments.values() {
                for name in value.variable_references() {
                    if !variables.iter().any(|v| v.name == name) {
                        return Err(BuildError::UndeclaredVariable { name });
                    }
                }
            }
        }

        let mut builder = SelectionSetBuilder::new(ctx, root)?;
        f(&mut builder)?;
        let selection_set = builder.finish();
        if selection_set.is_empty() {
            return Err(BuildError::EmptySelection {
                type_name: root.name.clone(),
            });
        }

        tracing::debug!(
            kind = self.kind.keyword(),
            name = self.name.as_deref().unwrap_or("<anonymous>"),
            "built operation"
        );

        Ok(Operation {
            kind: self.kind,
            name: self.name,
            variables,
            directives: self.directives,
            selection_set: Arc::new(selection_set),
        })
    }

    fn resolve_variables(&self) -> BuildResult<Vec<VariableDefinition>> {
        let mut resolved: Vec<VariableDefinition> = Vec::with_capacity(self.variables.len());
        for pending in &self.variables {
            if resolved.iter().any(|v| v.name == pending.name) {
                return Err(BuildError::DuplicateVariable {
                    name: pending.name.clone(),
                });
            }
            let ty = pending
                .ty
                .clone()
                .map_err(|source| BuildError::InvalidVariableType {
                    name: pending.name.clone(),
                    source,
                })?;
            if self.bundle.get(ty.named_type()).is_none() {
                return Err(BuildError::UnknownType {
                    type_name: ty.named_type().to_string(),
                });
            }
            resolved.push(VariableDefinition {
                name: pending.name.clone(),
                ty,
                default_value: pending.default_value.clone(),
            });
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection_set_builder::FieldOptions;

    fn bundle() -> TypeBundle {
        TypeBundle::from_json_str(include_str!("../../../fixtures/shop_bundle.json")).unwrap()
    }

    #[test]
    fn test_build_named_query_with_variables() {
        let bundle = bundle();
        let query = OperationBuilder::query(&bundle)
            .name("Products")
            .variable_with_default("first", "Int", 10)
            .build(|root| {
                root.add("shop", |shop| {
                    shop.add_connection(
                        "products",
                        FieldOptions::new().arg("first", Value::variable("first")),
                        |product| product.add_field("title"),
                    )
                })
            })
            .unwrap();

        insta::assert_snapshot!(
            query.to_string(),
            @"query Products($first: Int = 10) { shop { products(first: $first) { edges { cursor node { id title } } pageInfo { hasNextPage hasPreviousPage } } } }"
        );
        assert_eq!(query.variable_references(), vec!["first"]);
    }

    #[test]
    fn test_build_mutation() {
        let bundle = bundle();
        let mutation = OperationBuilder::mutation(&bundle)
            .variable("input", "CustomerCreateInput!")
            .build(|root| {
                root.add_with(
                    "customerCreate",
                    FieldOptions::new().arg("input", Value::variable("input")),
                    |payload| {
                        payload.add("customer", |customer| customer.add_field("email"))?;
                        payload.add("userErrors", |error| {
                            error.add_field("field")?;
                            error.add_field("message")
                        })
                    },
                )
            })
            .unwrap();

        assert_eq!(
            mutation.to_string(),
            "mutation ($input: CustomerCreateInput!) { customerCreate(input: $input) { customer { id email } userErrors { field message } } }"
        );
    }

    #[test]
    fn test_mutation_without_mutation_root() {
        let bundle = TypeBundle::builder()
            .query_type("String")
            .build()
            .unwrap();
        let err = OperationBuilder::mutation(&bundle)
            .build(|_| Ok(()))
            .unwrap_err();
        assert_eq!(err, BuildError::NoMutationType);
    }

    #[test]
    fn test_variable_errors() {
        let bundle = bundle();

        let err = OperationBuilder::query(&bundle)
            .variable("id", "ID!")
            .variable("id", "ID")
            .build(|root| root.add("shop", |shop| shop.add_field("name")))
            .unwrap_err();
        assert_eq!(err, BuildError::DuplicateVariable { name: "id".into() });

        let err = OperationBuilder::query(&bundle)
            .variable("id", "[ID")
            .build(|root| root.add("shop", |shop| shop.add_field("name")))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidVariableType { ref name, .. } if name == "id"));

        let err = OperationBuilder::query(&bundle)
            .variable("cart", "CartId")
            .build(|root| root.add("shop", |shop| shop.add_field("name")))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownType {
                type_name: "CartId".into()
            }
        );
    }

    #[test]
    fn test_directive_and_empty_root() {
        let bundle = bundle();
        let err = OperationBuilder::query(&bundle)
            .directive(Directive::new("inContext").arg("country", Value::variable("country")))
            .build(|root| root.add("shop", |shop| shop.add_field("name")))
            .unwrap_err();
        assert!(matches!(err, BuildError::UndeclaredVariable { .. }));

        let err = OperationBuilder::query(&bundle).build(|_| Ok(())).unwrap_err();
        assert_eq!(
            err,
            BuildError::EmptySelection {
                type_name: "QueryRoot".into()
            }
        );
    }
}
