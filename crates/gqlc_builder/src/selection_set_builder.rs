//! Selection set builder.
//!
//! A builder is always scoped to one composite schema type. Every call is
//! checked against that type at the call site, so an operation that builds
//! successfully only names fields, arguments and fragments the bundle knows.

use crate::error::{BuildError, BuildResult};
use crate::tracker::TypeRecorder;
use gqlc_schema::{TypeBundle, TypeDescriptor};
use gqlc_syntax::{
    Field, FragmentSpread, InlineFragment, Selection, SelectionSet, Value, VariableDefinition,
    TYPENAME_FIELD,
};
use indexmap::IndexMap;
use std::sync::Arc;

/// Shared state threaded through every nested builder of one build.
#[derive(Clone, Copy)]
pub(crate) struct BuildContext<'a> {
    pub(crate) bundle: &'a TypeBundle,
    pub(crate) recorder: &'a dyn TypeRecorder,
    /// Variables the enclosing operation declares.
    pub(crate) variables: &'a [VariableDefinition],
}

/// Alias and arguments of a field selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOptions {
    pub alias: Option<String>,
    pub arguments: IndexMap<String, Value>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds an argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// Builds the selections of one composite type.
pub struct SelectionSetBuilder<'a> {
    ctx: BuildContext<'a>,
    scope: &'a TypeDescriptor,
    selections: Vec<Selection>,
}

impl<'a> SelectionSetBuilder<'a> {
    /// Creates a builder that pre-selects what decoding needs: `id` on Node
    /// types, `__typename` on interfaces and unions.
    pub(crate) fn new(ctx: BuildContext<'a>, scope: &'a TypeDescriptor) -> BuildResult<Self> {
        let mut builder = Self::bare(ctx, scope);
        if scope.implements_node && scope.get_field("id").is_some() {
            builder.add_field("id")?;
        }
        if scope.is_abstract() {
            builder.add_field(TYPENAME_FIELD)?;
        }
        Ok(builder)
    }

    /// Creates a builder without automatic selections.
    pub(crate) fn bare(ctx: BuildContext<'a>, scope: &'a TypeDescriptor) -> Self {
        ctx.recorder.record(&scope.name);
        Self {
            ctx,
            scope,
            selections: Vec::new(),
        }
    }

    /// Name of the type this builder selects on.
    pub fn type_name(&self) -> &str {
        &self.scope.name
    }

    pub fn scope(&self) -> &TypeDescriptor {
        self.scope
    }

    pub fn bundle(&self) -> &TypeBundle {
        self.ctx.bundle
    }

    /// Selections added so far.
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Selects a leaf field.
    pub fn add_field(&mut self, name: &str) -> BuildResult<()> {
        self.add_field_with(name, FieldOptions::new())
    }

    /// Selects a leaf field with an alias or arguments.
    pub fn add_field_with(&mut self, name: &str, options: FieldOptions) -> BuildResult<()> {
        if let Some(return_type) = self.resolve(name, &options)? {
            if return_type.is_composite() {
                return Err(self.subselection_required(name, return_type));
            }
        }
        self.push_field(Field {
            name: name.to_string(),
            alias: options.alias,
            arguments: options.arguments,
            selection_set: None,
            connection: false,
        })
    }

    /// Selects a composite field; `f` builds its sub-selection.
    pub fn add<F>(&mut self, name: &str, f: F) -> BuildResult<()>
    where
        F: FnOnce(&mut SelectionSetBuilder<'a>) -> BuildResult<()>,
    {
        self.add_with(name, FieldOptions::new(), f)
    }

    /// Selects a composite field with an alias or arguments.
    pub fn add_with<F>(&mut self, name: &str, options: FieldOptions, f: F) -> BuildResult<()>
    where
        F: FnOnce(&mut SelectionSetBuilder<'a>) -> BuildResult<()>,
    {
        let return_type = self.composite_return_type(name, &options)?;
        let mut child = SelectionSetBuilder::new(self.ctx, return_type)?;
        f(&mut child)?;
        let selection_set = child.finish();
        if selection_set.is_empty() {
            return Err(self.subselection_required(name, return_type));
        }
        self.push_field(Field {
            name: name.to_string(),
            alias: options.alias,
            arguments: options.arguments,
            selection_set: Some(Arc::new(selection_set)),
            connection: false,
        })
    }

    /// Selects a connection field.
    ///
    /// `f` builds the selection of each `edges.node`; the builder wraps it in
    /// `edges { cursor node { .. } }` and adds
    /// `pageInfo { hasNextPage hasPreviousPage }`.
    pub fn add_connection<F>(&mut self, name: &str, options: FieldOptions, f: F) -> BuildResult<()>
    where
        F: FnOnce(&mut SelectionSetBuilder<'a>) -> BuildResult<()>,
    {
        let return_type = self.composite_return_type(name, &options)?;
        if return_type.get_field("edges").is_none() || return_type.get_field("pageInfo").is_none() {
            return Err(BuildError::NotAConnection {
                type_name: self.scope.name.clone(),
                field_name: name.to_string(),
                return_type: return_type.name.clone(),
            });
        }

        let mut connection = SelectionSetBuilder::new(self.ctx, return_type)?;
        connection.add("edges", |edges| {
            edges.add_field("cursor")?;
            edges.add("node", f)
        })?;
        connection.add("pageInfo", |page_info| {
            page_info.add_field("hasNextPage")?;
            page_info.add_field("hasPreviousPage")
        })?;

        self.push_field(Field {
            name: name.to_string(),
            alias: options.alias,
            arguments: options.arguments,
            selection_set: Some(Arc::new(connection.finish())),
            connection: true,
        })
    }

    /// Adds an inline fragment on `type_name`.
    pub fn add_inline_fragment_on<F>(&mut self, type_name: &str, f: F) -> BuildResult<()>
    where
        F: FnOnce(&mut SelectionSetBuilder<'a>) -> BuildResult<()>,
    {
        let target = self.fragment_target(type_name)?;
        let mut child = SelectionSetBuilder::bare(self.ctx, target);
        f(&mut child)?;
        self.push_inline_fragment(child.finish())
    }

    /// Spreads a shared fragment defined on a document.
    pub fn add_fragment(&mut self, spread: &FragmentSpread) -> BuildResult<()> {
        let target = self.fragment_target(spread.type_condition())?;
        self.ctx.recorder.record(&target.name);
        let already_spread = self.selections.iter().any(|selection| {
            matches!(selection, Selection::FragmentSpread(existing) if existing.name() == spread.name())
        });
        if !already_spread {
            self.selections.push(Selection::FragmentSpread(spread.clone()));
        }
        Ok(())
    }

    /// Appends an already built selection, validating it against this scope
    /// as if it had been added through the other methods.
    pub fn add_selection(&mut self, selection: Selection) -> BuildResult<()> {
        match selection {
            Selection::Field(field) => self.add_field_selection(field),
            Selection::InlineFragment(fragment) => {
                let target = self.fragment_target(&fragment.type_condition)?;
                let mut child = SelectionSetBuilder::bare(self.ctx, target);
                child.extend(&fragment.selection_set)?;
                self.push_inline_fragment(child.finish())
            }
            Selection::FragmentSpread(spread) => self.add_fragment(&spread),
        }
    }

    /// Appends every selection of `selection_set`.
    pub fn extend(&mut self, selection_set: &SelectionSet) -> BuildResult<()> {
        for selection in &selection_set.selections {
            self.add_selection(selection.clone())?;
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> SelectionSet {
        SelectionSet {
            type_name: self.scope.name.clone(),
            selections: self.selections,
        }
    }

    fn add_field_selection(&mut self, field: Field) -> BuildResult<()> {
        let options = FieldOptions {
            alias: field.alias.clone(),
            arguments: field.arguments.clone(),
        };
        let return_type = self.resolve(&field.name, &options)?;

        let selection_set = match (return_type, &field.selection_set) {
            (Some(return_type), Some(source)) if return_type.is_composite() => {
                let mut child = SelectionSetBuilder::bare(self.ctx, return_type);
                child.extend(source)?;
                let rebuilt = child.finish();
                if rebuilt.is_empty() {
                    return Err(self.subselection_required(&field.name, return_type));
                }
                Some(Arc::new(rebuilt))
            }
            (Some(return_type), None) if return_type.is_composite() => {
                return Err(self.subselection_required(&field.name, return_type));
            }
            (return_type, Some(_)) => {
                return Err(self.subselection_forbidden(&field.name, return_type));
            }
            (_, None) => None,
        };

        self.push_field(Field {
            selection_set,
            ..field
        })
    }

    /// Validates a field selection and records the types it touches.
    ///
    /// Returns the unwrapped return type, or `None` for `__typename`.
    fn resolve(&self, name: &str, options: &FieldOptions) -> BuildResult<Option<&'a TypeDescriptor>> {
        if name == TYPENAME_FIELD {
            if let Some(argument) = options.arguments.keys().next() {
                return Err(BuildError::UnknownArgument {
                    type_name: self.scope.name.clone(),
                    field_name: name.to_string(),
                    argument: argument.clone(),
                });
            }
            self.ctx.recorder.record("String");
            return Ok(None);
        }

        let field = self
            .scope
            .get_field(name)
            .ok_or_else(|| BuildError::UnknownField {
                type_name: self.scope.name.clone(),
                field_name: name.to_string(),
            })?;

        for argument in options.arguments.keys() {
            if !field.arguments.contains_key(argument) {
                return Err(BuildError::UnknownArgument {
                    type_name: self.scope.name.clone(),
                    field_name: name.to_string(),
                    argument: argument.clone(),
                });
            }
        }
        for (argument, value) in &options.arguments {
            if !value.is_finite() {
                return Err(BuildError::NonFiniteFloat {
                    type_name: self.scope.name.clone(),
                    field_name: name.to_string(),
                    argument: argument.clone(),
                });
            }
            self.check_variables(value)?;
        }

        let return_type = self.lookup(field.return_type_name())?;
        self.ctx.recorder.record(&return_type.name);
        Ok(Some(return_type))
    }

    fn composite_return_type(
        &self,
        name: &str,
        options: &FieldOptions,
    ) -> BuildResult<&'a TypeDescriptor> {
        match self.resolve(name, options)? {
            Some(return_type) if return_type.is_composite() => Ok(return_type),
            other => Err(self.subselection_forbidden(name, other)),
        }
    }

    fn check_variables(&self, value: &Value) -> BuildResult<()> {
        for name in value.variable_references() {
            if !self.ctx.variables.iter().any(|v| v.name == name) {
                return Err(BuildError::UndeclaredVariable { name });
            }
        }
        Ok(())
    }

    fn lookup(&self, type_name: &str) -> BuildResult<&'a TypeDescriptor> {
        self.ctx
            .bundle
            .get(type_name)
            .map(Arc::as_ref)
            .ok_or_else(|| BuildError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    fn fragment_target(&self, type_condition: &str) -> BuildResult<&'a TypeDescriptor> {
        let target = self.lookup(type_condition)?;
        if !target.is_composite() || !types_overlap(self.scope, target) {
            return Err(BuildError::InvalidFragmentType {
                scope: self.scope.name.clone(),
                type_condition: type_condition.to_string(),
            });
        }
        Ok(target)
    }

    fn push_inline_fragment(&mut self, selection_set: SelectionSet) -> BuildResult<()> {
        if selection_set.is_empty() {
            return Err(BuildError::EmptySelection {
                type_name: selection_set.type_name,
            });
        }
        self.selections.push(Selection::InlineFragment(InlineFragment {
            type_condition: selection_set.type_name.clone(),
            selection_set: Arc::new(selection_set),
        }));
        Ok(())
    }

    fn push_field(&mut self, field: Field) -> BuildResult<()> {
        let identical = self.selections.iter().find_map(|selection| match selection {
            Selection::Field(existing) if existing.response_key() == field.response_key() => {
                Some(*existing == field)
            }
            _ => None,
        });
        match identical {
            Some(true) => Ok(()),
            Some(false) => Err(BuildError::DuplicateField {
                type_name: self.scope.name.clone(),
                response_key: field.response_key().to_string(),
            }),
            None => {
                self.selections.push(Selection::Field(field));
                Ok(())
            }
        }
    }

    fn subselection_required(&self, field_name: &str, return_type: &TypeDescriptor) -> BuildError {
        BuildError::SubselectionRequired {
            type_name: self.scope.name.clone(),
            field_name: field_name.to_string(),
            return_type: return_type.name.clone(),
        }
    }

    fn subselection_forbidden(
        &self,
        field_name: &str,
        return_type: Option<&TypeDescriptor>,
    ) -> BuildError {
        BuildError::SubselectionForbidden {
            type_name: self.scope.name.clone(),
            field_name: field_name.to_string(),
            return_type: return_type.map_or("String", |ty| ty.name.as_str()).to_string(),
        }
    }
}

/// Whether some concrete type can satisfy both `scope` and `target`.
fn types_overlap(scope: &TypeDescriptor, target: &TypeDescriptor) -> bool {
    scope.can_be(&target.name)
        || target.can_be(&scope.name)
        || (scope.is_abstract()
            && target.is_abstract()
            && scope
                .possible_types
                .iter()
                .any(|name| target.possible_types.contains(name)))
}
