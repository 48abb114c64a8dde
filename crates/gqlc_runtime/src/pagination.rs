//! Next-page and refetch query construction.
//!
//! Follow-up queries are derived from the operation a model was decoded for:
//! the selection path down to the connection is kept, every unrelated field
//! is dropped, and the result is rebuilt through [`OperationBuilder`] so it is
//! validated like any other query.

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use gqlc_builder::{FieldOptions, OperationBuilder};
use gqlc_schema::{TypeBundle, NODE_FIELD};
use gqlc_syntax::{
    Field, InlineFragment, Operation, OperationKind, Selection, SelectionSet, Value,
    TYPENAME_FIELD,
};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

/// Where a connection node came from, enough to ask for the page after it.
#[derive(Clone)]
pub struct PaginationMetadata {
    /// Cursor of the edge (for a node) or the last edge (for a connection).
    pub cursor: String,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// The operation the connection was decoded for.
    pub origin: Arc<Operation>,
    /// Response keys from the root to the connection field, without `edges` / `node`.
    pub path: Vec<String>,
    /// Nearest refetchable ancestor of the connection.
    pub anchor: Option<NodeAnchor>,
    pub variables: Arc<Map<String, JsonValue>>,
    pub(crate) bundle: Arc<TypeBundle>,
}

/// A decoded Node object a follow-up query can start from.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAnchor {
    pub id: String,
    pub type_name: String,
    /// Selection set the anchor object was decoded with.
    pub selection_set: Arc<SelectionSet>,
    /// Number of path segments leading to the anchor.
    pub depth: usize,
}

/// A follow-up operation, where its answer lives, and the variables to send.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpQuery {
    pub operation: Operation,
    /// Response keys leading to the re-fetched value in the new response.
    pub path: Vec<String>,
    pub variables: Map<String, JsonValue>,
}

impl PaginationMetadata {
    /// Builds the query for the page after `cursor`.
    ///
    /// The `after` argument of the connection field is replaced by the
    /// cursor; every other argument, `first` included, is kept. With a Node
    /// ancestor the query starts at `node(id:)` instead of the root.
    pub fn next_page_query_and_path(&self) -> ModelResult<FollowUpQuery> {
        let path_not_found = || ModelError::PathNotFound {
            path: self.path.join("."),
        };

        let anchored = self
            .anchor
            .as_ref()
            .filter(|anchor| anchor.depth < self.path.len() && self.bundle.node_field().is_some());

        let (operation, path) = match anchored {
            Some(anchor) => {
                let relative = &self.path[anchor.depth..];
                let pruned = prune(&anchor.selection_set, relative, &self.cursor)
                    .ok_or_else(path_not_found)?;
                let operation = follow_up_builder(
                    &self.bundle,
                    &self.origin,
                    OperationKind::Query,
                    self.origin.name.as_deref(),
                    &pruned,
                )
                .build(|root| {
                    root.add_with(
                        NODE_FIELD,
                        FieldOptions::new().arg("id", anchor.id.as_str()),
                        |node| {
                            node.add_inline_fragment_on(&anchor.type_name, |target| {
                                target.extend(&pruned)
                            })
                        },
                    )
                })?;
                let mut path = Vec::with_capacity(relative.len() + 1);
                path.push(NODE_FIELD.to_string());
                path.extend(relative.iter().cloned());
                (operation, path)
            }
            None => {
                let pruned = prune(&self.origin.selection_set, &self.path, &self.cursor)
                    .ok_or_else(path_not_found)?;
                let operation = follow_up_builder(
                    &self.bundle,
                    &self.origin,
                    self.origin.kind,
                    self.origin.name.as_deref(),
                    &pruned,
                )
                .build(|root| root.extend(&pruned))?;
                (operation, self.path.clone())
            }
        };

        tracing::debug!(path = %path.join("."), cursor = %self.cursor, "built next page query");
        let variables = used_variables(&operation, &self.variables);
        Ok(FollowUpQuery {
            operation,
            path,
            variables,
        })
    }
}

impl fmt::Debug for PaginationMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationMetadata")
            .field("cursor", &self.cursor)
            .field("has_next_page", &self.has_next_page)
            .field("has_previous_page", &self.has_previous_page)
            .field("path", &self.path)
            .field("anchor", &self.anchor.as_ref().map(|a| &a.id))
            .finish_non_exhaustive()
    }
}

pub(crate) fn refetch_query(model: &Model) -> ModelResult<FollowUpQuery> {
    let ty = model.type_descriptor();
    if !ty.implements_node {
        return Err(ModelError::NotNodeType {
            type_name: ty.name.clone(),
        });
    }
    let id = model.id().ok_or_else(|| ModelError::MissingNodeId {
        type_name: ty.name.clone(),
    })?;
    let bundle = model.bundle();
    if bundle.node_field().is_none() {
        return Err(ModelError::NoNodeField);
    }

    let selection_set = model.selection_set();
    let operation = follow_up_builder(
        bundle,
        model.operation(),
        OperationKind::Query,
        None,
        selection_set,
    )
    .build(|root| {
        root.add_with(NODE_FIELD, FieldOptions::new().arg("id", id), |node| {
            node.add_inline_fragment_on(&selection_set.type_name, |target| {
                target.extend(selection_set)
            })
        })
    })?;

    let variables = used_variables(&operation, model.variables());
    Ok(FollowUpQuery {
        operation,
        path: vec![NODE_FIELD.to_string()],
        variables,
    })
}

/// Starts an operation declaring the variables of `origin` that
/// `selection_set` or the carried-over directives still use.
fn follow_up_builder<'a>(
    bundle: &'a TypeBundle,
    origin: &Operation,
    kind: OperationKind,
    name: Option<&str>,
    selection_set: &SelectionSet,
) -> OperationBuilder<'a> {
    let mut used = selection_set.variable_references();
    for directive in &origin.directives {
        for value in directive.arguments.values() {
            for variable in value.variable_references() {
                if !used.contains(&variable) {
                    used.push(variable);
                }
            }
        }
    }

    let mut builder = OperationBuilder::new(bundle, kind);
    if let Some(name) = name {
        builder = builder.name(name);
    }
    for definition in &origin.variables {
        if used.contains(&definition.name) {
            builder = builder.variable_definition(definition.clone());
        }
    }
    for directive in &origin.directives {
        builder = builder.directive(directive.clone());
    }
    builder
}

fn used_variables(operation: &Operation, values: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    operation
        .variables
        .iter()
        .filter_map(|definition| {
            values
                .get(&definition.name)
                .map(|value| (definition.name.clone(), value.clone()))
        })
        .collect()
}

/// Keeps the selections leading along `path`, plus `id` / `__typename`
/// leaves. The field at the end of the path gets `after: cursor`.
///
/// Returns `None` when nothing in `selection_set` answers to `path`.
fn prune(selection_set: &SelectionSet, path: &[String], cursor: &str) -> Option<SelectionSet> {
    let (key, rest) = path.split_first()?;
    let mut found = false;
    let mut selections = Vec::new();

    for selection in &selection_set.selections {
        match selection {
            Selection::Field(field) if field.response_key() == key => {
                let pruned = if rest.is_empty() {
                    Some(with_cursor(field, cursor))
                } else {
                    descend(field, rest, cursor)
                };
                if let Some(pruned) = pruned {
                    found = true;
                    selections.push(Selection::Field(pruned));
                }
            }
            Selection::Field(field)
                if field.selection_set.is_none()
                    && (field.name == "id" || field.name == TYPENAME_FIELD) =>
            {
                selections.push(selection.clone());
            }
            Selection::Field(_) => {}
            Selection::InlineFragment(fragment) => {
                if let Some(inner) = prune(&fragment.selection_set, path, cursor) {
                    found = true;
                    selections.push(Selection::InlineFragment(InlineFragment {
                        type_condition: fragment.type_condition.clone(),
                        selection_set: Arc::new(inner),
                    }));
                }
            }
            Selection::FragmentSpread(spread) => {
                if let Some(inner) = prune(&spread.fragment.selection_set, path, cursor) {
                    found = true;
                    selections.push(Selection::InlineFragment(InlineFragment {
                        type_condition: spread.type_condition().to_string(),
                        selection_set: Arc::new(inner),
                    }));
                }
            }
        }
    }

    found.then(|| SelectionSet {
        type_name: selection_set.type_name.clone(),
        selections,
    })
}

fn with_cursor(field: &Field, cursor: &str) -> Field {
    let mut field = field.clone();
    field
        .arguments
        .insert("after".to_string(), Value::String(cursor.to_string()));
    field
}

/// Prunes below `field`, looking through `edges.node` of intermediate connections.
fn descend(field: &Field, rest: &[String], cursor: &str) -> Option<Field> {
    let selection_set = field.selection_set.as_ref()?;
    let pruned = if field.connection {
        let node_set = field.connection_node_set()?;
        let pruned_node = prune(node_set, rest, cursor)?;
        let edges = selection_set.field("edges")?.selection_set.as_ref()?;
        let edges = replace_field_set(edges, "node", Arc::new(pruned_node));
        replace_field_set(selection_set, "edges", Arc::new(edges))
    } else {
        prune(selection_set, rest, cursor)?
    };
    Some(Field {
        selection_set: Some(Arc::new(pruned)),
        ..field.clone()
    })
}

fn replace_field_set(
    selection_set: &SelectionSet,
    response_key: &str,
    replacement: Arc<SelectionSet>,
) -> SelectionSet {
    let selections = selection_set
        .selections
        .iter()
        .map(|selection| match selection {
            Selection::Field(field) if field.response_key() == response_key => {
                Selection::Field(Field {
                    selection_set: Some(replacement.clone()),
                    ..field.clone()
                })
            }
            other => other.clone(),
        })
        .collect();
    SelectionSet {
        type_name: selection_set.type_name.clone(),
        selections,
    }
}
