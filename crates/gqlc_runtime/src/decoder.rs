//! Response decoding.
//!
//! The decoder walks an operation's selection sets next to the `data` object
//! of a response. It never fails: keys the response omits are left out of the
//! model, and values whose shape does not match the selection are kept as raw
//! JSON.

use crate::model::{Connection, DecodedValue, GraphModel, Model, PageInfo};
use crate::pagination::{NodeAnchor, PaginationMetadata};
use crate::registry::ClassRegistry;
use gqlc_schema::{TypeBundle, TypeDescriptor};
use gqlc_syntax::{Field, Operation, Selection, SelectionSet, TYPENAME_FIELD};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Decoding options.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Constructors for application model types.
    pub registry: Option<Arc<ClassRegistry>>,
    /// Variable values the operation was sent with.
    pub variables: Map<String, JsonValue>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: Arc<ClassRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn variables(mut self, variables: Map<String, JsonValue>) -> Self {
        self.variables = variables;
        self
    }
}

/// Decodes `data` for `operation` into a root model.
pub fn decode(
    bundle: &Arc<TypeBundle>,
    operation: &Operation,
    data: &JsonValue,
    options: &DecodeOptions,
) -> Arc<dyn GraphModel> {
    decode_operation(bundle, &Arc::new(operation.clone()), data, options)
}

/// Like [`decode`], for an operation that is already shared.
pub fn decode_operation(
    bundle: &Arc<TypeBundle>,
    operation: &Arc<Operation>,
    data: &JsonValue,
    options: &DecodeOptions,
) -> Arc<dyn GraphModel> {
    let decoder = Decoder {
        bundle,
        operation,
        registry: options.registry.as_deref(),
        variables: Arc::new(options.variables.clone()),
    };

    let root_type = bundle
        .get(&operation.selection_set.type_name)
        .unwrap_or_else(|| bundle.query_root());
    let empty = Map::new();
    let data = data.as_object().unwrap_or(&empty);

    tracing::debug!(
        operation = operation.name.as_deref().unwrap_or("<anonymous>"),
        "decoding response"
    );
    decoder.decode_object(root_type, &operation.selection_set, data, &Scope::default(), None)
}

/// Position of the value being decoded.
#[derive(Debug, Clone, Default)]
struct Scope {
    /// Response keys from the root, skipping connection `edges` / `node`.
    path: Vec<String>,
    /// Nearest enclosing object that can be refetched by id.
    anchor: Option<NodeAnchor>,
}

struct Decoder<'a> {
    bundle: &'a Arc<TypeBundle>,
    operation: &'a Arc<Operation>,
    registry: Option<&'a ClassRegistry>,
    variables: Arc<Map<String, JsonValue>>,
}

impl Decoder<'_> {
    fn decode_object(
        &self,
        static_type: &Arc<TypeDescriptor>,
        selection_set: &Arc<SelectionSet>,
        json: &Map<String, JsonValue>,
        scope: &Scope,
        pagination: Option<PaginationMetadata>,
    ) -> Arc<dyn GraphModel> {
        let ty = self.concrete_type(static_type, json);

        let mut fields = IndexMap::new();
        self.collect_fields(selection_set, &ty, &mut fields);

        let mut child_scope = scope.clone();
        if ty.implements_node {
            if let Some(id) = json.get("id").and_then(JsonValue::as_str) {
                child_scope.anchor = Some(NodeAnchor {
                    id: id.to_string(),
                    type_name: ty.name.clone(),
                    selection_set: selection_set.clone(),
                    depth: scope.path.len(),
                });
            }
        }

        let mut values = IndexMap::with_capacity(fields.len());
        for (key, field) in fields {
            let Some(raw) = json.get(&key) else {
                tracing::trace!(type_name = %ty.name, key = %key, "response omits selected field");
                continue;
            };
            let mut field_scope = child_scope.clone();
            field_scope.path.push(key.clone());
            let value = self.decode_field(&field, raw, &field_scope);
            values.insert(key, value);
        }

        let model = Model {
            bundle: self.bundle.clone(),
            ty,
            selection_set: selection_set.clone(),
            values,
            operation: self.operation.clone(),
            variables: self.variables.clone(),
            pagination,
        };
        match self.registry {
            Some(registry) => registry.construct(model),
            None => Arc::new(model),
        }
    }

    /// Picks the concrete type of an object, reading `__typename` for
    /// interfaces and unions.
    fn concrete_type(
        &self,
        static_type: &Arc<TypeDescriptor>,
        json: &Map<String, JsonValue>,
    ) -> Arc<TypeDescriptor> {
        if !static_type.is_abstract() {
            return static_type.clone();
        }
        let typename = json.get(TYPENAME_FIELD).and_then(JsonValue::as_str);
        match typename.and_then(|name| self.bundle.get(name)) {
            Some(concrete) if static_type.can_be(&concrete.name) => concrete.clone(),
            _ => {
                tracing::warn!(
                    static_type = %static_type.name,
                    typename = ?typename,
                    "cannot resolve concrete type, decoding as the static type"
                );
                static_type.clone()
            }
        }
    }

    /// Flattens the fields that apply to `ty`, merging sub-selections of
    /// fields that share a response key.
    fn collect_fields(
        &self,
        selection_set: &SelectionSet,
        ty: &TypeDescriptor,
        fields: &mut IndexMap<String, Field>,
    ) {
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => merge_field(fields, field),
                Selection::InlineFragment(fragment) => {
                    if self.applies(&fragment.type_condition, ty) {
                        self.collect_fields(&fragment.selection_set, ty, fields);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if self.applies(spread.type_condition(), ty) {
                        self.collect_fields(&spread.fragment.selection_set, ty, fields);
                    }
                }
            }
        }
    }

    fn applies(&self, type_condition: &str, ty: &TypeDescriptor) -> bool {
        type_condition == ty.name
            || self
                .bundle
                .get(type_condition)
                .is_some_and(|condition| condition.can_be(&ty.name))
    }

    fn decode_field(&self, field: &Field, raw: &JsonValue, scope: &Scope) -> DecodedValue {
        let Some(selection_set) = &field.selection_set else {
            return DecodedValue::Scalar(raw.clone());
        };
        let Some(return_type) = self.bundle.get(&selection_set.type_name) else {
            return DecodedValue::Scalar(raw.clone());
        };

        if field.connection {
            if let (Some(json), Some(node_set)) = (raw.as_object(), field.connection_node_set()) {
                if let Some(connection) = self.decode_connection(json, node_set, scope) {
                    return DecodedValue::Connection(connection);
                }
            }
        }
        self.decode_composite(return_type, selection_set, raw, scope)
    }

    fn decode_composite(
        &self,
        ty: &Arc<TypeDescriptor>,
        selection_set: &Arc<SelectionSet>,
        raw: &JsonValue,
        scope: &Scope,
    ) -> DecodedValue {
        match raw {
            JsonValue::Null => DecodedValue::Null,
            JsonValue::Object(json) => {
                DecodedValue::Object(self.decode_object(ty, selection_set, json, scope, None))
            }
            JsonValue::Array(items) => DecodedValue::List(
                items
                    .iter()
                    .map(|item| self.decode_composite(ty, selection_set, item, scope))
                    .collect(),
            ),
            other => DecodedValue::Scalar(other.clone()),
        }
    }

    fn decode_connection(
        &self,
        json: &Map<String, JsonValue>,
        node_set: &Arc<SelectionSet>,
        scope: &Scope,
    ) -> Option<Connection> {
        let node_type = self.bundle.get(&node_set.type_name)?;
        let page_info_json = json.get("pageInfo").and_then(JsonValue::as_object);
        let flag = |key: &str| {
            page_info_json
                .and_then(|p| p.get(key))
                .and_then(JsonValue::as_bool)
                .unwrap_or(false)
        };
        let cursor_at = |key: &str| {
            page_info_json
                .and_then(|p| p.get(key))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        };
        let mut page_info = PageInfo {
            has_next_page: flag("hasNextPage"),
            has_previous_page: flag("hasPreviousPage"),
            start_cursor: cursor_at("startCursor"),
            end_cursor: cursor_at("endCursor"),
        };

        let edges = json
            .get("edges")
            .and_then(JsonValue::as_array)
            .map_or(&[][..], Vec::as_slice);
        let mut nodes = Vec::with_capacity(edges.len());
        let mut first_cursor = None;
        let mut last_cursor = None;
        for edge in edges.iter().filter_map(JsonValue::as_object) {
            let cursor = edge.get("cursor").and_then(JsonValue::as_str);
            let Some(node) = edge.get("node").and_then(JsonValue::as_object) else {
                continue;
            };
            let pagination = cursor.map(|cursor| self.pagination(cursor, &page_info, scope));
            nodes.push(self.decode_object(node_type, node_set, node, scope, pagination));
            if first_cursor.is_none() {
                first_cursor = cursor;
            }
            if cursor.is_some() {
                last_cursor = cursor;
            }
        }

        if page_info.start_cursor.is_none() {
            page_info.start_cursor = first_cursor.map(str::to_string);
        }
        if page_info.end_cursor.is_none() {
            page_info.end_cursor = last_cursor.map(str::to_string);
        }
        let pagination = last_cursor.map(|cursor| self.pagination(cursor, &page_info, scope));

        Some(Connection {
            nodes,
            page_info,
            pagination,
        })
    }

    fn pagination(&self, cursor: &str, page_info: &PageInfo, scope: &Scope) -> PaginationMetadata {
        PaginationMetadata {
            cursor: cursor.to_string(),
            has_next_page: page_info.has_next_page,
            has_previous_page: page_info.has_previous_page,
            origin: self.operation.clone(),
            path: scope.path.clone(),
            anchor: scope.anchor.clone(),
            variables: self.variables.clone(),
            bundle: self.bundle.clone(),
        }
    }
}

fn merge_field(fields: &mut IndexMap<String, Field>, field: &Field) {
    let key = field.response_key();
    match fields.get_mut(key) {
        Some(existing) => {
            let merged = match (&existing.selection_set, &field.selection_set) {
                (Some(current), Some(extra)) if !Arc::ptr_eq(current, extra) => {
                    let mut merged = SelectionSet::clone(current);
                    merged.selections.extend(extra.selections.iter().cloned());
                    Some(Arc::new(merged))
                }
                _ => None,
            };
            if merged.is_some() {
                existing.selection_set = merged;
            }
        }
        None => {
            fields.insert(key.to_string(), field.clone());
        }
    }
}
