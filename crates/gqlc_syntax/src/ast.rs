//! Abstract Syntax Tree types for client-side GraphQL operations.
//!
//! The tree is produced by the builders in `gqlc_builder` and is read-only
//! afterwards: the serializer renders it and the decoder walks it next to a
//! JSON response. Nested selection sets are reference counted so decoded
//! models can keep the subtree they were decoded from.

use crate::type_ref::TypeRef;
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

/// Name of the meta field every composite type answers.
pub const TYPENAME_FIELD: &str = "__typename";

/// Type of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// A complete document: operations plus the fragments they share.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub operations: Vec<Arc<Operation>>,
    pub fragments: Vec<Arc<FragmentDefinition>>,
}

/// Reasons a document cannot pick the operation to send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationSelectionError {
    #[error("the document contains no operations")]
    Empty,

    #[error(
        "the document contains {count} operations; an operation name is required to choose one"
    )]
    Ambiguous { count: usize },

    #[error("the document has no operation named `{0}`")]
    Unknown(String),
}

impl Document {
    /// Selects the operation to send.
    ///
    /// Without a name the document must hold exactly one operation.
    pub fn operation(&self, name: Option<&str>) -> Result<&Arc<Operation>, OperationSelectionError> {
        match name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or_else(|| OperationSelectionError::Unknown(name.to_string())),
            None => match self.operations.as_slice() {
                [] => Err(OperationSelectionError::Empty),
                [only] => Ok(only),
                ops => Err(OperationSelectionError::Ambiguous { count: ops.len() }),
            },
        }
    }

    /// Looks up a shared fragment by name.
    pub fn fragment(&self, name: &str) -> Option<&Arc<FragmentDefinition>> {
        self.fragments.iter().find(|f| f.name == name)
    }
}

/// Operation definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: Arc<SelectionSet>,
}

impl Operation {
    /// Returns the variable definition with the given name.
    pub fn variable(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Fragment definitions spread anywhere in this operation, in first-use order.
    pub fn fragments(&self) -> Vec<Arc<FragmentDefinition>> {
        let mut found: Vec<Arc<FragmentDefinition>> = Vec::new();
        self.selection_set.collect_fragments(&mut found);
        found
    }

    /// Names of every variable referenced by arguments or directives, in first-use order.
    pub fn variable_references(&self) -> Vec<String> {
        let mut names = Vec::new();
        for directive in &self.directives {
            for value in directive.arguments.values() {
                value.collect_variables(&mut names);
            }
        }
        self.selection_set.collect_variables(&mut names);
        names
    }
}

/// Variable definition.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
}

/// Directive annotation, such as `@inContext(country: CA)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: IndexMap<String, Value>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
        }
    }

    /// Adds an argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// Fragment definition shared between operations of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub selection_set: Arc<SelectionSet>,
}

/// Selection set scoped to one schema type.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSet {
    pub type_name: String,
    pub selections: Vec<Selection>,
}

impl SelectionSet {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            selections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Returns the direct field selection answering to `response_key`.
    pub fn field(&self, response_key: &str) -> Option<&Field> {
        self.selections.iter().find_map(|selection| match selection {
            Selection::Field(field) if field.response_key() == response_key => Some(field),
            _ => None,
        })
    }

    fn collect_fragments(&self, found: &mut Vec<Arc<FragmentDefinition>>) {
        for selection in &self.selections {
            match selection {
                Selection::Field(field) => {
                    if let Some(set) = &field.selection_set {
                        set.collect_fragments(found);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    fragment.selection_set.collect_fragments(found);
                }
                Selection::FragmentSpread(spread) => {
                    if !found.iter().any(|f| f.name == spread.fragment.name) {
                        found.push(spread.fragment.clone());
                        spread.fragment.selection_set.collect_fragments(found);
                    }
                }
            }
        }
    }

    pub(crate) fn collect_variables(&self, names: &mut Vec<String>) {
        for selection in &self.selections {
            match selection {
                Selection::Field(field) => {
                    for value in field.arguments.values() {
                        value.collect_variables(names);
                    }
                    if let Some(set) = &field.selection_set {
                        set.collect_variables(names);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    fragment.selection_set.collect_variables(names);
                }
                Selection::FragmentSpread(spread) => {
                    spread.fragment.selection_set.collect_variables(names);
                }
            }
        }
    }

    /// Names of every variable referenced below this selection set.
    pub fn variable_references(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }
}

/// Selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    InlineFragment(InlineFragment),
    FragmentSpread(FragmentSpread),
}

/// Field selection.
///
/// For connection fields, `selection_set` holds the expanded
/// `edges { cursor node { .. } } pageInfo { .. }` shape and `connection` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, Value>,
    pub selection_set: Option<Arc<SelectionSet>>,
    pub connection: bool,
}

impl Field {
    /// A field without arguments or sub-selection.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: IndexMap::new(),
            selection_set: None,
            connection: false,
        }
    }

    /// The key this field answers to in a response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// For connection fields, the selection set applied to each `edges.node`.
    pub fn connection_node_set(&self) -> Option<&Arc<SelectionSet>> {
        if !self.connection {
            return None;
        }
        self.selection_set
            .as_ref()?
            .field("edges")?
            .selection_set
            .as_ref()?
            .field("node")?
            .selection_set
            .as_ref()
    }
}

/// Inline fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: String,
    pub selection_set: Arc<SelectionSet>,
}

/// Fragment spread referencing a shared definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    pub fragment: Arc<FragmentDefinition>,
}

impl FragmentSpread {
    pub fn name(&self) -> &str {
        &self.fragment.name
    }

    pub fn type_condition(&self) -> &str {
        &self.fragment.type_condition
    }
}

/// Argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Enum value, rendered as a bare identifier.
    Enum(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// Reference to an operation variable, rendered as `$name`.
    Variable(String),
}

impl Value {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn enum_value(name: impl Into<String>) -> Self {
        Self::Enum(name.into())
    }

    pub(crate) fn collect_variables(&self, names: &mut Vec<String>) {
        match self {
            Self::Variable(name) => {
                if !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
            Self::List(items) => {
                for item in items {
                    item.collect_variables(names);
                }
            }
            Self::Object(fields) => {
                for value in fields.values() {
                    value.collect_variables(names);
                }
            }
            _ => {}
        }
    }

    /// Names of every variable referenced by this value.
    pub fn variable_references(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    /// False when a float anywhere in the value is NaN or infinite.
    ///
    /// GraphQL has no literal for those, so they cannot be serialized.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(n) => n.is_finite(),
            Self::List(items) => items.iter().all(Value::is_finite),
            Self::Object(fields) => fields.values().all(Value::is_finite),
            _ => true,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(name: &str) -> Arc<Operation> {
        Arc::new(Operation {
            kind: OperationKind::Query,
            name: Some(name.to_string()),
            variables: Vec::new(),
            directives: Vec::new(),
            selection_set: Arc::new(SelectionSet::new("QueryRoot")),
        })
    }

    #[test]
    fn test_document_operation_selection() {
        let single = Document {
            operations: vec![operation("A")],
            fragments: Vec::new(),
        };
        assert_eq!(single.operation(None).unwrap().name.as_deref(), Some("A"));

        let pair = Document {
            operations: vec![operation("A"), operation("B")],
            fragments: Vec::new(),
        };
        assert_eq!(
            pair.operation(None).unwrap_err(),
            OperationSelectionError::Ambiguous { count: 2 }
        );
        assert_eq!(pair.operation(Some("B")).unwrap().name.as_deref(), Some("B"));
        assert_eq!(
            pair.operation(Some("C")).unwrap_err(),
            OperationSelectionError::Unknown("C".to_string())
        );

        assert_eq!(
            Document::default().operation(None).unwrap_err(),
            OperationSelectionError::Empty
        );
    }

    #[test]
    fn test_variable_references_are_deduplicated() {
        let mut field = Field::leaf("products");
        field.arguments.insert("first".into(), Value::variable("first"));
        field.arguments.insert(
            "query".into(),
            Value::List(vec![Value::variable("term"), Value::variable("first")]),
        );
        let set = SelectionSet {
            type_name: "Shop".into(),
            selections: vec![Selection::Field(field)],
        };
        assert_eq!(set.variable_references(), vec!["first", "term"]);
    }

    #[test]
    fn test_response_key_prefers_alias() {
        let mut field = Field::leaf("products");
        assert_eq!(field.response_key(), "products");
        field.alias = Some("firstProducts".into());
        assert_eq!(field.response_key(), "firstProducts");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from("x"), Value::String("x".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
    }
}
