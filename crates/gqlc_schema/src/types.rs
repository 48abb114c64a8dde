//! Type and field descriptors.

use gqlc_syntax::TypeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    InputObject,
}

impl TypeKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::Scalar => "SCALAR",
            Self::InputObject => "INPUT_OBJECT",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field on an object or interface type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub return_type: TypeRef,
    pub arguments: IndexMap<String, TypeRef>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            return_type,
            arguments: IndexMap::new(),
        }
    }

    /// Declares an argument.
    pub fn argument(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.arguments.insert(name.into(), ty);
        self
    }

    /// Name of the return type with list / non-null modifiers removed.
    pub fn return_type_name(&self) -> &str {
        self.return_type.named_type()
    }
}

/// A schema type.
///
/// One record covers every kind; behavior that differs between kinds is
/// driven by [`TypeKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    pub fields: IndexMap<String, FieldDescriptor>,
    /// Concrete types an interface or union may resolve to.
    pub possible_types: Vec<String>,
    /// Whether instances can be refetched through `node(id:)`.
    pub implements_node: bool,
    pub enum_values: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: IndexMap::new(),
            possible_types: Vec::new(),
            implements_node: false,
            enum_values: Vec::new(),
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Object)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn union(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Union)
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Scalar)
    }

    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        let mut ty = Self::new(name, TypeKind::Enum);
        ty.enum_values = values.iter().map(|v| (*v).to_string()).collect();
        ty
    }

    /// Adds a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Adds a possible concrete type (interfaces and unions).
    pub fn possible_type(mut self, name: impl Into<String>) -> Self {
        self.possible_types.push(name.into());
        self
    }

    /// Marks the type as Node-capable.
    pub fn node(mut self) -> Self {
        self.implements_node = true;
        self
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// SCALAR or ENUM: decodes to plain values, no sub-selection possible.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar | TypeKind::Enum)
    }

    /// OBJECT, INTERFACE or UNION: requires a sub-selection.
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Object | TypeKind::Interface | TypeKind::Union
        )
    }

    /// INTERFACE or UNION.
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::Union)
    }

    /// Returns true if a value of this static type may have the concrete type `name`.
    pub fn can_be(&self, name: &str) -> bool {
        self.name == name || (self.is_abstract() && self.possible_types.iter().any(|t| t == name))
    }
}
