//! Rendering of operations and documents to GraphQL query text.
//!
//! Output is compact and deterministic: selections are separated by single
//! spaces, definitions by newlines, and string / float values are JSON encoded.

use crate::ast::*;
use indexmap::IndexMap;
use std::fmt;

/// Query text formatter.
#[derive(Debug, Default)]
pub struct Formatter {
    output: String,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats an operation followed by every fragment it spreads, so the
    /// text can be sent on its own.
    ///
    /// `context` is appended after the operation's own directives.
    pub fn format_operation(&mut self, operation: &Operation, context: Option<&Directive>) -> String {
        self.output.clear();
        self.write_operation(operation, context);
        for fragment in operation.fragments() {
            self.output.push('\n');
            self.write_fragment_definition(&fragment);
        }
        std::mem::take(&mut self.output)
    }

    /// Formats a document: its operations, then its shared fragments.
    pub fn format_document(&mut self, document: &Document, context: Option<&Directive>) -> String {
        self.output.clear();
        let mut first = true;
        for operation in &document.operations {
            if !first {
                self.output.push('\n');
            }
            first = false;
            self.write_operation(operation, context);
        }
        for fragment in &document.fragments {
            if !first {
                self.output.push('\n');
            }
            first = false;
            self.write_fragment_definition(fragment);
        }
        std::mem::take(&mut self.output)
    }

    fn write_operation(&mut self, operation: &Operation, context: Option<&Directive>) {
        self.output.push_str(operation.kind.keyword());
        if let Some(name) = &operation.name {
            self.output.push(' ');
            self.output.push_str(name);
        }

        if !operation.variables.is_empty() {
            if operation.name.is_none() {
                self.output.push(' ');
            }
            self.output.push('(');
            for (i, variable) in operation.variables.iter().enumerate() {
                if i > 0 {
                    self.output.push_str(", ");
                }
                self.output.push('$');
                self.output.push_str(&variable.name);
                self.output.push_str(": ");
                self.output.push_str(&variable.ty.to_string());
                if let Some(default) = &variable.default_value {
                    self.output.push_str(" = ");
                    self.write_value(default);
                }
            }
            self.output.push(')');
        }

        for directive in operation.directives.iter().chain(context) {
            self.output.push(' ');
            self.write_directive(directive);
        }

        self.output.push(' ');
        self.write_selection_set(&operation.selection_set);
    }

    fn write_fragment_definition(&mut self, fragment: &FragmentDefinition) {
        self.output.push_str("fragment ");
        self.output.push_str(&fragment.name);
        self.output.push_str(" on ");
        self.output.push_str(&fragment.type_condition);
        self.output.push(' ');
        self.write_selection_set(&fragment.selection_set);
    }

    fn write_selection_set(&mut self, selection_set: &SelectionSet) {
        self.output.push('{');
        for selection in &selection_set.selections {
            self.output.push(' ');
            self.write_selection(selection);
        }
        self.output.push_str(" }");
    }

    fn write_selection(&mut self, selection: &Selection) {
        match selection {
            Selection::Field(field) => {
                if let Some(alias) = &field.alias {
                    self.output.push_str(alias);
                    self.output.push_str(": ");
                }
                self.output.push_str(&field.name);
                self.write_arguments(&field.arguments);
                if let Some(set) = &field.selection_set {
                    self.output.push(' ');
                    self.write_selection_set(set);
                }
            }
            Selection::InlineFragment(fragment) => {
                self.output.push_str("... on ");
                self.output.push_str(&fragment.type_condition);
                self.output.push(' ');
                self.write_selection_set(&fragment.selection_set);
            }
            Selection::FragmentSpread(spread) => {
                self.output.push_str("...");
                self.output.push_str(spread.name());
            }
        }
    }

    fn write_directive(&mut self, directive: &Directive) {
        self.output.push('@');
        self.output.push_str(&directive.name);
        self.write_arguments(&directive.arguments);
    }

    fn write_arguments(&mut self, arguments: &IndexMap<String, Value>) {
        if arguments.is_empty() {
            return;
        }
        self.output.push('(');
        for (i, (name, value)) in arguments.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(name);
            self.output.push_str(": ");
            self.write_value(value);
        }
        self.output.push(')');
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Variable(name) => {
                self.output.push('$');
                self.output.push_str(name);
            }
            Value::Int(n) => {
                self.output.push_str(&n.to_string());
            }
            Value::Float(n) => {
                self.output.push_str(&serde_json::Value::from(*n).to_string());
            }
            Value::String(s) => {
                self.output
                    .push_str(&serde_json::Value::String(s.clone()).to_string());
            }
            Value::Boolean(b) => {
                self.output.push_str(if *b { "true" } else { "false" });
            }
            Value::Null => {
                self.output.push_str("null");
            }
            Value::Enum(name) => {
                self.output.push_str(name);
            }
            Value::List(items) => {
                self.output.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_value(item);
                }
                self.output.push(']');
            }
            Value::Object(fields) => {
                self.output.push('{');
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.output.push_str(name);
                    self.output.push_str(": ");
                    self.write_value(value);
                }
                self.output.push('}');
            }
        }
    }
}

/// Formats an operation (and the fragments it spreads).
pub fn format_operation(operation: &Operation, context: Option<&Directive>) -> String {
    Formatter::new().format_operation(operation, context)
}

/// Formats a document.
pub fn format_document(document: &Document, context: Option<&Directive>) -> String {
    Formatter::new().format_document(document, context)
}

impl Operation {
    /// Renders this operation, appending `context` as an operation directive.
    pub fn to_query_string(&self, context: Option<&Directive>) -> String {
        format_operation(self, context)
    }
}

impl Document {
    /// Renders this document, appending `context` to every operation.
    pub fn to_query_string(&self, context: Option<&Directive>) -> String {
        format_document(self, context)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_operation(self, None))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_document(self, None))
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatter = Formatter::new();
        formatter.write_selection_set(self);
        f.write_str(&formatter.output)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatter = Formatter::new();
        formatter.write_value(self);
        f.write_str(&formatter.output)
    }
}
