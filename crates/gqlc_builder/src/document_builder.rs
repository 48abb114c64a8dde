//! Document builder.

use crate::error::{BuildError, BuildResult};
use crate::operation_builder::OperationBuilder;
use crate::selection_set_builder::{BuildContext, SelectionSetBuilder};
use crate::tracker::{TypeRecorder, NOOP_RECORDER};
use gqlc_schema::TypeBundle;
use gqlc_syntax::{Document, FragmentDefinition, FragmentSpread, Operation, OperationKind};
use std::sync::Arc;

/// Builds a document holding several operations and the fragments they share.
pub struct DocumentBuilder<'a> {
    bundle: &'a TypeBundle,
    recorder: &'a dyn TypeRecorder,
    operations: Vec<Arc<Operation>>,
    fragments: Vec<Arc<FragmentDefinition>>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(bundle: &'a TypeBundle) -> Self {
        Self {
            bundle,
            recorder: &NOOP_RECORDER,
            operations: Vec::new(),
            fragments: Vec::new(),
        }
    }

    pub fn recorder(mut self, recorder: &'a dyn TypeRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Starts an operation builder sharing this document's bundle and recorder.
    pub fn operation(&self, kind: OperationKind) -> OperationBuilder<'a> {
        OperationBuilder::new(self.bundle, kind).recorder(self.recorder)
    }

    /// Defines a shared fragment and returns a spread for use in operations.
    ///
    /// Fragment selections cannot reference variables.
    pub fn define_fragment<F>(&mut self, name: &str, on_type: &str, f: F) -> BuildResult<FragmentSpread>
    where
        F: for<'b> FnOnce(&mut SelectionSetBuilder<'b>) -> BuildResult<()>,
    {
        if self.fragments.iter().any(|fragment| fragment.name == name) {
            return Err(BuildError::DuplicateFragmentName {
                name: name.to_string(),
            });
        }
        let target = self
            .bundle
            .get(on_type)
            .ok_or_else(|| BuildError::UnknownType {
                type_name: on_type.to_string(),
            })?;
        if !target.is_composite() {
            return Err(BuildError::InvalidFragmentType {
                scope: on_type.to_string(),
                type_condition: on_type.to_string(),
            });
        }

        let ctx = BuildContext {
            bundle: self.bundle,
            recorder: self.recorder,
            variables: &[],
        };
        let mut builder = SelectionSetBuilder::new(ctx, target)?;
        f(&mut builder)?;
        let selection_set = builder.finish();
        if selection_set.is_empty() {
            return Err(BuildError::EmptySelection {
                type_name: target.name.clone(),
            });
        }

        let fragment = Arc::new(FragmentDefinition {
            name: name.to_string(),
            type_condition: target.name.clone(),
            selection_set: Arc::new(selection_set),
        });
        self.fragments.push(fragment.clone());
        Ok(FragmentSpread { fragment })
    }

    /// Adds an operation, pulling in every fragment it spreads.
    pub fn add_operation(&mut self, operation: Operation) -> BuildResult<Arc<Operation>> {
        match &operation.name {
            None if !self.operations.is_empty() => {
                return Err(BuildError::AnonymousOperationInDocument);
            }
            Some(_) if self.operations.iter().any(|op| op.name.is_none()) => {
                return Err(BuildError::AnonymousOperationInDocument);
            }
            Some(name) if self.operations.iter().any(|op| op.name.as_ref() == Some(name)) => {
                return Err(BuildError::DuplicateOperationName { name: name.clone() });
            }
            _ => {}
        }

        for fragment in operation.fragments() {
            match self.fragments.iter().find(|f| f.name == fragment.name) {
                Some(existing) if existing == &fragment => {}
                Some(_) => {
                    return Err(BuildError::DuplicateFragmentName {
                        name: fragment.name.clone(),
                    });
                }
                None => self.fragments.push(fragment),
            }
        }

        let operation = Arc::new(operation);
        self.operations.push(operation.clone());
        Ok(operation)
    }

    pub fn build(self) -> Document {
        Document {
            operations: self.operations,
            fragments: self.fragments,
        }
    }
}
