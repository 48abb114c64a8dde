//! Per-type model constructors.

use crate::model::{GraphModel, Model};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Wraps a decoded [`Model`] into an application type.
pub type ModelConstructor = Arc<dyn Fn(Model) -> Arc<dyn GraphModel> + Send + Sync>;

/// Maps concrete type names to model constructors.
///
/// Types without a registered constructor decode to a plain [`Model`].
#[derive(Clone, Default)]
pub struct ClassRegistry {
    constructors: FxHashMap<String, ModelConstructor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for `type_name`, replacing any previous one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn(Model) -> Arc<dyn GraphModel> + Send + Sync + 'static,
    {
        self.constructors
            .insert(type_name.into(), Arc::new(constructor));
    }

    pub fn lookup(&self, type_name: &str) -> Option<&ModelConstructor> {
        self.constructors.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Instantiates `model` with the constructor registered for its type,
    /// falling back to the model itself.
    pub fn construct(&self, model: Model) -> Arc<dyn GraphModel> {
        match self.lookup(model.type_name()) {
            Some(constructor) => constructor(model),
            None => Arc::new(model),
        }
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("ClassRegistry")
            .field("types", &names)
            .finish()
    }
}
