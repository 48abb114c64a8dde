//! Recording of the schema types a build touches.
//!
//! Builders report every type they visit to a [`TypeRecorder`]. The default
//! recorder ignores them; a [`TypeTracker`] collects them between
//! `start_tracking` and `pause_tracking` so a bundle can be trimmed down to
//! what an application actually queries.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Receives type names from builders.
pub trait TypeRecorder: Send + Sync {
    fn record(&self, type_name: &str);
}

/// Recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl TypeRecorder for NoopRecorder {
    fn record(&self, _type_name: &str) {}
}

pub(crate) static NOOP_RECORDER: NoopRecorder = NoopRecorder;

#[derive(Debug, Default)]
struct TrackerState {
    active: bool,
    types: BTreeSet<String>,
}

/// Collects type names while tracking is active.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct TypeTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl TypeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_tracking(&self) {
        self.lock().active = true;
    }

    /// Stops recording; already tracked types are kept.
    pub fn pause_tracking(&self) {
        self.lock().active = false;
    }

    /// Forgets every tracked type and stops recording until the next
    /// `start_tracking`.
    pub fn reset_tracker(&self) {
        let mut state = self.lock();
        state.types.clear();
        state.active = false;
    }

    pub fn is_tracking(&self) -> bool {
        self.lock().active
    }

    /// Tracked type names, sorted and without duplicates.
    pub fn tracked_types(&self) -> Vec<String> {
        self.lock().types.iter().cloned().collect()
    }

    /// Tracked type names joined with commas.
    pub fn types_line(&self) -> String {
        self.tracked_types().join(",")
    }

    /// Writes [`TypeTracker::types_line`] to stderr.
    pub fn print_types(&self) {
        eprintln!("{}", self.types_line());
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TypeRecorder for TypeTracker {
    fn record(&self, type_name: &str) {
        let mut state = self.lock();
        if state.active && !state.types.contains(type_name) {
            state.types.insert(type_name.to_string());
        }
    }
}

/// Process-wide tracker, for code that cannot thread a recorder through.
pub fn global() -> &'static TypeTracker {
    static GLOBAL: OnceLock<TypeTracker> = OnceLock::new();
    GLOBAL.get_or_init(TypeTracker::new)
}
