//! Narrow interface between the status core and whatever renders it.

use crate::error::SubscriberResult;
use crate::path::Path;
use serde_json::Value;

/// A renderer, or anything else, that reacts to changes at a fixed set of
/// paths.
///
/// Attach with [`StatusStore::attach`](crate::StatusStore::attach). The
/// observer is called once per changed path it listed, with the new value.
pub trait StatusObserver: Send + Sync {
    /// Paths this observer listens on. Read once, at attach time.
    fn paths(&self) -> Vec<Path>;

    /// Called with the new value at `path`.
    fn on_change(&self, path: &Path, value: &Value) -> SubscriberResult;
}
