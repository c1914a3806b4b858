//! Applying partial status updates to the store.
//!
//! An update is applied in two passes over the incoming object:
//!
//! 1. **Announce**: walk the update depth-first and, for every path it
//!    touches (leaves and containing mappings alike), compare what the store
//!    holds now with what the path will hold afterwards. Publish each
//!    difference. Children are announced before the mapping that contains
//!    them. The store is not written during this pass, so every comparison
//!    is against the pre-update state.
//! 2. **Apply**: walk the update again in the same order and write every
//!    changed leaf. Mappings are merged into, never replaced, so keys the
//!    update does not mention survive.
//!
//! Nothing is ever deleted: `null` is stored as a value like any other.
//! Sequences are leaves and are compared and replaced whole.

use crate::error::{Result, StatusError};
use crate::path::Path;
use crate::store::StatusStore;
use crate::types::{self, has_changed, UpdateSummary};
use parking_lot::ReentrantMutex;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::sync::Arc;

/// One pending notification from the announce pass.
struct Change {
    path: Path,
    value: Value,
}

/// Feeds update objects into a [`StatusStore`].
///
/// Updates are serialized: concurrent callers on other threads wait their
/// turn. A subscriber that calls `update` from inside a notification gets
/// [`StatusError::ReentrantUpdate`]; it should queue the update instead.
pub struct StatusSynchronizer {
    store: Arc<StatusStore>,
    /// Held for the duration of an update; the flag marks "already inside".
    guard: ReentrantMutex<Cell<bool>>,
}

/// Clears the in-update flag even if a pass unwinds.
struct Updating<'a>(&'a Cell<bool>);

impl Drop for Updating<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl StatusSynchronizer {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self {
            store,
            guard: ReentrantMutex::new(Cell::new(false)),
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Apply a JSON-encoded update.
    ///
    /// Decoding uses serde_json's default nesting limit of 128 levels; deeper
    /// text fails with [`StatusError::Decode`]. [`update`](Self::update)
    /// itself has no depth limit, so a caller with deeper data can decode it
    /// separately and pass the value in.
    pub fn update_json(&self, text: &str) -> Result<UpdateSummary> {
        let update: Value = serde_json::from_str(text)?;
        self.update(&update)
    }

    /// Apply a partial update object.
    ///
    /// The update must be a mapping; anything else is rejected and the store
    /// is left untouched.
    pub fn update(&self, update: &Value) -> Result<UpdateSummary> {
        let Value::Object(entries) = update else {
            tracing::warn!(kind = types::kind_of(update), "rejecting non-mapping update");
            return Err(StatusError::MalformedUpdate(format!(
                "expected a mapping at the top level, got {}",
                types::kind_of(update)
            )));
        };

        let guard = self.guard.lock();
        if guard.get() {
            tracing::warn!("rejecting re-entrant update");
            return Err(StatusError::ReentrantUpdate);
        }
        guard.set(true);
        let _updating = Updating(&guard);

        let mut summary = UpdateSummary::default();

        for change in self.collect_changes(entries) {
            let report = self.store.publish(&change.path, &change.value);
            summary.notified += 1;
            summary.delivery.absorb(report);
        }

        let mut path = Path::root();
        self.apply_entries(&mut path, entries, &mut summary);

        tracing::debug!(
            notified = summary.notified,
            written = summary.written,
            failed = summary.delivery.failed,
            "status update applied"
        );

        Ok(summary)
    }

    /// Announce pass: compute every change against the current store,
    /// deepest first within each branch.
    ///
    /// Changes are gathered under a read lock and published after it is
    /// released, so subscribers can read the (still unmodified) store.
    fn collect_changes(&self, entries: &Map<String, Value>) -> Vec<Change> {
        let mut changes = Vec::new();
        let mut path = Path::root();

        self.store.read_root(|root| {
            for (key, new) in entries {
                path.push(key.as_str());
                let old = root.and_then(|m| m.get(key));
                let next = projected(old, new, &mut path, &mut changes);
                if has_changed(old, &next) {
                    changes.push(Change {
                        path: path.clone(),
                        value: next,
                    });
                }
                path.pop();
            }
        });

        changes
    }

    /// Apply pass: write changed leaves, merging into mappings.
    fn apply_entries(
        &self,
        path: &mut Path,
        entries: &Map<String, Value>,
        summary: &mut UpdateSummary,
    ) {
        for (key, new) in entries {
            path.push(key.as_str());

            match new {
                Value::Object(children) => {
                    if !self.store.read_path(path, |old| old.is_some_and(Value::is_object)) {
                        self.store.set_path(path, Value::Object(Map::new()));
                        summary.written += 1;
                    }
                    self.apply_entries(path, children, summary);
                }
                leaf => {
                    if self.store.read_path(path, |old| has_changed(old, leaf)) {
                        self.store.set_path(path, leaf.clone());
                        summary.written += 1;
                    }
                }
            }

            path.pop();
        }
    }
}

/// Value `path` will hold once `new` is applied over `old`, recording the
/// changes found beneath it along the way.
fn projected(
    old: Option<&Value>,
    new: &Value,
    path: &mut Path,
    changes: &mut Vec<Change>,
) -> Value {
    let Value::Object(entries) = new else {
        return new.clone();
    };

    let old = old.and_then(Value::as_object);
    let mut merged = old.cloned().unwrap_or_default();

    for (key, child) in entries {
        path.push(key.as_str());
        let child_old = old.and_then(|m| m.get(key));
        let next = projected(child_old, child, path, changes);
        if has_changed(child_old, &next) {
            changes.push(Change {
                path: path.clone(),
                value: next.clone(),
            });
        }
        merged.insert(key.clone(), next);
        path.pop();
    }

    Value::Object(merged)
}
