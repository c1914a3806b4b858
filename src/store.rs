//! The path-addressed status store.

use crate::config::StatusConfig;
use crate::error::SubscriberResult;
use crate::observer::StatusObserver;
use crate::path::Path;
use crate::subscriptions::{
    Callback, SubscriptionHandle, SubscriptionId, SubscriptionManager, WatchConfig,
};
use crate::types::{self, PublishReport};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Nested status tree with path-scoped change notification.
///
/// The root is always a mapping. Values are addressed by [`Path`]; the
/// string methods (`get`, `set`, `on`, `watch`) accept the `/`-joined form.
///
/// The store is only mutated by a [`StatusSynchronizer`](crate::StatusSynchronizer)
/// in normal operation. `set` and `publish` are public so a caller can drive
/// the two halves by hand, but neither one triggers the other.
pub struct StatusStore {
    /// Root value, always a mapping.
    data: RwLock<Value>,

    /// Subscribers by exact path.
    subscriptions: SubscriptionManager,

    /// Buffer size used by `watch`.
    watch_buffer_size: usize,
}

impl StatusStore {
    /// Create a store seeded from `config`.
    pub fn new(config: &StatusConfig) -> Self {
        Self {
            data: RwLock::new(Value::Object(config.seed.clone())),
            subscriptions: SubscriptionManager::new(),
            watch_buffer_size: config.watch_buffer_size,
        }
    }

    /// Create a store with an empty root.
    pub fn empty() -> Self {
        Self::new(&StatusConfig::unseeded())
    }

    // --- Reads ---

    /// Current value at a `/`-joined path, cloned.
    ///
    /// Returns `None` if any segment is missing or the walk reaches a
    /// non-mapping before the last segment.
    ///
    /// `/` always splits segments here. A key that itself contains `/`
    /// (from an update such as `{"a/b": 1}`) is stored as one segment and
    /// is only reachable through [`get_path`](Self::get_path) or
    /// [`snapshot`](Self::snapshot).
    pub fn get(&self, path: &str) -> Option<Value> {
        self.get_path(&Path::parse(path))
    }

    /// Current value at `path`, cloned.
    pub fn get_path(&self, path: &Path) -> Option<Value> {
        let found = self.read_path(path, |v| v.cloned());
        if found.is_none() {
            tracing::debug!(%path, "key not found");
        }
        found
    }

    /// Run `f` against the value at `path` without cloning it.
    ///
    /// The store is read-locked while `f` runs; `f` must not write to it.
    pub fn read_path<R>(&self, path: &Path, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let data = self.data.read();
        f(resolve(Some(&*data), path.segments()))
    }

    /// Run `f` against the root mapping without cloning it.
    pub(crate) fn read_root<R>(&self, f: impl FnOnce(Option<&Map<String, Value>>) -> R) -> R {
        f(self.data.read().as_object())
    }

    /// Whether a value exists at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.read_path(path, |v| v.is_some())
    }

    /// Clone of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.data.read().clone()
    }

    // --- Writes ---

    /// Write `value` at a `/`-joined path. See [`set_path`](Self::set_path).
    pub fn set(&self, path: &str, value: Value) {
        self.set_path(&Path::parse(path), value);
    }

    /// Write `value` at `path`, creating missing intermediate mappings.
    ///
    /// An intermediate segment that holds something other than a mapping is
    /// replaced by an empty mapping and its old value is lost. Writing the
    /// root replaces the whole tree, and is ignored unless `value` is a
    /// mapping.
    pub fn set_path(&self, path: &Path, value: Value) {
        let mut data = self.data.write();

        let Some((last, parents)) = path.segments().split_last() else {
            match value {
                root @ Value::Object(_) => *data = root,
                other => tracing::warn!(
                    kind = types::kind_of(&other),
                    "ignoring write of non-mapping to root"
                ),
            }
            return;
        };

        let Value::Object(root) = &mut *data else {
            return;
        };
        let mut node: &mut Map<String, Value> = root;
        for segment in parents {
            let slot = node
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                tracing::debug!(
                    %path,
                    segment = segment.as_str(),
                    kind = types::kind_of(slot),
                    "replacing non-mapping intermediate"
                );
                *slot = Value::Object(Map::new());
            }
            let Value::Object(next) = slot else {
                return;
            };
            node = next;
        }

        node.insert(last.clone(), value);
    }

    // --- Subscriptions ---

    /// Call `callback` with the new value whenever the value at exactly
    /// `path` (`/`-joined) changes.
    ///
    /// Like [`get`](Self::get), the string is split on every `/`. To follow a
    /// key that contains `/`, build the [`Path`] with [`Path::child`] and use
    /// [`subscribe`](Self::subscribe).
    pub fn on<F>(&self, path: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) -> SubscriberResult + Send + Sync + 'static,
    {
        self.subscribe(Path::parse(path), Arc::new(callback))
    }

    /// Register a callback at exactly `path`.
    pub fn subscribe(&self, path: Path, callback: Callback) -> SubscriptionId {
        self.subscriptions.subscribe(path, callback)
    }

    /// Receive changes at exactly `path` (`/`-joined) over a channel.
    pub fn watch(&self, path: &str) -> SubscriptionHandle {
        self.watch_with(
            Path::parse(path),
            WatchConfig {
                buffer_size: self.watch_buffer_size,
            },
        )
    }

    /// Receive changes at exactly `path` over a channel with explicit limits.
    pub fn watch_with(&self, path: Path, config: WatchConfig) -> SubscriptionHandle {
        self.subscriptions.watch(path, config)
    }

    /// Register `observer` on each of its paths.
    pub fn attach(&self, observer: Arc<dyn StatusObserver>) -> Vec<SubscriptionId> {
        observer
            .paths()
            .into_iter()
            .map(|path| {
                let observer = Arc::clone(&observer);
                let at = path.clone();
                self.subscriptions
                    .subscribe(path, Arc::new(move |value: &Value| observer.on_change(&at, value)))
            })
            .collect()
    }

    /// Remove a subscription. Returns false if `id` was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Deliver `value` to every subscriber at exactly `path`.
    ///
    /// Does not touch the stored data.
    pub fn publish(&self, path: &Path, value: &Value) -> PublishReport {
        self.subscriptions.publish(path, value)
    }

    /// Structural comparison used for change detection.
    pub fn has_changed(old: Option<&Value>, new: &Value) -> bool {
        types::has_changed(old, new)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    pub fn subscriber_count(&self, path: &Path) -> usize {
        self.subscriptions.subscriber_count(path)
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(&StatusConfig::default())
    }
}

/// Walk `rest` starting from `start`, through mappings only.
pub(crate) fn resolve<'a>(start: Option<&'a Value>, rest: &[String]) -> Option<&'a Value> {
    rest.iter().try_fold(start?, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}
