//! Subscription manager for broadcasting status changes.

use crate::path::Path;
use crate::types::PublishReport;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{
    Callback, DropReason, StatusEvent, SubscriptionHandle, SubscriptionId, WatchConfig,
};

/// Where a subscription delivers.
#[derive(Clone)]
enum Sink {
    Callback(Callback),
    Channel(Sender<StatusEvent>),
}

/// Internal subscription state.
#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    sink: Sink,
}

#[derive(Default)]
struct Registry {
    /// Subscribers per path, in registration order.
    by_path: HashMap<Path, Vec<Subscription>>,
    /// Reverse lookup for unsubscribe.
    paths: HashMap<SubscriptionId, Path>,
}

impl Registry {
    fn insert(&mut self, path: Path, sub: Subscription) {
        self.paths.insert(sub.id, path.clone());
        self.by_path.entry(path).or_default().push(sub);
    }

    fn remove(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let path = self.paths.remove(&id)?;
        let subs = self.by_path.get_mut(&path)?;
        let pos = subs.iter().position(|s| s.id == id)?;
        let sub = subs.remove(pos);
        if subs.is_empty() {
            self.by_path.remove(&path);
        }
        Some(sub)
    }
}

/// Manages subscriptions and delivers changes to them.
pub struct SubscriptionManager {
    registry: RwLock<Registry>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a callback at exactly `path`.
    pub fn subscribe(&self, path: Path, callback: Callback) -> SubscriptionId {
        let id = self.allocate_id();
        tracing::trace!(%id, %path, "callback subscribed");
        self.registry.write().insert(
            path,
            Subscription {
                id,
                sink: Sink::Callback(callback),
            },
        );
        id
    }

    /// Register a channel subscriber at exactly `path`.
    pub fn watch(&self, path: Path, config: WatchConfig) -> SubscriptionHandle {
        let id = self.allocate_id();
        let (sender, receiver) = bounded(config.buffer_size);
        tracing::trace!(%id, %path, buffer = config.buffer_size, "watcher subscribed");

        self.registry.write().insert(
            path.clone(),
            Subscription {
                id,
                sink: Sink::Channel(sender),
            },
        );

        SubscriptionHandle { id, path, receiver }
    }

    /// Unsubscribe and clean up. Returns false if `id` was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.write().remove(id);
        match removed {
            Some(sub) => {
                if let Sink::Channel(sender) = sub.sink {
                    // Best effort
                    let _ = sender.try_send(StatusEvent::Dropped {
                        reason: DropReason::Unsubscribed,
                    });
                }
                true
            }
            None => false,
        }
    }

    /// Total number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.read().paths.len()
    }

    /// Number of subscriptions at exactly `path`.
    pub fn subscriber_count(&self, path: &Path) -> usize {
        self.registry
            .read()
            .by_path
            .get(path)
            .map_or(0, Vec::len)
    }

    /// Deliver `value` to every subscriber at exactly `path`, in registration
    /// order.
    ///
    /// A callback that errors or panics is logged and counted; delivery to
    /// the rest continues. Watchers whose buffer is full or whose receiver is
    /// gone are removed. No lock is held while callbacks run, so a callback
    /// may subscribe or unsubscribe.
    pub fn publish(&self, path: &Path, value: &Value) -> PublishReport {
        let subs: Vec<Subscription> = match self.registry.read().by_path.get(path) {
            Some(subs) => subs.clone(),
            None => return PublishReport::default(),
        };

        tracing::trace!(%path, subscribers = subs.len(), "publishing change");

        let mut report = PublishReport::default();
        let mut to_remove = Vec::new();

        for sub in &subs {
            match &sub.sink {
                Sink::Callback(callback) => {
                    match catch_unwind(AssertUnwindSafe(|| callback(value))) {
                        Ok(Ok(())) => report.delivered += 1,
                        Ok(Err(e)) => {
                            tracing::warn!(id = %sub.id, %path, error = %e, "subscriber failed");
                            report.failed += 1;
                        }
                        Err(panic) => {
                            tracing::warn!(
                                id = %sub.id,
                                %path,
                                panic = panic_message(panic.as_ref()),
                                "subscriber panicked"
                            );
                            report.failed += 1;
                        }
                    }
                }
                Sink::Channel(sender) => {
                    let event = StatusEvent::Changed {
                        path: path.clone(),
                        value: value.clone(),
                    };
                    match sender.try_send(event) {
                        Ok(()) => report.delivered += 1,
                        Err(crossbeam_channel::TrySendError::Full(_)) => {
                            to_remove.push((sub.id, DropReason::BufferOverflow));
                        }
                        Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                            to_remove.push((sub.id, DropReason::Disconnected));
                        }
                    }
                }
            }
        }

        // Remove dropped watchers
        if !to_remove.is_empty() {
            let mut registry = self.registry.write();
            for (id, reason) in to_remove {
                if let Some(sub) = registry.remove(id) {
                    tracing::warn!(%id, %path, ?reason, "dropping watcher");
                    report.dropped += 1;
                    if let Sink::Channel(sender) = sub.sink {
                        // Might fail, that's ok
                        let _ = sender.try_send(StatusEvent::Dropped { reason });
                    }
                }
            }
        }

        report
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
