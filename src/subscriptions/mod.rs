//! Path-scoped subscriptions to status changes.
//!
//! Two kinds of subscriber share one registry:
//! - callbacks, invoked synchronously with the new value
//! - watchers, fed through a bounded channel and dropped when they fall behind
//!
//! Matching is by exact path. A subscriber on `scene-manager` hears about the
//! whole object; it is not told about `scene-manager/state` separately.
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new();
//!
//! manager.subscribe(Path::parse("scene-manager/state"), Arc::new(|value| {
//!     println!("state is now {value}");
//!     Ok(())
//! }));
//!
//! let handle = manager.watch(Path::parse("chat-history"), WatchConfig::default());
//! while let Ok(StatusEvent::Changed { value, .. }) = handle.recv() {
//!     println!("{} messages", value.as_array().map_or(0, Vec::len));
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    Callback, DropReason, StatusEvent, SubscriptionHandle, SubscriptionId, WatchConfig,
};
