//! # Scene Mirror
//!
//! Client-side mirror of a remote scene manager's status, with path-scoped
//! change notifications for whatever renders it.
//!
//! ## Core Concepts
//!
//! - **Store**: a nested JSON tree addressed by `/`-joined paths
//! - **Subscriptions**: callbacks or channels bound to one exact path
//! - **Synchronizer**: applies partial updates, announcing every changed
//!   path before writing anything
//! - **Transport**: the request and push contracts a client implements
//!
//! ## Example
//!
//! ```ignore
//! use scene_mirror::{StatusConfig, StatusStore, StatusSynchronizer};
//! use std::sync::Arc;
//!
//! let store = Arc::new(StatusStore::new(&StatusConfig::default()));
//! let sync = StatusSynchronizer::new(Arc::clone(&store));
//!
//! store.on("scene-manager/state", |state| {
//!     println!("scene is {state}");
//!     Ok(())
//! });
//!
//! sync.update(&json!({"scene-manager": {"state": "idle"}}))?;    // prints once
//! sync.update(&json!({"scene-manager": {"state": "idle"}}))?;    // silent
//! ```

pub mod config;
pub mod error;
pub mod observer;
pub mod path;
pub mod push;
pub mod store;
pub mod subscriptions;
pub mod sync;
pub mod transport;
pub mod types;

// Re-exports
pub use config::{default_seed, StatusConfig, DEFAULT_STATUS_EVENT};
pub use error::{Result, StatusError, SubscriberError, SubscriberResult, TransportError};
pub use observer::StatusObserver;
pub use path::Path;
pub use push::{PumpStats, PushMessage, PushPump};
pub use store::StatusStore;
pub use subscriptions::{
    Callback, DropReason, StatusEvent, SubscriptionHandle, SubscriptionId, SubscriptionManager,
    WatchConfig,
};
pub use sync::StatusSynchronizer;
pub use transport::{Method, Request, SceneManagerApi, SceneManagerClient};
pub use types::*;
