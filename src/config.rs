//! Status mirror configuration.

use crate::types::paths;
use serde_json::{Map, Value};

/// Push event name the scene manager uses for status broadcasts.
pub const DEFAULT_STATUS_EVENT: &str = "stream-status";

/// Status mirror configuration.
#[derive(Clone, Debug)]
pub struct StatusConfig {
    /// Initial contents of the store root.
    pub seed: Map<String, Value>,

    /// Buffer size for channel subscribers created with `StatusStore::watch`.
    pub watch_buffer_size: usize,

    /// Push event carrying status snapshots. Other events are ignored.
    pub status_event: String,

    /// Capacity of the push queue between the transport and the pump.
    pub push_buffer_size: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            watch_buffer_size: 256,
            status_event: DEFAULT_STATUS_EVENT.to_string(),
            push_buffer_size: 1024,
        }
    }
}

impl StatusConfig {
    /// Configuration with an empty root and default limits.
    pub fn unseeded() -> Self {
        Self {
            seed: Map::new(),
            ..Default::default()
        }
    }
}

/// The shape the scene manager's status starts from.
pub fn default_seed() -> Map<String, Value> {
    let mut seed = Map::new();
    seed.insert(paths::SCENE_MANAGER.to_string(), Value::Object(Map::new()));
    seed.insert(paths::CHARACTERS.to_string(), Value::Object(Map::new()));
    seed.insert(paths::CHAT_HISTORY.to_string(), Value::Array(Vec::new()));
    seed.insert(paths::ERRORS.to_string(), Value::Null);
    seed
}
