// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for persistence, serialization and event logging.
//!
//! `Config` can be passed into `BundleDao::with_config`, `ActionManager::with_config` or
//! `SerializerBuilder::with_config`. All values have sensible defaults.
use serde::{Deserialize, Serialize};

/// Default maximum depth of relations followed by the serializer.
pub const DEFAULT_MAX_TRAVERSALS: usize = 10;

/// Default number of bundles kept in a serializer cache.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// Default id of the vertex heading the global event queue.
pub const DEFAULT_EVENT_ROOT: &str = "globalEventRoot";

/// Configuration parameters of the persistence layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum depth of relations followed when serializing a vertex.
    pub max_traversals: usize,

    /// Capacity of the LRU cache of serializers created with caching enabled.
    pub cache_size: usize,

    /// Id of the vertex heading the global event queue.
    pub event_root: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_traversals: DEFAULT_MAX_TRAVERSALS,
            cache_size: DEFAULT_CACHE_SIZE,
            event_root: DEFAULT_EVENT_ROOT.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, DEFAULT_EVENT_ROOT};

    #[test]
    fn partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"max_traversals": 3}"#).unwrap();
        assert_eq!(config.max_traversals, 3);
        assert_eq!(config.cache_size, 100);
        assert_eq!(config.event_root, DEFAULT_EVENT_ROOT);
    }
}
