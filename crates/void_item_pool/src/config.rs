//! Pool subsystem configuration

use serde::{Deserialize, Serialize};
use void_inventory::{InventoryError, Result};

/// Defaults applied to every lazily created per-class pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// When off, every request allocates and every return drops
    pub enable_pooling: bool,
    pub default_max_pool_size: usize,
    /// Instances allocated when a class's pool is first created
    pub default_prewarm_count: usize,
    pub default_strict_limit: bool,
    pub default_auto_grow: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enable_pooling: true,
            default_max_pool_size: 100,
            default_prewarm_count: 10,
            default_strict_limit: false,
            default_auto_grow: true,
        }
    }
}

impl PoolConfig {
    /// Parse from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| InventoryError::invalid_argument(format!("Invalid pool config: {}", e)))
    }

    /// No pooling: always allocate, always drop
    pub fn disabled() -> Self {
        Self {
            enable_pooling: false,
            ..Self::default()
        }
    }

    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.default_max_pool_size = size;
        self
    }

    pub fn with_prewarm_count(mut self, count: usize) -> Self {
        self.default_prewarm_count = count;
        self
    }

    pub fn with_strict_limit(mut self, strict: bool) -> Self {
        self.default_strict_limit = strict;
        self
    }

    pub fn with_auto_grow(mut self, auto_grow: bool) -> Self {
        self.default_auto_grow = auto_grow;
        self
    }
}
