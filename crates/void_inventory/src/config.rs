//! Inventory layout configuration

use crate::collection::SlotGroupCollection;
use crate::error::{InventoryError, Result};
use crate::group::SlotGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One slot group: its size and the type IDs it accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGroupConfig {
    pub size: usize,
    /// Type ID -> display label
    pub type_ids: BTreeMap<i32, String>,
}

impl SlotGroupConfig {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            type_ids: BTreeMap::new(),
        }
    }

    /// Allow another type ID
    pub fn with_type(mut self, type_id: i32, label: impl Into<String>) -> Self {
        self.type_ids.insert(type_id, label.into());
        self
    }
}

/// Layout of a whole inventory, groups in routing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default)]
    pub groups: Vec<SlotGroupConfig>,
}

impl InventoryConfig {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            InventoryError::invalid_argument(format!("Invalid inventory config: {}", e))
        })
    }

    /// Encode as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            InventoryError::invalid_argument(format!("Failed to encode config: {}", e))
        })
    }

    pub fn with_group(mut self, group: SlotGroupConfig) -> Self {
        self.groups.push(group);
        self
    }
}

impl SlotGroupCollection {
    /// Build every configured group. Fails on an empty or overlapping type set.
    pub fn from_config(config: &InventoryConfig) -> Result<Self> {
        let mut collection = SlotGroupCollection::new();
        for group in &config.groups {
            collection.add_group(SlotGroup::new(group.size, group.type_ids.clone()))?;
        }
        log::debug!("Built inventory with {} groups", collection.len());
        Ok(collection)
    }
}
