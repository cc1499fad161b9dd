//! Save blob for item instances
//!
//! The byte payload is opaque to the storage layer; it only carries module
//! state so a loaded item can restore what its modules serialized.

use crate::error::{InventoryError, Result};
use crate::item::Item;
use std::collections::BTreeMap;

/// Serialized form of one item instance
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ItemSaveData {
    pub item_id: String,
    pub item_class: String,
    pub stack_size: u32,
    pub byte_data: Vec<u8>,
}

impl Default for ItemSaveData {
    fn default() -> Self {
        Self {
            item_id: String::new(),
            item_class: String::new(),
            stack_size: 1,
            byte_data: Vec::new(),
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ModuleRecord {
    name: String,
    data: BTreeMap<String, String>,
}

impl Item {
    /// Capture ID, class, stack size and module state
    pub fn save_to_struct(&self) -> Result<ItemSaveData> {
        let records: Vec<ModuleRecord> = self
            .modules()
            .iter()
            .map(|m| ModuleRecord {
                name: m.module_name().to_string(),
                data: m.serialize(),
            })
            .collect();

        let byte_data = bincode::serialize(&records).map_err(|e| {
            InventoryError::invalid_argument(format!("Failed to encode module data: {}", e))
        })?;

        Ok(ItemSaveData {
            item_id: self.item_id().to_string(),
            item_class: self.class().name().to_string(),
            stack_size: self.current_stack_size(),
            byte_data,
        })
    }

    /// Restore ID, stack size and module state. Records for modules that are
    /// not attached to this item are skipped.
    pub fn load_from_struct(&mut self, data: &ItemSaveData) -> Result<()> {
        let records: Vec<ModuleRecord> = if data.byte_data.is_empty() {
            Vec::new()
        } else {
            bincode::deserialize(&data.byte_data).map_err(|e| {
                InventoryError::invalid_argument(format!("Failed to decode module data: {}", e))
            })?
        };

        self.definition_mut().set_item_id(data.item_id.clone());
        self.set_current_stack_size(data.stack_size);

        for record in records {
            let target = self
                .modules_mut()
                .iter_mut()
                .find(|m| m.module_name() == record.name);
            match target {
                Some(module) => module.deserialize(&record.data),
                None => log::debug!("No module '{}' on item to load into", record.name),
            }
        }

        Ok(())
    }
}
