//! Void Inventory - Slot-group storage engine
//!
//! This crate provides typed slot storage for item instances.
//!
//! # Features
//!
//! - Slots with stack bookkeeping kept in sync with the held item
//! - Type-restricted slot groups with stacking, splitting and compaction
//! - Multi-group routing through a lazily rebuilt type ID index
//! - Cross-group transfers that put the item back on refusal
//! - Runtime-attached item modules with lifecycle hooks
//! - JSON layout configuration and a bincode save blob
//!
//! # Example
//!
//! ```ignore
//! use void_inventory::prelude::*;
//!
//! let config = InventoryConfig::default()
//!     .with_group(SlotGroupConfig::new(20).with_type(0, "Backpack"));
//! let mut inventory = SlotGroupCollection::from_config(&config)?;
//!
//! let potion = Item::new("Potion", ItemDefinition::new("potion", "Potion"))
//!     .with_max_stack(10)
//!     .with_stack(3);
//! inventory.add_item(potion, None)?;
//! assert_eq!(inventory.global_total_item_count("potion"), 3);
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod group;
pub mod item;
pub mod module;
pub mod save;
pub mod slot;

pub mod prelude {
    pub use crate::collection::{Added, ItemLocation, SlotGroupCollection};
    pub use crate::config::{InventoryConfig, SlotGroupConfig};
    pub use crate::error::{InventoryError, OperationResult, Rejected, Result, TransferError};
    pub use crate::group::{Placement, SlotGroup};
    pub use crate::item::{InstanceId, Item, ItemClass, ItemDefinition, OwnerId};
    pub use crate::module::{ItemModule, ModuleList, ModuleState};
    pub use crate::save::ItemSaveData;
    pub use crate::slot::{InventorySlot, SlotRemoval};
}

pub use prelude::*;
