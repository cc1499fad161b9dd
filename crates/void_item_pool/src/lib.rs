//! Void Item Pool - Item instance pooling
//!
//! Reuses item instances per class instead of allocating and dropping them.
//!
//! # Features
//!
//! - Lazily created per-class pools, prewarmed on first use
//! - Hit/miss/return/overflow counters per class
//! - Strict-limit and auto-grow policies
//! - A scoped tier backed by an explicitly passed shared fallback tier
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use void_item_pool::prelude::*;
//!
//! let registry = Arc::new(ClassRegistry::new());
//! registry.register("Arrow", || {
//!     Item::new("Arrow", ItemDefinition::new("arrow", "Arrow")).with_max_stack(50)
//! });
//!
//! let shared = ItemPoolSubsystem::new(OwnerId(0), PoolConfig::default(), registry.clone())
//!     .into_shared();
//! let mut world =
//!     ItemPoolSubsystem::with_fallback(OwnerId(1), PoolConfig::default(), registry, shared);
//!
//! let arrow = world.get_item_from_pool(&ItemClass::new("Arrow"), OwnerId(42));
//! if let Some(arrow) = arrow {
//!     world.return_item_to_pool(arrow);
//! }
//! ```

pub mod config;
pub mod pool;
pub mod registry;
pub mod subsystem;

pub mod prelude {
    pub use crate::config::PoolConfig;
    pub use crate::pool::{ItemPool, PoolStats};
    pub use crate::registry::{ClassRegistry, ItemFactory};
    pub use crate::subsystem::{ItemPoolSubsystem, SharedItemPool};
    pub use void_inventory::{Item, ItemClass, ItemDefinition, OwnerId};
}

pub use prelude::*;
