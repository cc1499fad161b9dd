//! Item class registry
//!
//! Maps class names to factories so pools can construct fresh instances.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use void_inventory::{Item, ItemClass};

/// Constructor for one item class
pub type ItemFactory = Arc<dyn Fn() -> Item + Send + Sync>;

/// Thread-safe registry of item factories, shared by both pool tiers
pub struct ClassRegistry {
    factories: RwLock<HashMap<ItemClass, ItemFactory>>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register a factory, replacing any previous one for the class
    pub fn register<F>(&self, class: impl Into<ItemClass>, factory: F)
    where
        F: Fn() -> Item + Send + Sync + 'static,
    {
        let class = class.into();
        let previous = self.factories.write().insert(class.clone(), Arc::new(factory));
        if previous.is_some() {
            log::warn!("Item class '{}' re-registered, replacing factory", class);
        }
    }

    /// Remove a class. Returns false if it was not registered.
    pub fn unregister(&self, class: &ItemClass) -> bool {
        self.factories.write().remove(class).is_some()
    }

    pub fn contains(&self, class: &ItemClass) -> bool {
        self.factories.read().contains_key(class)
    }

    /// Registered class names
    pub fn classes(&self) -> Vec<ItemClass> {
        self.factories.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Construct and initialize a fresh instance. None if the class is
    /// unknown or its factory produced a different class.
    pub fn create(&self, class: &ItemClass) -> Option<Item> {
        // Clone the factory out so it never runs under the lock
        let factory = self.factories.read().get(class).cloned();
        let Some(factory) = factory else {
            log::warn!("No factory registered for item class '{}'", class);
            return None;
        };

        let mut item = factory();
        if item.class() != class {
            log::error!(
                "Factory for '{}' produced an item of class '{}'",
                class,
                item.class()
            );
            return None;
        }
        item.initialize();
        Some(item)
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
