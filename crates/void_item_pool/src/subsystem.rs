//! Two-tier item pool subsystem
//!
//! A scoped subsystem (one per world or owner) keeps per-class pools and may
//! hold a shared fallback subsystem. The scoped tier asks the fallback for an
//! instance when its own free list is empty, and forwards returns it cannot
//! keep. The fallback tier is terminal: it has no fallback of its own and
//! drops what it cannot keep.

use crate::config::PoolConfig;
use crate::pool::ItemPool;
use crate::registry::ClassRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use void_inventory::{InventoryError, Item, ItemClass, OwnerId, Result};

/// Fallback tier, shared by every scoped subsystem that uses it
pub type SharedItemPool = Arc<Mutex<ItemPoolSubsystem>>;

/// Per-class pools for one scope
pub struct ItemPoolSubsystem {
    scope: OwnerId,
    label: &'static str,
    config: PoolConfig,
    pools: HashMap<ItemClass, ItemPool>,
    registry: Arc<ClassRegistry>,
    fallback: Option<SharedItemPool>,
}

impl ItemPoolSubsystem {
    /// Create a terminal (shared) tier
    pub fn new(scope: OwnerId, config: PoolConfig, registry: Arc<ClassRegistry>) -> Self {
        log::info!("Shared item pool initialized for {}", scope);
        Self {
            scope,
            label: "Shared",
            config,
            pools: HashMap::new(),
            registry,
            fallback: None,
        }
    }

    /// Create a scoped tier backed by `fallback`
    pub fn with_fallback(
        scope: OwnerId,
        config: PoolConfig,
        registry: Arc<ClassRegistry>,
        fallback: SharedItemPool,
    ) -> Self {
        log::info!("Scoped item pool initialized for {}", scope);
        Self {
            scope,
            label: "Scoped",
            config,
            pools: HashMap::new(),
            registry,
            fallback: Some(fallback),
        }
    }

    /// Wrap for use as a fallback tier
    pub fn into_shared(self) -> SharedItemPool {
        Arc::new(Mutex::new(self))
    }

    /// Owner stamped on pooled instances
    pub fn scope(&self) -> OwnerId {
        self.scope
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Whether this is a scoped tier
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn is_pooling_enabled(&self) -> bool {
        self.config.enable_pooling
    }

    /// Check out an instance for `owner`.
    ///
    /// Order: own free list (hit), then the fallback tier's free list, then a
    /// fresh allocation (miss). A strict-limit pool returns `None` instead of
    /// allocating. An unregistered class also returns `None`.
    pub fn get_item_from_pool(&mut self, class: &ItemClass, owner: OwnerId) -> Option<Item> {
        if !self.config.enable_pooling {
            let mut item = self.registry.create(class)?;
            item.set_owner(owner);
            return Some(item);
        }
        if !self.registry.contains(class) {
            log::warn!("Cannot pool unregistered item class '{}'", class);
            return None;
        }

        self.ensure_pool(class);
        let pool = self.pools.get_mut(class)?;

        if let Some(mut item) = pool.available.pop() {
            pool.stats.hits += 1;
            check_out(&mut item, owner);
            pool.active.insert(item.instance_id());
            return Some(item);
        }

        let borrowed = self
            .fallback
            .as_ref()
            .and_then(|fallback| fallback.lock().take_pooled(class));
        if let Some(mut item) = borrowed {
            log::debug!("{} pool for '{}' served from fallback", self.label, class);
            check_out(&mut item, owner);
            pool.active.insert(item.instance_id());
            return Some(item);
        }

        pool.stats.misses += 1;
        if pool.strict_limit {
            log::warn!(
                "Pool empty for '{}' and strict limit is on, returning no instance",
                class
            );
            return None;
        }

        let mut item = self.registry.create(class)?;
        item.set_owner(owner);
        pool.active.insert(item.instance_id());
        Some(item)
    }

    /// Like [`get_item_from_pool`](Self::get_item_from_pool) with the reason
    /// for a missing instance
    pub fn try_get_item_from_pool(&mut self, class: &ItemClass, owner: OwnerId) -> Result<Item> {
        match self.get_item_from_pool(class, owner) {
            Some(item) => Ok(item),
            None if !self.registry.contains(class) => Err(InventoryError::not_found(format!(
                "Item class '{}' is not registered",
                class
            ))),
            None => Err(InventoryError::capacity_exceeded(format!(
                "Pool for '{}' is at its strict limit",
                class
            ))),
        }
    }

    /// Serve a request from the free list only, never allocating. Used by a
    /// scoped tier consulting this one.
    fn take_pooled(&mut self, class: &ItemClass) -> Option<Item> {
        if !self.config.enable_pooling || !self.registry.contains(class) {
            return None;
        }

        self.ensure_pool(class);
        let pool = self.pools.get_mut(class)?;
        match pool.available.pop() {
            Some(item) => {
                pool.stats.hits += 1;
                Some(item)
            }
            None => {
                pool.stats.misses += 1;
                None
            }
        }
    }

    /// Hand an instance back for reuse.
    ///
    /// Below capacity the item is reset and kept. At capacity an auto-grow
    /// pool raises its limit by one and keeps it anyway; otherwise the return
    /// counts as an overflow and the item goes to the fallback tier, or is
    /// dropped if there is none.
    pub fn return_item_to_pool(&mut self, mut item: Item) {
        if !self.config.enable_pooling {
            return;
        }

        let class = item.class().clone();
        self.ensure_pool(&class);
        let Some(pool) = self.pools.get_mut(&class) else {
            return;
        };
        pool.active.remove(&item.instance_id());

        if pool.available.len() < pool.max_size {
            pool.stats.returns += 1;
            item.reset_to_default();
            item.set_owner(self.scope);
            pool.available.push(item);
            return;
        }

        if pool.auto_grow {
            pool.stats.returns += 1;
            pool.max_size += 1;
            item.reset_to_default();
            item.set_owner(self.scope);
            pool.available.push(item);
            log::debug!("Pool for '{}' auto-grew to size {}", class, pool.max_size);
            return;
        }

        pool.stats.overflows += 1;
        match &self.fallback {
            Some(fallback) => {
                log::debug!("Pool for '{}' full, forwarding to fallback", class);
                fallback.lock().return_item_to_pool(item);
            }
            None => log::debug!("Pool for '{}' full, dropping {}", class, item.instance_id()),
        }
    }

    /// Stop tracking a checked-out instance and drop it instead of reusing it
    pub fn release(&mut self, item: Item) {
        let id = item.instance_id();
        let tracked = self
            .pools
            .get_mut(item.class())
            .is_some_and(|pool| pool.active.remove(&id));
        if !tracked {
            log::debug!("Released {} was not checked out from {} pool", id, self.label);
        }
    }

    /// Allocate `count` fresh instances into the free list. Returns how many
    /// were created.
    pub fn prewarm_pool(&mut self, class: &ItemClass, count: usize) -> usize {
        if count == 0 || !self.config.enable_pooling {
            return 0;
        }
        self.ensure_pool(class);
        let created = self.fill(class, count);
        log::info!("Prewarmed pool for '{}' with {} items", class, created);
        created
    }

    /// Drop every pool and its instances
    pub fn clear_all_pools(&mut self) {
        if self.pools.is_empty() {
            return;
        }
        self.pools.clear();
        log::info!("Cleared all {} item pools", self.label);
    }

    /// Drop the free list and checkout tracking of one class. Policy and
    /// stats stay.
    pub fn clear_pool(&mut self, class: &ItemClass) {
        if let Some(pool) = self.pools.get_mut(class) {
            pool.available.clear();
            pool.active.clear();
            log::info!("Cleared pool for '{}'", class);
        }
    }

    /// `(available, active, total)` for a class, zeros if it has no pool
    pub fn pool_stats(&self, class: &ItemClass) -> (usize, usize, usize) {
        self.pools.get(class).map_or((0, 0, 0), |pool| {
            (pool.available_count(), pool.active_count(), pool.total_count())
        })
    }

    /// Set a class's capacity. Free instances beyond it go to the fallback
    /// tier, or are dropped.
    pub fn set_max_pool_size(&mut self, class: &ItemClass, max_size: usize) {
        self.ensure_pool(class);
        let Some(pool) = self.pools.get_mut(class) else {
            return;
        };
        pool.max_size = max_size;

        let keep = pool.available.len().min(max_size);
        let evicted: Vec<Item> = pool.available.drain(keep..).collect();
        if evicted.is_empty() {
            return;
        }
        log::debug!(
            "Evicting {} '{}' items above new max {}",
            evicted.len(),
            class,
            max_size
        );
        if let Some(fallback) = &self.fallback {
            let mut fallback = fallback.lock();
            for item in evicted {
                fallback.return_item_to_pool(item);
            }
        }
    }

    /// Set the strict-limit and auto-grow policy of a class
    pub fn configure_pool(&mut self, class: &ItemClass, strict_limit: bool, auto_grow: bool) {
        self.ensure_pool(class);
        if let Some(pool) = self.pools.get_mut(class) {
            pool.strict_limit = strict_limit;
            pool.auto_grow = auto_grow;
        }
    }

    /// Hit rate percentage for a class, 0 if it has no pool
    pub fn pool_hit_rate(&self, class: &ItemClass) -> f32 {
        self.pools.get(class).map_or(0.0, |pool| pool.stats.hit_rate())
    }

    /// Read access to one class's pool record
    pub fn pool(&self, class: &ItemClass) -> Option<&ItemPool> {
        self.pools.get(class)
    }

    /// Human-readable stats for every class, sorted by class name
    pub fn all_pool_stats_summary(&self) -> String {
        let mut classes: Vec<&ItemClass> = self.pools.keys().collect();
        classes.sort();

        let mut summary = format!("=== {} Pool Stats ===\n", self.label);
        for class in classes {
            if let Some(pool) = self.pools.get(class) {
                summary.push_str(&pool.summary_line(class.name()));
            }
        }
        summary
    }

    /// Zero the counters of every class
    pub fn reset_pool_stats(&mut self) {
        for pool in self.pools.values_mut() {
            pool.stats.reset();
        }
        log::info!("{} pool stats reset", self.label);
    }

    /// Create the pool record on first use and prewarm it
    fn ensure_pool(&mut self, class: &ItemClass) {
        if self.pools.contains_key(class) {
            return;
        }
        let pool = ItemPool::from_config(&self.config);
        let prewarm = pool.prewarm_count;
        self.pools.insert(class.clone(), pool);
        if prewarm > 0 {
            self.fill(class, prewarm);
        }
    }

    fn fill(&mut self, class: &ItemClass, count: usize) -> usize {
        let Some(pool) = self.pools.get_mut(class) else {
            return 0;
        };

        let mut created = 0;
        for _ in 0..count {
            let Some(mut item) = self.registry.create(class) else {
                break;
            };
            item.reset_to_default();
            item.set_owner(self.scope);
            pool.available.push(item);
            created += 1;
        }
        created
    }
}

impl Drop for ItemPoolSubsystem {
    fn drop(&mut self) {
        self.clear_all_pools();
    }
}

/// Reparent, reset and re-initialize an instance leaving a pool
fn check_out(item: &mut Item, owner: OwnerId) {
    item.set_owner(owner);
    item.reset_to_default();
    item.initialize();
}
