//! Per-class pool record

use crate::config::PoolConfig;
use std::collections::HashSet;
use void_inventory::{InstanceId, Item};

/// Reuse counters for one item class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Requests served from the free list
    pub hits: u64,
    /// Requests the free list could not serve
    pub misses: u64,
    pub returns: u64,
    /// Returns refused at capacity
    pub overflows: u64,
}

impl PoolStats {
    /// `hits / (hits + misses)` as a percentage, 0 with no requests
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32 * 100.0
        }
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Free and checked-out instances of one class, with its policy.
///
/// Pooled items live in `available`; checked-out items are owned by the
/// caller and tracked here by instance ID only.
#[derive(Debug)]
pub struct ItemPool {
    pub(crate) available: Vec<Item>,
    pub(crate) active: HashSet<InstanceId>,
    pub(crate) max_size: usize,
    pub(crate) prewarm_count: usize,
    pub(crate) strict_limit: bool,
    pub(crate) auto_grow: bool,
    pub(crate) stats: PoolStats,
}

impl ItemPool {
    /// Empty pool with the config's default policy
    pub fn from_config(config: &PoolConfig) -> Self {
        Self {
            available: Vec::new(),
            active: HashSet::new(),
            max_size: config.default_max_pool_size,
            prewarm_count: config.default_prewarm_count,
            strict_limit: config.default_strict_limit,
            auto_grow: config.default_auto_grow,
            stats: PoolStats::default(),
        }
    }

    /// Free instances, most recently returned last
    pub fn available(&self) -> &[Item] {
        &self.available
    }

    /// Number of free instances
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Number of checked-out instances
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Free plus checked out
    pub fn total_count(&self) -> usize {
        self.available.len() + self.active.len()
    }

    /// Whether this instance is currently checked out from this pool
    pub fn is_active(&self, id: InstanceId) -> bool {
        self.active.contains(&id)
    }

    /// Free-list capacity
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Instances created when the pool is first used
    pub fn prewarm_count(&self) -> usize {
        self.prewarm_count
    }

    /// Refuse to allocate on a miss
    pub fn strict_limit(&self) -> bool {
        self.strict_limit
    }

    /// Raise capacity instead of overflowing on return
    pub fn auto_grow(&self) -> bool {
        self.auto_grow
    }

    /// Reuse counters
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// One line for the stats summary
    pub(crate) fn summary_line(&self, class: &str) -> String {
        format!(
            concat!(
                "  [{}] Available: {} | Active: {} | Hit: {} | Miss: {} | ",
                "Rate: {:.1}% | Return: {} | Overflow: {}\n"
            ),
            class,
            self.available.len(),
            self.active.len(),
            self.stats.hits,
            self.stats.misses,
            self.stats.hit_rate(),
            self.stats.returns,
            self.stats.overflows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let mut stats = PoolStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.hits = 3;
        stats.misses = 1;
        assert_eq!(stats.hit_rate(), 75.0);

        stats.reset();
        assert_eq!(stats, PoolStats::default());
    }

    #[test]
    fn test_policy_from_config() {
        let config = PoolConfig::default()
            .with_max_pool_size(8)
            .with_strict_limit(true)
            .with_auto_grow(false);
        let pool = ItemPool::from_config(&config);
        assert_eq!(pool.max_size(), 8);
        assert_eq!(pool.prewarm_count(), 10);
        assert!(pool.strict_limit());
        assert!(!pool.auto_grow());
        assert_eq!(pool.total_count(), 0);
    }

    #[test]
    fn test_summary_line() {
        let mut pool = ItemPool::from_config(&PoolConfig::default());
        pool.stats.hits = 1;
        pool.stats.misses = 1;
        assert_eq!(
            pool.summary_line("Arrow"),
            concat!(
                "  [Arrow] Available: 0 | Active: 0 | Hit: 1 | Miss: 1 | ",
                "Rate: 50.0% | Return: 0 | Overflow: 0\n"
            )
        );
    }
}
