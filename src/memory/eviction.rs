//! Capacity enforcement by importance-weighted eviction.

use crate::config::{EvictionConfig, EvictionPolicy};
use crate::memory::store::MemoryStore;
use crate::memory::types::{MemoryNode, NodeId};
use chrono::{DateTime, Utc};

/// Scores nodes for retention and picks the ones to drop.
#[derive(Debug, Clone)]
pub struct EvictionManager {
    decay_rate: f64,
    config: EvictionConfig,
}

impl EvictionManager {
    pub fn new(decay_rate: f64, config: EvictionConfig) -> Self {
        Self { decay_rate, config }
    }

    /// Retention score: decayed importance plus a capped access boost.
    pub fn score(&self, node: &MemoryNode, now: DateTime<Utc>) -> f64 {
        let age_days = node.age_days(now).min(i32::MAX as i64) as i32;
        let decayed = node.importance * self.decay_rate.powi(age_days);
        let boost = (node.access_count as f64 * self.config.access_boost_per_hit)
            .min(self.config.max_access_boost);
        decayed + boost
    }

    /// How many nodes a pass over `population` nodes removes.
    pub fn eviction_count(&self, population: usize, capacity: usize) -> usize {
        if population <= capacity {
            return 0;
        }
        let proportional = (population as f64 * self.config.fraction).floor() as usize;
        match self.config.policy {
            EvictionPolicy::Proportional => proportional,
            EvictionPolicy::Strict => proportional.max(population - capacity),
        }
    }

    /// Lowest-scoring nodes to remove so the store respects `capacity`.
    ///
    /// Empty when the store is within capacity. Ties go to the older node.
    pub fn select_victims(
        &self,
        store: &MemoryStore,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> Vec<NodeId> {
        let count = self.eviction_count(store.len(), capacity);
        if count == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &MemoryNode)> =
            store.iter().map(|n| (self.score(n, now), n)).collect();
        scored.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.chrono_key().cmp(&b.1.chrono_key()))
        });

        scored
            .into_iter()
            .take(count)
            .map(|(_, node)| node.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemoryInput;
    use chrono::Duration;

    fn manager(decay_rate: f64, policy: EvictionPolicy) -> EvictionManager {
        EvictionManager::new(
            decay_rate,
            EvictionConfig {
                policy,
                ..EvictionConfig::default()
            },
        )
    }

    fn node(importance: f64, access_count: u64, created_at: DateTime<Utc>) -> MemoryNode {
        let input = MemoryInput::new("n", vec![0.0]).with_importance(importance);
        let mut node = MemoryNode::new(NodeId::generate(created_at, 0), 0, created_at, input).unwrap();
        node.access_count = access_count;
        node
    }

    #[test]
    fn test_score_decays_with_age() {
        let now = Utc::now();
        let mgr = manager(0.5, EvictionPolicy::Strict);

        assert!((mgr.score(&node(0.8, 0, now), now) - 0.8).abs() < 1e-12);
        let old = node(0.8, 0, now - Duration::days(2));
        assert!((mgr.score(&old, now) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_access_boost_capped() {
        let now = Utc::now();
        let mgr = manager(1.0, EvictionPolicy::Strict);

        assert!((mgr.score(&node(0.0, 3, now), now) - 0.3).abs() < 1e-12);
        assert!((mgr.score(&node(0.0, 40, now), now) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_eviction_count_policies() {
        let strict = manager(1.0, EvictionPolicy::Strict);
        let proportional = manager(1.0, EvictionPolicy::Proportional);

        assert_eq!(strict.eviction_count(10, 10), 0);
        assert_eq!(strict.eviction_count(11, 10), 1);
        assert_eq!(proportional.eviction_count(11, 10), 1);

        // floor(6 * 0.1) = 0 leaves the overflow in place
        assert_eq!(proportional.eviction_count(6, 5), 0);
        assert_eq!(strict.eviction_count(6, 5), 1);

        assert_eq!(strict.eviction_count(250, 200), 50);
        assert_eq!(proportional.eviction_count(250, 200), 25);
    }

    #[test]
    fn test_select_victims_lowest_first() {
        let mut store = MemoryStore::new(1);
        let now = Utc::now();
        let mut ids = Vec::new();
        for i in 0..11 {
            let input = MemoryInput::new(i.to_string(), vec![0.0]).with_importance(i as f64 / 10.0);
            ids.push(store.create(input, now).unwrap());
        }

        let mgr = manager(1.0, EvictionPolicy::Strict);
        assert_eq!(mgr.select_victims(&store, 10, now), vec![ids[0].clone()]);
        assert!(mgr.select_victims(&store, 11, now).is_empty());
    }

    #[test]
    fn test_ties_evict_oldest() {
        let mut store = MemoryStore::new(1);
        let now = Utc::now();
        let first = store.create(MemoryInput::new("a", vec![0.0]), now).unwrap();
        store.create(MemoryInput::new("b", vec![0.0]), now).unwrap();

        let mgr = manager(1.0, EvictionPolicy::Strict);
        assert_eq!(mgr.select_victims(&store, 1, now), vec![first]);
    }
}
