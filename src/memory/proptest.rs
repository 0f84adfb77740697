//! Property-based tests for the memory facade using proptest.
//!
//! These tests check the structural invariants that must survive any mix of
//! inserts, recalls and evictions:
//!
//! - The node table, relationship graph and index mapping agree on which nodes exist
//! - The node table never exceeds capacity under the strict policy
//! - Recall returns at most `top_k` distinct nodes, best first
//! - Invalid input leaves every structure untouched

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use std::collections::HashSet;

    use crate::config::{EvictionConfig, EvictionPolicy, MemoryConfig};
    use crate::error::Error;
    use crate::memory::eviction::EvictionManager;
    use crate::memory::ngm::NeuralGraphMemory;
    use crate::memory::retrieval::RetrievalQuery;
    use crate::memory::types::{MemoryInput, NodeId};

    const DIM: usize = 3;

    fn embedding() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-10.0f32..10.0f32, DIM)
    }

    // One insert: embedding, importance, and an optional back-reference to
    // an earlier insert used as causal parent.
    fn insert_op() -> impl Strategy<Value = (Vec<f32>, f64, Option<usize>)> {
        (embedding(), 0.0f64..=1.0f64, prop::option::of(0usize..64))
    }

    fn populate(
        capacity: usize,
        ops: &[(Vec<f32>, f64, Option<usize>)],
    ) -> (NeuralGraphMemory, Vec<NodeId>) {
        let config = MemoryConfig::compact(DIM).with_capacity(capacity);
        let mut memory = NeuralGraphMemory::new(config).unwrap();
        let mut ids: Vec<NodeId> = Vec::new();
        for (i, (embedding, importance, parent)) in ops.iter().enumerate() {
            let mut input = MemoryInput::new(format!("m{}", i), embedding.clone())
                .with_importance(*importance);
            if let Some(p) = parent {
                if let Some(id) = ids.get(*p) {
                    input = input.with_parent(id.clone());
                }
            }
            ids.push(memory.insert(input).unwrap());
        }
        (memory, ids)
    }

    // =========================================================================
    // Structural Consistency
    // =========================================================================

    proptest! {
        /// Table, graph and index mapping track the same live set.
        #[test]
        fn structures_stay_aligned(
            capacity in 1usize..20,
            ops in prop::collection::vec(insert_op(), 1..40)
        ) {
            let (memory, ids) = populate(capacity, &ops);

            prop_assert_eq!(memory.len(), memory.graph().node_count());
            prop_assert_eq!(memory.live_positions(), memory.len());
            prop_assert_eq!(memory.index().len(), ids.len());

            let live: HashSet<&NodeId> = ids.iter().filter(|id| memory.contains(id)).collect();
            prop_assert_eq!(live.len(), memory.len());
            for edge in memory.graph().edges() {
                prop_assert!(memory.contains(&edge.source), "dangling source {}", edge.source);
                prop_assert!(memory.contains(&edge.target), "dangling target {}", edge.target);
            }
        }

        /// Strict eviction keeps the table within capacity after every insert.
        #[test]
        fn strict_policy_respects_capacity(
            capacity in 1usize..15,
            ops in prop::collection::vec(insert_op(), 1..40)
        ) {
            let config = MemoryConfig::compact(DIM).with_capacity(capacity);
            let mut memory = NeuralGraphMemory::new(config).unwrap();
            for (i, (embedding, importance, _)) in ops.iter().enumerate() {
                memory
                    .insert(MemoryInput::new(format!("m{}", i), embedding.clone()).with_importance(*importance))
                    .unwrap();
                prop_assert!(memory.len() <= capacity);
            }
        }

        /// Ids are unique and chronological order matches insertion order.
        #[test]
        fn ids_are_unique_and_ordered(ops in prop::collection::vec(insert_op(), 1..30)) {
            let (memory, ids) = populate(1000, &ops);
            let distinct: HashSet<&NodeId> = ids.iter().collect();
            prop_assert_eq!(distinct.len(), ids.len());

            let window: Vec<NodeId> = memory
                .context_window(&ids[0], 2 * ids.len())
                .into_iter()
                .map(|n| n.id)
                .collect();
            prop_assert_eq!(window, ids);
        }
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    proptest! {
        /// Recall returns at most top_k distinct live nodes in descending score.
        #[test]
        fn retrieve_is_bounded_and_sorted(
            ops in prop::collection::vec(insert_op(), 0..30),
            query in embedding(),
            top_k in 0usize..10,
            include_neighbors in any::<bool>()
        ) {
            let (mut memory, _) = populate(20, &ops);
            let results = memory
                .retrieve(
                    &RetrievalQuery::new(query)
                        .top_k(top_k)
                        .include_neighbors(include_neighbors),
                )
                .unwrap();

            prop_assert!(results.len() <= top_k);
            let distinct: HashSet<&NodeId> = results.iter().map(|r| &r.node.id).collect();
            prop_assert_eq!(distinct.len(), results.len());
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            for result in &results {
                prop_assert!(memory.contains(&result.node.id));
                prop_assert!(result.node.access_count >= 1);
            }
        }

        /// The importance floor holds for primary and neighbour results alike.
        #[test]
        fn retrieve_honours_min_importance(
            ops in prop::collection::vec(insert_op(), 1..30),
            query in embedding(),
            floor in 0.0f64..=1.0f64
        ) {
            let (mut memory, _) = populate(50, &ops);
            let results = memory
                .retrieve(&RetrievalQuery::new(query).top_k(10).min_importance(floor))
                .unwrap();
            prop_assert!(results.iter().all(|r| r.node.importance >= floor));
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn out_of_unit_range() -> impl Strategy<Value = f64> {
        prop_oneof![
            -10.0f64..-1e-6,
            1.000001f64..10.0,
        ]
    }

    proptest! {
        /// Importance outside [0, 1] is rejected and nothing is committed.
        #[test]
        fn invalid_importance_rejected(
            ops in prop::collection::vec(insert_op(), 0..10),
            importance in out_of_unit_range()
        ) {
            let (mut memory, _) = populate(100, &ops);
            let before = memory.statistics();
            let index_len = memory.index().len();

            let err = memory
                .insert(MemoryInput::new("bad", vec![0.0; DIM]).with_importance(importance))
                .unwrap_err();
            let is_validation_error = matches!(err, Error::Validation { .. });
            prop_assert!(is_validation_error);
            prop_assert_eq!(memory.statistics(), before);
            prop_assert_eq!(memory.index().len(), index_len);
        }

        /// Embeddings of the wrong length are rejected with the dimensions.
        #[test]
        fn wrong_dimension_rejected(len in (0usize..8).prop_filter("not DIM", |l| *l != DIM)) {
            let mut memory = NeuralGraphMemory::new(MemoryConfig::compact(DIM)).unwrap();
            let err = memory.insert(MemoryInput::new("bad", vec![0.5; len])).unwrap_err();
            let is_dimension_error = matches!(err, Error::Dimension { expected: DIM, actual } if actual == len);
            prop_assert!(is_dimension_error);
            prop_assert!(memory.is_empty());
        }
    }

    // =========================================================================
    // Eviction Arithmetic
    // =========================================================================

    proptest! {
        /// Strict eviction always brings the population to capacity or below.
        #[test]
        fn strict_count_reaches_capacity(
            capacity in 1usize..10_000,
            excess in 1usize..5_000,
            fraction in 0.0f64..=1.0f64
        ) {
            let manager = EvictionManager::new(
                0.95,
                EvictionConfig { fraction, policy: EvictionPolicy::Strict, ..EvictionConfig::default() },
            );
            let population = capacity + excess;
            let count = manager.eviction_count(population, capacity);
            prop_assert!(count <= population);
            prop_assert!(population - count <= capacity);
        }

        /// Nothing is evicted at or under capacity, whatever the policy.
        #[test]
        fn no_eviction_within_capacity(
            capacity in 0usize..10_000,
            slack in 0usize..10_000,
            proportional in any::<bool>()
        ) {
            let policy = if proportional { EvictionPolicy::Proportional } else { EvictionPolicy::Strict };
            let manager = EvictionManager::new(
                0.95,
                EvictionConfig { policy, ..EvictionConfig::default() },
            );
            let population = capacity.saturating_sub(slack);
            prop_assert_eq!(manager.eviction_count(population, capacity), 0);
        }
    }
}
