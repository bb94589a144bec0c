use super::reachability::{add_block, init, init_with_interval, is_chain_ancestor_of, is_dag_ancestor_of};
use consensus_core::reachability::{Interval, ReachabilityData};
use consensus_core::{BlockHashMap, BlockHashSet, Hash};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random DAG with brute-force ancestry next to the reachability store built from it
struct RandomDag {
    store: BlockHashMap<ReachabilityData>,
    blocks: Vec<Hash>,
    /// Every block mapped to itself plus its whole past
    closures: BlockHashMap<BlockHashSet>,
    tree_parents: BlockHashMap<Hash>,
}

impl RandomDag {
    fn build(seed: u64, count: u64, root_interval: Option<Interval>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let genesis = Hash::from_le_u64([0, 0, 0, 1]);
        let mut store: BlockHashMap<ReachabilityData> = BlockHashMap::new();
        match root_interval {
            Some(interval) => init_with_interval(&mut store, genesis, interval).unwrap(),
            None => init(&mut store, genesis).unwrap(),
        }
        let mut dag = Self {
            store,
            blocks: vec![genesis],
            closures: BlockHashMap::from([(genesis, BlockHashSet::from([genesis]))]),
            tree_parents: BlockHashMap::new(),
        };

        for i in 1..=count {
            let hash = Hash::from_le_u64([i, 0, 0, 1]);
            // bias parents toward recent blocks so the DAG stays narrow
            let window = dag.blocks.len().min(8);
            let parent_count = rng.gen_range(1..=3usize).min(window);
            let mut parents = Vec::new();
            while parents.len() < parent_count {
                let candidate = dag.blocks[dag.blocks.len() - 1 - rng.gen_range(0..window)];
                if !parents.contains(&candidate) {
                    parents.push(candidate);
                }
            }
            let tree_parent = parents[0];
            let mut closure = BlockHashSet::from([hash]);
            for parent in parents.iter() {
                closure.extend(dag.closures[parent].iter().copied());
            }
            let tree_parent_closure = &dag.closures[&tree_parent];
            let mut mergeset: Vec<Hash> = closure.iter().filter(|b| **b != hash && !tree_parent_closure.contains(*b)).copied().collect();
            mergeset.sort();

            add_block(&mut dag.store, hash, tree_parent, &mergeset).unwrap();
            dag.closures.insert(hash, closure);
            dag.tree_parents.insert(hash, tree_parent);
            dag.blocks.push(hash);
        }
        dag
    }

    fn is_tree_ancestor(&self, ancestor: Hash, descendant: Hash) -> bool {
        let mut current = descendant;
        loop {
            if current == ancestor {
                return true;
            }
            match self.tree_parents.get(&current) {
                Some(parent) => current = *parent,
                None => return false,
            }
        }
    }

    fn check_against_closures(&self) {
        for a in self.blocks.iter() {
            for b in self.blocks.iter() {
                assert_eq!(is_dag_ancestor_of(&self.store, *a, *b).unwrap(), self.closures[b].contains(a), "dag ancestry of {a} -> {b}");
                assert_eq!(is_chain_ancestor_of(&self.store, *a, *b).unwrap(), self.is_tree_ancestor(*a, *b), "chain ancestry of {a} -> {b}");
            }
        }
    }
}

#[test]
fn ancestry_matches_transitive_closure() {
    for seed in 0..4 {
        RandomDag::build(seed, 120, None).check_against_closures();
    }
}

#[test]
fn ancestry_survives_reindexing() {
    // 150 blocks in a 512-label space reindex many times over
    let dag = RandomDag::build(7, 150, Some(Interval::new(1, 512)));
    dag.check_against_closures();
    for data in dag.store.values() {
        assert!(!data.interval.is_empty());
    }
}
