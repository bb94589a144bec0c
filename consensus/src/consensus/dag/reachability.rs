//! Interval-labelled reachability over the selected-parent tree.
//!
//! Every block owns a half-open interval nested inside its tree parent's; the
//! last label of each interval is reserved for the block itself, so children are
//! allocated from `[start, end - 1)`. Tree ancestry is interval containment.
//! DAG ancestry that does not follow the tree is answered through the future
//! covering set: when a block is added, it is recorded in the covering set of
//! every block in its mergeset other than the selected parent.

use crate::consensus::storage::{ReachabilityStore, ReachabilityStoreReader};
use consensus_core::errors::{ReachabilityError, ReachabilityResult};
use consensus_core::reachability::{Interval, ReachabilityData};
use consensus_core::{BlockHashMap, Hash, ZERO_HASH};
use std::collections::VecDeque;
use tracing::trace;

/// Makes `genesis` the root of the tree, owning the whole label space
pub fn init<S: ReachabilityStore + ?Sized>(store: &mut S, genesis: Hash) -> ReachabilityResult<()> {
    init_with_interval(store, genesis, Interval::maximal())
}

/// Like [`init`] with a custom root interval. Small intervals force reindexing early.
pub fn init_with_interval<S: ReachabilityStore + ?Sized>(store: &mut S, genesis: Hash, interval: Interval) -> ReachabilityResult<()> {
    store.insert_reachability(genesis, ReachabilityData::new(ZERO_HASH, interval, 0))
}

/// Registers `new_block` as a tree child of `selected_parent` and adds it to the
/// future covering set of every block in `mergeset_without_selected_parent`
pub fn add_block<S: ReachabilityStore + ?Sized>(
    store: &mut S,
    new_block: Hash,
    selected_parent: Hash,
    mergeset_without_selected_parent: &[Hash],
) -> ReachabilityResult<()> {
    add_tree_block(store, new_block, selected_parent)?;
    for merged in mergeset_without_selected_parent {
        insert_to_future_covering_set(store, *merged, new_block)?;
    }
    Ok(())
}

fn get<S: ReachabilityStoreReader + ?Sized>(store: &S, hash: Hash) -> ReachabilityResult<&ReachabilityData> {
    store.get_reachability(&hash).ok_or(ReachabilityError::MissingBlock(hash))
}

fn get_mut<S: ReachabilityStore + ?Sized>(store: &mut S, hash: Hash) -> ReachabilityResult<&mut ReachabilityData> {
    store.get_reachability_mut(&hash).ok_or(ReachabilityError::MissingBlock(hash))
}

/// Labels of `data` not yet handed to any child
fn remaining_interval(data: &ReachabilityData, store_last_child_end: Option<u64>) -> Interval {
    let start = store_last_child_end.unwrap_or(data.interval.start);
    Interval::new(start, data.interval.end.saturating_sub(1).max(start))
}

fn add_tree_block<S: ReachabilityStore + ?Sized>(store: &mut S, new_block: Hash, parent: Hash) -> ReachabilityResult<()> {
    let parent_data = get(store, parent)?;
    let last_child_end = match parent_data.children.last() {
        Some(child) => Some(get(store, *child)?.interval.end),
        None => None,
    };
    let remaining = remaining_interval(parent_data, last_child_end);
    let height = parent_data.height + 1;

    if remaining.is_empty() {
        store.insert_reachability(new_block, ReachabilityData::new(parent, Interval::empty_at(remaining.start), height))?;
        get_mut(store, parent)?.children.push(new_block);
        reindex(store, parent)
    } else {
        let (allocated, _) = remaining.split_half();
        store.insert_reachability(new_block, ReachabilityData::new(parent, allocated, height))?;
        get_mut(store, parent)?.children.push(new_block);
        Ok(())
    }
}

/// Number of blocks in the tree rooted at `root`, memoizing every subtree on the way
fn subtree_size<S: ReachabilityStoreReader + ?Sized>(store: &S, root: Hash, sizes: &mut BlockHashMap<u64>) -> ReachabilityResult<u64> {
    if let Some(size) = sizes.get(&root) {
        return Ok(*size);
    }
    // iterative post-order: a block is summed once all its children are
    let mut stack = vec![(root, false)];
    while let Some((current, children_done)) = stack.pop() {
        if sizes.contains_key(&current) {
            continue;
        }
        let data = get(store, current)?;
        if children_done {
            let mut size = 1u64;
            for child in data.children.iter() {
                size = size.saturating_add(sizes.get(child).copied().unwrap_or(1));
            }
            sizes.insert(current, size);
        } else {
            stack.push((current, true));
            for child in data.children.iter() {
                if !sizes.contains_key(child) {
                    stack.push((*child, false));
                }
            }
        }
    }
    Ok(sizes.get(&root).copied().unwrap_or(1))
}

/// Climbs from `start` until an ancestor's interval holds twice its subtree
/// (or the root is reached) and redistributes that subtree proportionally
fn reindex<S: ReachabilityStore + ?Sized>(store: &mut S, start: Hash) -> ReachabilityResult<()> {
    let mut sizes = BlockHashMap::new();
    let mut current = start;
    loop {
        let required = subtree_size(store, current, &mut sizes)?;
        let data = get(store, current)?;
        let available = data.interval.size();
        if available >= required.saturating_mul(2) {
            break;
        }
        if data.parent == ZERO_HASH {
            if available < required {
                return Err(ReachabilityError::IntervalOverflow);
            }
            break;
        }
        current = data.parent;
    }
    trace!("reindexing reachability subtree of {} ({} blocks)", current, sizes.get(&current).copied().unwrap_or(1));
    propagate_interval(store, current, &sizes)
}

/// Re-lays the intervals of every descendant of `root` inside `root`'s interval
fn propagate_interval<S: ReachabilityStore + ?Sized>(store: &mut S, root: Hash, sizes: &BlockHashMap<u64>) -> ReachabilityResult<()> {
    let mut queue = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        let data = get(store, current)?;
        if data.children.is_empty() {
            continue;
        }
        let children = data.children.clone();
        let allocation = Interval::new(data.interval.start, data.interval.end - 1);
        let child_sizes: Vec<u64> = children.iter().map(|child| sizes.get(child).copied().unwrap_or(1)).collect();
        for (child, interval) in children.iter().zip(allocation.split_proportional(&child_sizes)) {
            get_mut(store, *child)?.interval = interval;
            queue.push_back(*child);
        }
    }
    Ok(())
}

/// Index of the last covering-set entry whose interval starts at or before `interval`
fn covering_set_position<S: ReachabilityStoreReader + ?Sized>(
    store: &S,
    covering_set: &[Hash],
    interval: Interval,
) -> ReachabilityResult<Option<usize>> {
    let (mut low, mut high) = (0usize, covering_set.len());
    while low < high {
        let mid = low + (high - low) / 2;
        if get(store, covering_set[mid])?.interval.start <= interval.start {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    Ok(low.checked_sub(1))
}

fn insert_to_future_covering_set<S: ReachabilityStore + ?Sized>(store: &mut S, merged: Hash, new_block: Hash) -> ReachabilityResult<()> {
    let new_interval = get(store, new_block)?.interval;
    let covering_set = get(store, merged)?.future_covering_set.clone();
    let position = covering_set_position(store, &covering_set, new_interval)?;
    if let Some(index) = position {
        if get(store, covering_set[index])?.interval.contains(new_interval) {
            return Ok(());
        }
    }
    let insert_at = position.map_or(0, |index| index + 1);
    get_mut(store, merged)?.future_covering_set.insert(insert_at, new_block);
    Ok(())
}

/// `ancestor` is on the selected-parent chain of `descendant` (reflexive)
pub fn is_chain_ancestor_of<S: ReachabilityStoreReader + ?Sized>(store: &S, ancestor: Hash, descendant: Hash) -> ReachabilityResult<bool> {
    let descendant_interval = get(store, descendant)?.interval;
    Ok(get(store, ancestor)?.interval.contains(descendant_interval))
}

/// `ancestor` is in the past of `descendant` or equal to it
pub fn is_dag_ancestor_of<S: ReachabilityStoreReader + ?Sized>(store: &S, ancestor: Hash, descendant: Hash) -> ReachabilityResult<bool> {
    let descendant_interval = get(store, descendant)?.interval;
    let ancestor_data = get(store, ancestor)?;
    if ancestor_data.interval.contains(descendant_interval) {
        return Ok(true);
    }
    let covering_set = &ancestor_data.future_covering_set;
    match covering_set_position(store, covering_set, descendant_interval)? {
        Some(index) => Ok(get(store, covering_set[index])?.interval.contains(descendant_interval)),
        None => Ok(false),
    }
}

/// Any of `ancestors` is in the past of `descendant`
pub fn is_dag_ancestor_of_any<S: ReachabilityStoreReader + ?Sized>(store: &S, ancestors: &[Hash], descendant: Hash) -> ReachabilityResult<bool> {
    for ancestor in ancestors {
        if is_dag_ancestor_of(store, *ancestor, descendant)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(store: &mut BlockHashMap<ReachabilityData>, from: Hash, first: u64, len: u64) -> Hash {
        let mut parent = from;
        for i in first..first + len {
            let hash = Hash::from_u64_word(i);
            add_block(store, hash, parent, &[]).unwrap();
            parent = hash;
        }
        parent
    }

    #[test]
    fn tree_containment() {
        let mut store: BlockHashMap<ReachabilityData> = BlockHashMap::new();
        let genesis = Hash::from_u64_word(1);
        init(&mut store, genesis).unwrap();
        let tip = chain(&mut store, genesis, 2, 5);
        let side = Hash::from_u64_word(100);
        add_block(&mut store, side, Hash::from_u64_word(3), &[]).unwrap();

        assert!(is_chain_ancestor_of(&store, genesis, tip).unwrap());
        assert!(is_chain_ancestor_of(&store, tip, tip).unwrap());
        assert!(is_chain_ancestor_of(&store, Hash::from_u64_word(3), side).unwrap());
        assert!(!is_chain_ancestor_of(&store, Hash::from_u64_word(4), side).unwrap());
        assert!(!is_chain_ancestor_of(&store, side, tip).unwrap());
        assert_eq!(store[&tip].height, 5);
    }

    #[test]
    fn unknown_blocks_are_reported() {
        let mut store: BlockHashMap<ReachabilityData> = BlockHashMap::new();
        let genesis = Hash::from_u64_word(1);
        init(&mut store, genesis).unwrap();
        let unknown = Hash::from_u64_word(42);
        assert_eq!(is_dag_ancestor_of(&store, genesis, unknown), Err(ReachabilityError::MissingBlock(unknown)));
        assert_eq!(add_block(&mut store, Hash::from_u64_word(2), unknown, &[]), Err(ReachabilityError::MissingBlock(unknown)));
        assert_eq!(init(&mut store, genesis), Err(ReachabilityError::BlockExists(genesis)));
    }

    #[test]
    fn covering_set_answers_merged_ancestry() {
        let mut store: BlockHashMap<ReachabilityData> = BlockHashMap::new();
        let genesis = Hash::from_u64_word(1);
        init(&mut store, genesis).unwrap();
        let (a, b, c) = (Hash::from_u64_word(2), Hash::from_u64_word(3), Hash::from_u64_word(4));
        add_block(&mut store, a, genesis, &[]).unwrap();
        add_block(&mut store, b, genesis, &[]).unwrap();
        // c selects a and merges b
        add_block(&mut store, c, a, &[b]).unwrap();

        assert!(is_dag_ancestor_of(&store, b, c).unwrap());
        assert!(!is_chain_ancestor_of(&store, b, c).unwrap());
        assert!(!is_dag_ancestor_of(&store, c, b).unwrap());
        assert!(!is_dag_ancestor_of(&store, a, b).unwrap());
        assert_eq!(store[&b].future_covering_set, vec![c]);

        // a descendant of c is covered by c's entry without being added itself
        let d = Hash::from_u64_word(5);
        add_block(&mut store, d, c, &[]).unwrap();
        assert!(is_dag_ancestor_of(&store, b, d).unwrap());
        assert!(is_dag_ancestor_of_any(&store, &[a, b], d).unwrap());
    }

    #[test]
    fn exhausted_intervals_are_reindexed() {
        let mut store: BlockHashMap<ReachabilityData> = BlockHashMap::new();
        let genesis = Hash::from_u64_word(1);
        init_with_interval(&mut store, genesis, Interval::new(1, 200)).unwrap();
        // a long chain halves the free space at every step and must reindex
        let tip = chain(&mut store, genesis, 2, 60);
        let mut fork_parent = genesis;
        for i in 0..20u64 {
            let hash = Hash::from_u64_word(1000 + i);
            add_block(&mut store, hash, fork_parent, &[]).unwrap();
            fork_parent = if i % 3 == 0 { hash } else { fork_parent };
        }
        for (hash, data) in store.iter() {
            assert!(!data.interval.is_empty(), "{hash} has an empty interval");
            for child in data.children.iter() {
                assert!(data.interval.strictly_contains(store[child].interval));
            }
        }
        assert!(is_chain_ancestor_of(&store, genesis, tip).unwrap());
        assert!(!is_chain_ancestor_of(&store, Hash::from_u64_word(1000), tip).unwrap());
    }

    #[test]
    fn interval_space_can_run_out() {
        let mut store: BlockHashMap<ReachabilityData> = BlockHashMap::new();
        let genesis = Hash::from_u64_word(1);
        init_with_interval(&mut store, genesis, Interval::new(1, 8)).unwrap();
        let mut parent = genesis;
        let mut result = Ok(());
        for i in 2..20u64 {
            let hash = Hash::from_u64_word(i);
            result = add_block(&mut store, hash, parent, &[]);
            if result.is_err() {
                break;
            }
            parent = hash;
        }
        assert_eq!(result, Err(ReachabilityError::IntervalOverflow));
    }
}
