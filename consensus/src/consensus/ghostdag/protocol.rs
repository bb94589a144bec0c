use crate::consensus::dag::reachability::is_dag_ancestor_of;
use crate::consensus::storage::DagStoreReader;
use consensus_core::errors::{ConsensusError, ConsensusResult, RuleError};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::{BlockHashMap, BlockHashSet, BlueWorkType, Hash, KType, ZERO_HASH};
use jio_math::difficulty::calc_work;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

enum ColoringState {
    Blue,
    Red,
    Pending,
}

enum ColoringOutput {
    Blue(KType, BlockHashMap<KType>),
    Red,
}

/// Sort key of the mergeset order: ascending blue work, ties broken by hash
#[derive(Clone, Copy, PartialEq, Eq)]
struct SortableBlock {
    hash: Hash,
    blue_work: BlueWorkType,
}

impl Ord for SortableBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.blue_work.cmp(&other.blue_work).then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for SortableBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Mergeset size counts the selected parent
fn check_mergeset_size(without_selected_parent: usize, limit: Option<u64>) -> ConsensusResult<()> {
    match limit {
        Some(limit) if without_selected_parent as u64 + 1 > limit => {
            Err(RuleError::MergeSetTooBig(without_selected_parent as u64 + 1, limit).into())
        }
        _ => Ok(()),
    }
}

/// The GHOSTDAG k-cluster colouring rule.
///
/// Stateless apart from its parameters; every query goes through the store it
/// is handed, so the same protocol serves committed state and staging areas.
#[derive(Debug, Clone, Copy)]
pub struct GhostdagProtocol {
    k: KType,
    mergeset_size_limit: u64,
}

impl GhostdagProtocol {
    pub fn new(k: KType, mergeset_size_limit: u64) -> Self {
        Self { k, mergeset_size_limit }
    }

    pub fn k(&self) -> KType {
        self.k
    }

    fn ghostdag_data<S: DagStoreReader + ?Sized>(store: &S, hash: Hash) -> ConsensusResult<Arc<GhostdagData>> {
        store.get_ghostdag_data(&hash).ok_or(ConsensusError::UnknownBlock(hash))
    }

    fn sortable<S: DagStoreReader + ?Sized>(store: &S, hash: Hash) -> ConsensusResult<SortableBlock> {
        Ok(SortableBlock { hash, blue_work: Self::ghostdag_data(store, hash)?.blue_work })
    }

    /// The parent with the highest blue work; equal work goes to the smaller hash
    pub fn find_selected_parent<S: DagStoreReader + ?Sized>(&self, store: &S, parents: &[Hash]) -> ConsensusResult<Hash> {
        let mut selected: Option<SortableBlock> = None;
        for parent in parents {
            let candidate = Self::sortable(store, *parent)?;
            selected = match selected {
                Some(current) if current.blue_work > candidate.blue_work => Some(current),
                Some(current) if current.blue_work == candidate.blue_work && current.hash < candidate.hash => Some(current),
                _ => Some(candidate),
            };
        }
        selected.map(|block| block.hash).ok_or(ConsensusError::Rule(RuleError::NoParents))
    }

    /// Sorts ascending by (blue work, hash)
    pub fn sort_blocks<S: DagStoreReader + ?Sized>(&self, store: &S, blocks: Vec<Hash>) -> ConsensusResult<Vec<Hash>> {
        let mut sortable = blocks.into_iter().map(|hash| Self::sortable(store, hash)).collect::<ConsensusResult<Vec<_>>>()?;
        sortable.sort();
        Ok(sortable.into_iter().map(|block| block.hash).collect())
    }

    /// GHOSTDAG data of a block with `parents`, enforcing the mergeset size limit
    pub fn ghostdag<S: DagStoreReader + ?Sized>(&self, store: &S, parents: &[Hash]) -> ConsensusResult<GhostdagData> {
        self.run(store, parents, Some(self.mergeset_size_limit))
    }

    /// Same as [`Self::ghostdag`] without the mergeset limit. Used for the virtual block,
    /// whose parents are whatever the tips happen to be.
    pub fn ghostdag_unbounded<S: DagStoreReader + ?Sized>(&self, store: &S, parents: &[Hash]) -> ConsensusResult<GhostdagData> {
        self.run(store, parents, None)
    }

    fn run<S: DagStoreReader + ?Sized>(&self, store: &S, parents: &[Hash], limit: Option<u64>) -> ConsensusResult<GhostdagData> {
        let selected_parent = self.find_selected_parent(store, parents)?;
        let mergeset = self.mergeset_without_selected_parent(store, selected_parent, parents, limit)?;
        let ordered = self.sort_blocks(store, mergeset)?;

        let mut new_block_data = GhostdagData::new_with_selected_parent(selected_parent, self.k);
        for candidate in ordered {
            match self.check_blue_candidate(store, &new_block_data, candidate)? {
                ColoringOutput::Blue(anticone_size, blues_anticone_sizes) => {
                    new_block_data.add_blue(candidate, anticone_size, &blues_anticone_sizes)
                }
                ColoringOutput::Red => new_block_data.add_red(candidate),
            }
        }

        let selected_parent_data = Self::ghostdag_data(store, selected_parent)?;
        let blue_score = selected_parent_data.blue_score + new_block_data.mergeset_blues.len() as u64;
        let mut added_blue_work = BlueWorkType::ZERO;
        for blue in new_block_data.mergeset_blues.iter() {
            let header = store.get_header(blue).ok_or(ConsensusError::UnknownBlock(*blue))?;
            added_blue_work += calc_work(header.bits);
        }
        new_block_data.finalize_score_and_work(blue_score, selected_parent_data.blue_work + added_blue_work);

        let mut height = 0;
        for parent in parents {
            height = height.max(Self::ghostdag_data(store, *parent)?.height);
        }
        new_block_data.height = height + 1;
        Ok(new_block_data)
    }

    /// Blocks in the past of `parents` that are neither `selected_parent` nor in its past
    fn mergeset_without_selected_parent<S: DagStoreReader + ?Sized>(
        &self,
        store: &S,
        selected_parent: Hash,
        parents: &[Hash],
        limit: Option<u64>,
    ) -> ConsensusResult<Vec<Hash>> {
        let mut queue: VecDeque<Hash> = VecDeque::new();
        let mut mergeset = BlockHashSet::new();
        let mut selected_parent_past = BlockHashSet::new();

        for parent in parents.iter().copied().filter(|parent| *parent != selected_parent) {
            if is_dag_ancestor_of(store, parent, selected_parent)? {
                selected_parent_past.insert(parent);
                continue;
            }
            if mergeset.insert(parent) {
                queue.push_back(parent);
            }
        }

        while let Some(current) = queue.pop_front() {
            let header = store.get_header(&current).ok_or(ConsensusError::UnknownBlock(current))?;
            for parent in header.direct_parents().iter().copied() {
                if mergeset.contains(&parent) || selected_parent_past.contains(&parent) || parent == selected_parent {
                    continue;
                }
                if is_dag_ancestor_of(store, parent, selected_parent)? {
                    selected_parent_past.insert(parent);
                    continue;
                }
                mergeset.insert(parent);
                queue.push_back(parent);
            }
            check_mergeset_size(mergeset.len(), limit)?;
        }
        check_mergeset_size(mergeset.len(), limit)?;
        Ok(mergeset.into_iter().collect())
    }

    fn check_blue_candidate<S: DagStoreReader + ?Sized>(
        &self,
        store: &S,
        new_block_data: &GhostdagData,
        candidate: Hash,
    ) -> ConsensusResult<ColoringOutput> {
        // a full blue set leaves no room for another blue
        if new_block_data.mergeset_blues.len() as u64 == self.k as u64 + 1 {
            return Ok(ColoringOutput::Red);
        }

        let mut candidate_blues_anticone_sizes: BlockHashMap<KType> = BlockHashMap::with_capacity(self.k as usize);
        let mut candidate_blue_anticone_size: KType = 0;

        // the new block's own mergeset blues come first, then each chain block's
        let mut chain_block: Option<Hash> = None;
        let mut chain_data: Option<Arc<GhostdagData>> = None;
        loop {
            let state = self.check_blue_candidate_with_chain_block(
                store,
                new_block_data,
                chain_block,
                chain_data.as_deref().unwrap_or(new_block_data),
                candidate,
                &mut candidate_blues_anticone_sizes,
                &mut candidate_blue_anticone_size,
            )?;
            match state {
                ColoringState::Blue => return Ok(ColoringOutput::Blue(candidate_blue_anticone_size, candidate_blues_anticone_sizes)),
                ColoringState::Red => return Ok(ColoringOutput::Red),
                ColoringState::Pending => {}
            }
            let next = chain_data.as_deref().unwrap_or(new_block_data).selected_parent;
            if next == ZERO_HASH {
                // walked past genesis, which is in the past of every candidate
                return Ok(ColoringOutput::Blue(candidate_blue_anticone_size, candidate_blues_anticone_sizes));
            }
            chain_data = Some(Self::ghostdag_data(store, next)?);
            chain_block = Some(next);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_blue_candidate_with_chain_block<S: DagStoreReader + ?Sized>(
        &self,
        store: &S,
        new_block_data: &GhostdagData,
        chain_block: Option<Hash>,
        chain_data: &GhostdagData,
        candidate: Hash,
        candidate_blues_anticone_sizes: &mut BlockHashMap<KType>,
        candidate_blue_anticone_size: &mut KType,
    ) -> ConsensusResult<ColoringState> {
        // blues of chain blocks in the candidate's past cannot be in its anticone
        if let Some(hash) = chain_block {
            if is_dag_ancestor_of(store, hash, candidate)? {
                return Ok(ColoringState::Blue);
            }
        }

        for block in chain_data.mergeset_blues.iter().copied() {
            if is_dag_ancestor_of(store, block, candidate)? {
                continue;
            }
            let block_anticone_size = self.blue_anticone_size(store, block, new_block_data)?;
            candidate_blues_anticone_sizes.insert(block, block_anticone_size);
            *candidate_blue_anticone_size += 1;
            if *candidate_blue_anticone_size > self.k {
                return Ok(ColoringState::Red);
            }
            if block_anticone_size == self.k {
                // the candidate would push this blue over k
                return Ok(ColoringState::Red);
            }
        }
        Ok(ColoringState::Pending)
    }

    /// Blue anticone size of `block` from the point of view of `context`, looked up
    /// along the context's selected chain
    fn blue_anticone_size<S: DagStoreReader + ?Sized>(&self, store: &S, block: Hash, context: &GhostdagData) -> ConsensusResult<KType> {
        if let Some(size) = context.blues_anticone_sizes.get(&block) {
            return Ok(*size);
        }
        let mut current = context.selected_parent;
        while current != ZERO_HASH {
            let data = Self::ghostdag_data(store, current)?;
            if let Some(size) = data.blues_anticone_sizes.get(&block) {
                return Ok(*size);
            }
            current = data.selected_parent;
        }
        Err(ConsensusError::UnknownBlock(block))
    }

    /// The consensus order of a mergeset: selected parent, then the rest ascending by (blue work, hash)
    pub fn consensus_ordered_mergeset<S: DagStoreReader + ?Sized>(&self, store: &S, data: &GhostdagData) -> ConsensusResult<Vec<Hash>> {
        if data.selected_parent == ZERO_HASH {
            return Ok(Vec::new());
        }
        let rest = self.sort_blocks(store, data.unordered_mergeset_without_selected_parent().collect())?;
        let mut ordered = Vec::with_capacity(rest.len() + 1);
        ordered.push(data.selected_parent);
        ordered.extend(rest);
        Ok(ordered)
    }
}
