use serde::{Deserialize, Serialize};

use crate::{BlockHashMap, BlueWorkType, Hash, KType, ZERO_HASH};

/// Represents GhostDAG data for a block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostdagData {
    /// Number of blue blocks in the block's past
    pub blue_score: u64,
    /// Accumulated work of the blue blocks in the block's past
    pub blue_work: BlueWorkType,
    /// Parent with the highest blue work (ties: smaller hash)
    pub selected_parent: Hash,
    /// Blue blocks of the mergeset; the selected parent is always first
    pub mergeset_blues: Vec<Hash>,
    pub mergeset_reds: Vec<Hash>,
    /// Blue anticone size of every mergeset blue, as seen from this block
    pub blues_anticone_sizes: BlockHashMap<KType>,
    /// Length of the longest parent path back to genesis
    pub height: u64,
}

/// The small, frequently read part of [`GhostdagData`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactGhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
    pub selected_parent: Hash,
}

impl From<&GhostdagData> for CompactGhostdagData {
    fn from(data: &GhostdagData) -> Self {
        Self { blue_score: data.blue_score, blue_work: data.blue_work, selected_parent: data.selected_parent }
    }
}

impl GhostdagData {
    /// Data of the DAG genesis: empty blue set, zero score and work, no selected parent
    pub fn genesis() -> Self {
        Self {
            blue_score: 0,
            blue_work: BlueWorkType::ZERO,
            selected_parent: ZERO_HASH,
            mergeset_blues: Vec::new(),
            mergeset_reds: Vec::new(),
            blues_anticone_sizes: BlockHashMap::new(),
            height: 0,
        }
    }

    pub fn new_with_selected_parent(selected_parent: Hash, k: KType) -> Self {
        let mut mergeset_blues: Vec<Hash> = Vec::with_capacity((k + 1) as usize);
        let mut blues_anticone_sizes: BlockHashMap<KType> = BlockHashMap::with_capacity(k as usize);
        mergeset_blues.push(selected_parent);
        blues_anticone_sizes.insert(selected_parent, 0);

        Self {
            blue_score: Default::default(),
            blue_work: Default::default(),
            selected_parent,
            mergeset_blues,
            mergeset_reds: Default::default(),
            blues_anticone_sizes,
            height: 0,
        }
    }

    pub fn add_blue(&mut self, block: Hash, blue_anticone_size: KType, block_blues_anticone_sizes: &BlockHashMap<KType>) {
        self.mergeset_blues.push(block);
        self.blues_anticone_sizes.insert(block, blue_anticone_size);
        // Adding `block` to the blue set increments the anticone size of every blue in its anticone
        for (blue, size) in block_blues_anticone_sizes {
            self.blues_anticone_sizes.insert(*blue, size + 1);
        }
    }

    pub fn add_red(&mut self, block: Hash) {
        self.mergeset_reds.push(block);
    }

    pub fn finalize_score_and_work(&mut self, blue_score: u64, blue_work: BlueWorkType) {
        self.blue_score = blue_score;
        self.blue_work = blue_work;
    }

    pub fn mergeset_size(&self) -> usize {
        self.mergeset_blues.len() + self.mergeset_reds.len()
    }

    /// Mergeset blocks in no particular order, selected parent included
    pub fn unordered_mergeset(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().chain(self.mergeset_reds.iter()).copied()
    }

    pub fn unordered_mergeset_without_selected_parent(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().skip(1).chain(self.mergeset_reds.iter()).copied()
    }

    pub fn to_compact(&self) -> CompactGhostdagData {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_parent_is_first_blue() {
        let sp = Hash::from_u64_word(1);
        let mut data = GhostdagData::new_with_selected_parent(sp, 18);
        let other = Hash::from_u64_word(2);
        let mut anticone = BlockHashMap::new();
        anticone.insert(sp, 0);
        data.add_blue(other, 1, &anticone);
        data.add_red(Hash::from_u64_word(3));
        assert_eq!(data.mergeset_blues[0], sp);
        assert_eq!(data.blues_anticone_sizes[&sp], 1);
        assert_eq!(data.mergeset_size(), 3);
        let without_sp: Vec<_> = data.unordered_mergeset_without_selected_parent().collect();
        assert_eq!(without_sp, vec![other, Hash::from_u64_word(3)]);
    }

    #[test]
    fn genesis_is_empty() {
        let g = GhostdagData::genesis();
        assert_eq!(g.blue_score, 0);
        assert_eq!(g.mergeset_size(), 0);
        assert_eq!(g.selected_parent, ZERO_HASH);
    }
}
