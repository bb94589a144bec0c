use crate::consensus::storage::StagingArea;
use consensus_core::Hash;

/// Records `block` as a DAG child of each of its parents
pub fn stage_block_relations(staging: &mut StagingArea, block: Hash, parents: &[Hash]) {
    for parent in parents {
        staging.add_child(*parent, block);
    }
}

/// Tips after `block` joins the DAG: its parents stop being tips, it becomes one
pub fn tips_after_adding(tips: &[Hash], block: Hash, parents: &[Hash]) -> Vec<Hash> {
    let mut updated: Vec<Hash> = tips.iter().filter(|tip| !parents.contains(tip)).copied().collect();
    updated.push(block);
    updated
}
