use crate::hashers::{HasherBase, MerkleBranchHash};
use crate::{Hash, ZERO_HASH};

/// Computes the merkle root of the given leaves.
///
/// Odd levels are padded with [`ZERO_HASH`] rather than by duplicating the last node,
/// so a list and the same list with its last element repeated never share a root.
pub fn calc_merkle_root(hashes: impl ExactSizeIterator<Item = Hash>) -> Hash {
    if hashes.len() == 0 {
        return ZERO_HASH;
    }
    let next_pot = hashes.len().next_power_of_two();
    let vec_len = 2 * next_pot - 1;
    let mut merkles = vec![None; vec_len];
    for (i, hash) in hashes.enumerate() {
        merkles[i] = Some(hash);
    }
    let mut offset = next_pot;
    for i in (0..vec_len - 1).step_by(2) {
        if merkles[i].is_none() {
            merkles[offset] = None;
        } else {
            merkles[offset] = Some(merkle_hash(merkles[i].unwrap_or(ZERO_HASH), merkles[i + 1].unwrap_or(ZERO_HASH)));
        }
        offset += 1
    }
    merkles.last().copied().flatten().unwrap_or(ZERO_HASH)
}

fn merkle_hash(left: Hash, right: Hash) -> Hash {
    let mut hasher = MerkleBranchHash::new();
    hasher.update(left).update(right);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single() {
        assert_eq!(calc_merkle_root(Vec::<Hash>::new().into_iter()), ZERO_HASH);
        let leaf = Hash::from_u64_word(7);
        // a single leaf is its own root
        assert_eq!(calc_merkle_root(vec![leaf].into_iter()), leaf);
    }

    #[test]
    fn two_leaves() {
        let (a, b) = (Hash::from_u64_word(1), Hash::from_u64_word(2));
        assert_eq!(calc_merkle_root(vec![a, b].into_iter()), merkle_hash(a, b));
    }

    #[test]
    fn odd_count_pads_with_zero() {
        let leaves = vec![Hash::from_u64_word(1), Hash::from_u64_word(2), Hash::from_u64_word(3)];
        let expected = merkle_hash(merkle_hash(leaves[0], leaves[1]), merkle_hash(leaves[2], ZERO_HASH));
        assert_eq!(calc_merkle_root(leaves.clone().into_iter()), expected);

        let mut repeated = leaves.clone();
        repeated.push(leaves[2]);
        assert_ne!(calc_merkle_root(repeated.into_iter()), expected);
    }

    #[test]
    fn order_matters() {
        let (a, b) = (Hash::from_u64_word(1), Hash::from_u64_word(2));
        assert_ne!(calc_merkle_root(vec![a, b].into_iter()), calc_merkle_root(vec![b, a].into_iter()));
    }
}
