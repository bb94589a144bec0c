use crate::header::Header;
use crate::Hash;
use crypto_hashes::hashers::BlockHash;
use crypto_hashes::{HasherBase, HasherExtensions};

/// Hashes every header field except the cached hash itself
pub fn hash(header: &Header) -> Hash {
    let mut hasher = BlockHash::new();
    hasher.write_u16(header.version).write_len(header.parents.len());
    for parent in header.parents.iter() {
        hasher.update(parent);
    }
    hasher
        .update(header.hash_merkle_root)
        .update(header.accepted_id_merkle_root)
        .update(header.utxo_commitment)
        .write_u64(header.timestamp)
        .write_u32(header.bits)
        .write_u64(header.nonce)
        .write_u64(header.blue_score)
        .update(header.blue_work.to_le_bytes());
    hasher.finalize()
}
