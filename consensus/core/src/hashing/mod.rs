use crate::tx::{ScriptPublicKey, TransactionOutpoint};
use crypto_hashes::{HasherBase, HasherExtensions};

pub mod header;
pub mod sighash;
pub mod sighash_type;
pub mod tx;

pub(crate) fn hash_outpoint(hasher: &mut impl HasherBase, outpoint: &TransactionOutpoint) {
    hasher.update(outpoint.transaction_id).write_u32(outpoint.index);
}

pub(crate) fn hash_script_public_key(hasher: &mut impl HasherBase, script_public_key: &ScriptPublicKey) {
    hasher.write_u16(script_public_key.version()).write_var_bytes(script_public_key.script());
}
