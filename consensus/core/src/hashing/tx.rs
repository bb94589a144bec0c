use super::{hash_outpoint, hash_script_public_key};
use crate::tx::{Transaction, TransactionId, TransactionInput, TransactionOutput};
use crate::Hash;
use crypto_hashes::hashers::{TransactionHash, TransactionID};
use crypto_hashes::{HasherBase, HasherExtensions};

#[derive(Clone, Copy, PartialEq, Eq)]
enum TxEncoding {
    Full,
    ExcludeSignatureScript,
}

/// Hash of the full transaction including signature scripts
pub fn hash(tx: &Transaction) -> Hash {
    let mut hasher = TransactionHash::new();
    write_transaction(&mut hasher, tx, TxEncoding::Full);
    hasher.finalize()
}

/// Transaction id: like [`hash`] but signature scripts are left out, so signing
/// does not change the id being referenced by spenders.
pub fn id(tx: &Transaction) -> TransactionId {
    let mut hasher = TransactionID::new();
    write_transaction(&mut hasher, tx, TxEncoding::ExcludeSignatureScript);
    hasher.finalize()
}

fn write_transaction<T: HasherBase>(hasher: &mut T, tx: &Transaction, encoding: TxEncoding) {
    hasher.write_u16(tx.version).write_len(tx.inputs.len());
    for input in tx.inputs.iter() {
        write_input(hasher, input, encoding);
    }
    hasher.write_len(tx.outputs.len());
    for output in tx.outputs.iter() {
        write_output(hasher, output);
    }
    hasher.write_u64(tx.lock_time).update(tx.subnetwork_id).write_u64(tx.gas).write_var_bytes(&tx.payload);
}

fn write_input<T: HasherBase>(hasher: &mut T, input: &TransactionInput, encoding: TxEncoding) {
    hash_outpoint(hasher, &input.previous_outpoint);
    match encoding {
        TxEncoding::Full => hasher.write_var_bytes(&input.signature_script).write_u8(input.sig_op_count),
        TxEncoding::ExcludeSignatureScript => hasher.write_var_bytes(&[]).write_u8(0),
    };
    hasher.write_u64(input.sequence);
}

fn write_output<T: HasherBase>(hasher: &mut T, output: &TransactionOutput) {
    hasher.write_u64(output.value);
    hash_script_public_key(hasher, &output.script_public_key);
}
