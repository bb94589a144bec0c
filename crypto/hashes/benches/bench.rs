// Run with: cargo bench -p crypto-hashes --bench bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crypto_hashes::hashers::{BlockHash, TransactionSigningHash, TransactionSigningHashECDSA};
use crypto_hashes::{calc_merkle_root, Hash, Hasher, HasherBase, HasherExtensions};

fn bench_block_hash(c: &mut Criterion) {
    let parents: Vec<Hash> = (0..10).map(Hash::from_u64_word).collect();
    c.bench_function("BlockHash header-sized", |b| {
        b.iter(|| {
            let mut hasher = BlockHash::new();
            hasher.write_u16(1).write_len(parents.len());
            for parent in parents.iter() {
                hasher.update(parent);
            }
            hasher.write_u64(black_box(1_700_000_000_000)).write_u32(0x207fffff).write_u64(black_box(42));
            hasher.finalize()
        })
    });
}

fn bench_sighash_domains(c: &mut Criterion) {
    let payload = [7u8; 256];
    c.bench_function("TransactionSigningHash 256B", |b| b.iter(|| TransactionSigningHash::hash(black_box(payload))));
    c.bench_function("TransactionSigningHashECDSA 256B", |b| b.iter(|| TransactionSigningHashECDSA::hash(black_box(payload))));
}

fn bench_merkle(c: &mut Criterion) {
    let mut group = c.benchmark_group("calc_merkle_root");
    for size in [1usize, 16, 256, 2048] {
        let leaves: Vec<Hash> = (0..size as u64).map(Hash::from_u64_word).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &leaves, |b, leaves| {
            b.iter(|| calc_merkle_root(leaves.iter().copied()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_block_hash, bench_sighash_domains, bench_merkle);
criterion_main!(benches);
