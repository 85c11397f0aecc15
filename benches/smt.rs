use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zkevm_smt::{LeafValue, MemoryStorage, Smt, TreeKey};

fn generate_entries(pair_count: usize) -> Vec<(TreeKey, LeafValue)> {
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    (0..pair_count)
        .map(|_| {
            let key = TreeKey::new([rng.random(), rng.random(), rng.random(), rng.random()]);
            let mut lanes = [0u64; 8];
            for lane in lanes.iter_mut() {
                *lane = rng.random::<u32>() as u64;
            }
            lanes[0] |= 1;
            (key, LeafValue(lanes))
        })
        .collect()
}

fn smt_sequential_insert(c: &mut Criterion) {
    let entries = generate_entries(1_000);
    c.bench_function("smt-sequential-insert-1k", |b| {
        b.iter_batched(
            || Smt::new(MemoryStorage::new()).unwrap(),
            |mut tree| {
                for (key, value) in &entries {
                    tree.insert_value(key, *value).unwrap();
                }
                tree
            },
            BatchSize::SmallInput,
        )
    });
}

fn smt_bulk_build(c: &mut Criterion) {
    let entries = generate_entries(10_000);
    c.bench_function("smt-bulk-build-10k", |b| {
        b.iter_batched(
            || (Smt::new(MemoryStorage::new()).unwrap(), entries.clone()),
            |(mut tree, entries)| {
                tree.bulk_build(entries, None).unwrap();
                tree
            },
            BatchSize::SmallInput,
        )
    });
}

fn smt_get(c: &mut Criterion) {
    let entries = generate_entries(10_000);
    let mut tree = Smt::new(MemoryStorage::new()).unwrap();
    tree.bulk_build(entries.clone(), None).unwrap();

    let mut cursor = 0;
    c.bench_function("smt-get", |b| {
        b.iter(|| {
            cursor = (cursor + 1) % entries.len();
            tree.get_value(&entries[cursor].0).unwrap()
        })
    });
}

criterion_group!(smt_group, smt_sequential_insert, smt_bulk_build, smt_get);
criterion_main!(smt_group);
