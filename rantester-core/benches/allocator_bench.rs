use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rantester_core::prelude::*;

fn bench_allocators(c: &mut Criterion) {
    let subnet = "10.0.0.0/8".parse().unwrap();
    let base = "10.0.0.1".parse().unwrap();
    c.bench_function("allocate_4096_addresses", |b| {
        b.iter(|| allocate(black_box(base), subnet, 4096).unwrap())
    });

    let generator = IdentityGenerator::new("0000000001").unwrap();
    c.bench_function("derive_4096_identities", |b| {
        b.iter(|| {
            for offset in 1..=4096 {
                black_box(generator.derive(offset).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_allocators);
criterion_main!(benches);
