//! Benchmark: batched scalar arithmetic over a tensor list.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use tessera_core::foreach::{foreach_add, foreach_add_list, foreach_mul_};
use tessera_core::{DType, Tensor};

fn make_list(n: usize, h: usize, w: usize) -> Vec<Tensor> {
    (0..n)
        .map(|k| {
            let data: Vec<f32> = (0..h * w).map(|i| ((i + k) % 17) as f32 * 0.25).collect();
            Tensor::from_f32(&data, &[h, w])
        })
        .collect()
}

fn bench_foreach(c: &mut Criterion) {
    let tensors = make_list(20, 400, 400);
    c.bench_function("foreach_add scalar 20x400x400 f32", |b| {
        b.iter(|| foreach_add(black_box(&tensors), 1).unwrap())
    });

    let rhs = make_list(20, 400, 400);
    c.bench_function("foreach_add_list 20x400x400 f32", |b| {
        b.iter(|| foreach_add_list(black_box(&tensors), black_box(&rhs)).unwrap())
    });

    c.bench_function("foreach_mul_ in-place 20x400x400 f32", |b| {
        b.iter(|| {
            let mut owned = tensors.clone();
            foreach_mul_(&mut owned, 3).unwrap();
            owned
        })
    });
}

criterion_group!(benches, bench_foreach);
criterion_main!(benches);
