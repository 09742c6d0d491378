use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use plsort_rs::heap::{Cell, Heap, TermRef};
use plsort_rs::sort::{self, Direction, MergeOutcome, SortChain, nat_sort};

/// xorshift64: deterministic input without an rng dependency.
fn random_ints(n: usize, seed: u64) -> Vec<i64> {
    let mut x = seed;
    (0..n)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x % 1_000_000) as i64
        })
        .collect()
}

fn inputs(n: usize) -> Vec<(&'static str, Vec<i64>)> {
    let random = random_ints(n, 0x9E37_79B9_7F4A_7C15);
    let sorted: Vec<i64> = (0..n as i64).collect();
    let reversed: Vec<i64> = (0..n as i64).rev().collect();
    vec![("random", random), ("presorted", sorted), ("reversed", reversed)]
}

fn heap_with(values: &[i64]) -> (Heap, TermRef) {
    let mut heap = Heap::default();
    let cells: Vec<Cell> = values.iter().map(|&v| Cell::Int(v)).collect();
    let list = heap.atomic_list(&cells).unwrap();
    (heap, list)
}

fn bench_msort(c: &mut Criterion) {
    let mut group = c.benchmark_group("msort");
    for n in [1_000, 100_000] {
        for (name, values) in inputs(n) {
            group.bench_with_input(BenchmarkId::new(name, n), &values, |b, values| {
                b.iter_batched(
                    || heap_with(values),
                    |(mut heap, list)| black_box(sort::msort(&mut heap, list).unwrap()),
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_sort_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_dedup");
    let values: Vec<i64> = random_ints(100_000, 42).iter().map(|v| v % 1000).collect();
    group.bench_function("random_1000_distinct", |b| {
        b.iter_batched(
            || heap_with(&values),
            |(mut heap, list)| black_box(sort::sort(&mut heap, list).unwrap()),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_keysort(c: &mut Criterion) {
    let values = random_ints(10_000, 7);
    let text = {
        let mut s = String::from("[");
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(&format!("{}-v{}", v, i));
        }
        s.push(']');
        s
    };
    c.bench_function("keysort_10k_pairs", |b| {
        b.iter_batched(
            || {
                let mut heap = Heap::default();
                let list = heap.read_term(&text).unwrap();
                (heap, list)
            },
            |(mut heap, list)| black_box(sort::keysort(&mut heap, list).unwrap()),
            BatchSize::LargeInput,
        )
    });
}

/// The merge engine alone, on a plain index chain.
struct IndexChain {
    keys: Vec<i64>,
    links: Vec<Option<u32>>,
    direction: Direction,
}

impl SortChain for IndexChain {
    type Node = u32;

    fn next(&self, node: u32) -> Option<u32> {
        self.links[node as usize]
    }

    fn set_next(&mut self, node: u32, next: Option<u32>) {
        self.links[node as usize] = next;
    }

    fn compare(&self, a: u32, b: u32) -> std::cmp::Ordering {
        self.direction
            .apply(self.keys[a as usize].cmp(&self.keys[b as usize]))
    }

    fn release(&mut self, node: u32) {
        self.links[node as usize] = None;
    }
}

fn bench_merge_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("nat_sort");
    let n = 100_000;
    for (name, keys) in inputs(n) {
        group.bench_with_input(BenchmarkId::new(name, n), &keys, |b, keys| {
            b.iter_batched(
                || IndexChain {
                    keys: keys.clone(),
                    links: (1..=n as u32).map(|i| (i < n as u32).then_some(i)).collect(),
                    direction: Direction::Ascending,
                },
                |mut chain| {
                    let outcome: MergeOutcome<u32> = nat_sort(&mut chain, Some(0), false);
                    black_box(outcome.runs)
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_msort,
    bench_sort_dedup,
    bench_keysort,
    bench_merge_engine,
);
criterion_main!(benches);
