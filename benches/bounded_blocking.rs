use std::thread;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use turnstile::sync::blocking::bounded;

fn bench_bounded_blocking(c: &mut Criterion) {
    const REPETITIONS: u64 = 1_000_000;
    let mut group = c.benchmark_group("bounded_blocking");
    group.significance_level(0.1).sample_size(10);
    group.throughput(Throughput::Elements(REPETITIONS));
    group.bench_function("put/take pair", |b| {
        b.iter(|| {
            let queue = bounded(1024).unwrap();
            let rx = queue.clone();
            let c = thread::spawn(move || {
                for i in 0..REPETITIONS {
                    assert_eq!(i, rx.take());
                }
            });
            let p = thread::spawn(move || {
                for i in 0..REPETITIONS {
                    queue.put(i);
                }
            });
            c.join().unwrap();
            p.join().unwrap();
        })
    });
    group.bench_function("4 producers/4 consumers", |b| {
        const THREADS: u64 = 4;
        b.iter(|| {
            let queue = bounded(1024).unwrap();
            let mut handles = Vec::new();
            for _ in 0..THREADS {
                let tx = queue.clone();
                handles.push(thread::spawn(move || {
                    for i in 0..REPETITIONS / THREADS {
                        tx.put(i);
                    }
                }));
                let rx = queue.clone();
                handles.push(thread::spawn(move || {
                    for _ in 0..REPETITIONS / THREADS {
                        criterion::black_box(rx.take());
                    }
                }));
            }
            for handle in handles {
                handle.join().unwrap();
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_bounded_blocking);
criterion_main!(benches);
