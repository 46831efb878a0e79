use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use governor::Quota;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;

use burst_limit::RateLimiter;
use burst_limit::Silent;

/// Anything that can make a single admission decision.
trait Admit: Send + Sync {
    fn admit(&self) -> bool;
}

impl Admit for RateLimiter<Silent> {
    fn admit(&self) -> bool {
        self.allow("bench")
    }
}

// Governor as the baseline
impl Admit for governor::RateLimiter<NotKeyed, InMemoryState, QuantaClock> {
    fn admit(&self) -> bool {
        self.check().is_ok()
    }
}

fn bench_single<A: Admit>(group_name: &str, c: &mut Criterion, limiter: Arc<A>) {
    let mut group = c.benchmark_group(group_name);

    group.bench_function("single-threaded", |b| {
        b.iter(|| {
            let _ = black_box(limiter.as_ref()).admit();
        })
    });

    group.finish();
}

fn bench_parallel<A: Admit + 'static>(group_name: &str, c: &mut Criterion, limiter: Arc<A>) {
    let mut group = c.benchmark_group(group_name);

    for threads in [2, 4, 8].iter() {
        let num_threads = *threads;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-threads", num_threads)),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let barrier = Arc::new(Barrier::new(n + 1));
                    let mut handles = Vec::with_capacity(n);

                    for _ in 0..n {
                        let l = Arc::clone(&limiter);
                        let bar = Arc::clone(&barrier);
                        let iters_per_thread = iters / n as u64;

                        handles.push(thread::spawn(move || {
                            bar.wait(); // Wait for the start signal
                            for _ in 0..iters_per_thread {
                                let _ = black_box(l.admit());
                            }
                        }));
                    }

                    // Synchronize the start across all threads
                    barrier.wait();
                    let start = Instant::now();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let limit_val = 1_000_000;
    let period = Duration::from_secs(60);

    // Mostly admitting: the CAS fast path.
    let open = Arc::new(RateLimiter::new(limit_val, period).with_reporter(Silent));
    bench_single("BurstLimit-Admitting", c, Arc::clone(&open));
    bench_parallel("BurstLimit-Admitting", c, open);

    // Exhausted within the first few calls: the rejection path.
    let saturated = Arc::new(RateLimiter::new(10, period).with_reporter(Silent));
    bench_single("BurstLimit-Suppressing", c, Arc::clone(&saturated));
    bench_parallel("BurstLimit-Suppressing", c, saturated);

    // Disabled: configuration loads only.
    let disabled = Arc::new(RateLimiter::new(0, period).with_reporter(Silent));
    bench_single("BurstLimit-Disabled", c, Arc::clone(&disabled));
    bench_parallel("BurstLimit-Disabled", c, disabled);

    let gov_quota = Quota::per_minute(NonZeroU32::new(limit_val as u32).unwrap());
    let gov = Arc::new(governor::RateLimiter::direct_with_clock(
        gov_quota,
        QuantaClock::default(),
    ));
    bench_single("Governor", c, Arc::clone(&gov));
    bench_parallel("Governor", c, gov);
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
