use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use parl::awaitable::Awaitable;
use parl::awaitable::cyclic::CyclicAwaitable;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Benchmark: signal creation (Awaitable vs tokio Notify)
/// 基准测试：信号创建（Awaitable vs tokio Notify）
fn bench_creation_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_creation_comparison");

    group.bench_function("awaitable", |b| {
        b.iter(|| {
            let _awaitable = Awaitable::new();
        });
    });

    group.bench_function("tokio_notify", |b| {
        b.iter(|| {
            let _notify = Notify::new();
        });
    });

    group.finish();
}

/// Benchmark: close before wait (fast path)
/// 基准测试：等待前关闭（快速路径）
fn bench_close_before_wait_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("close_before_wait_comparison");

    group.bench_function("awaitable", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter_custom(|iters| async move {
            let mut total_duration = Duration::from_secs(0);

            for _ in 0..iters {
                let awaitable = Awaitable::new();
                let ch = awaitable.ch();

                let start = Instant::now();

                awaitable.close();
                ch.wait().await;

                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.bench_function("tokio_notify", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter_custom(|iters| async move {
            let mut total_duration = Duration::from_secs(0);

            for _ in 0..iters {
                let notify = Notify::new();

                let start = Instant::now();

                notify.notify_one();
                notify.notified().await;

                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.finish();
}

/// Benchmark: many waiters woken by one close
/// 基准测试：一次关闭唤醒多个等待者
fn bench_broadcast_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast_comparison");

    for waiters in [1, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("awaitable", waiters), waiters, |b, &waiters| {
            let runtime = tokio::runtime::Runtime::new().unwrap();

            b.to_async(&runtime).iter_custom(|iters| async move {
                let mut total_duration = Duration::from_secs(0);

                for _ in 0..iters {
                    let awaitable = Awaitable::new();

                    let start = Instant::now();

                    let handles: Vec<_> = (0..waiters)
                        .map(|_| {
                            let ch = awaitable.ch();
                            tokio::spawn(async move { ch.wait().await })
                        })
                        .collect();
                    awaitable.close();
                    for handle in handles {
                        handle.await.unwrap();
                    }

                    total_duration += start.elapsed();
                }

                total_duration
            });
        });

        group.bench_with_input(BenchmarkId::new("tokio_notify", waiters), waiters, |b, &waiters| {
            let runtime = tokio::runtime::Runtime::new().unwrap();

            b.to_async(&runtime).iter_custom(|iters| async move {
                let mut total_duration = Duration::from_secs(0);

                for _ in 0..iters {
                    let notify = Arc::new(Notify::new());

                    let start = Instant::now();

                    let handles: Vec<_> = (0..waiters)
                        .map(|_| {
                            let notify = notify.clone();
                            tokio::spawn(async move {
                                let notified = notify.notified();
                                tokio::pin!(notified);
                                notified.as_mut().enable();
                                notified.await;
                            })
                        })
                        .collect();
                    // Let every waiter register before the broadcast
                    tokio::task::yield_now().await;
                    notify.notify_waiters();
                    for handle in handles {
                        // A waiter that registered late still needs a permit
                        notify.notify_one();
                        handle.await.unwrap();
                    }

                    total_duration += start.elapsed();
                }

                total_duration
            });
        });
    }

    group.finish();
}

/// Benchmark: close and re-open cycles of a cyclic signal
/// 基准测试：循环信号的关闭与重新打开
fn bench_cyclic_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("cyclic_cycles");

    group.bench_function("close_open", |b| {
        let cyclic = CyclicAwaitable::new();
        b.iter(|| {
            cyclic.close();
            cyclic.open()
        });
    });

    group.bench_function("ch_load", |b| {
        let cyclic = CyclicAwaitable::new();
        b.iter(|| cyclic.ch());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_creation_comparison,
    bench_close_before_wait_comparison,
    bench_broadcast_comparison,
    bench_cyclic_cycles,
);

criterion_main!(benches);
