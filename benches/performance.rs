//! Performance benchmarks for the pingsweep scanner

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pingsweep::{
    config::SweepConfig,
    network::{ProbeError, ProbeOutcome, ProbeReply, Prober},
    output::MemorySink,
    scanner::{plan_partitions, ErrorBudget, ScanOrchestrator},
    utils::{InMemorySource, LineIndex, SourceOpener},
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Instant prober, every even last octet answers
struct InstantProber;

impl Prober for InstantProber {
    fn probe(&self, address: &str, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        if address.ends_with(['0', '2', '4', '6', '8']) {
            Ok(ProbeOutcome::Responsive(ProbeReply {
                payload_size: 64,
                sequence: 0,
                latency: Duration::ZERO,
            }))
        } else {
            Ok(ProbeOutcome::Unresponsive)
        }
    }

    fn name(&self) -> &str {
        "instant"
    }
}

fn addresses(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("10.{}.{}.{}", (i >> 16) & 0xff, (i >> 8) & 0xff, i & 0xff))
        .collect()
}

/// Benchmark partition planning for large inputs
fn bench_partitioning(c: &mut Criterion) {
    let mut group = c.benchmark_group("partitioning");

    for parts in [1usize, 8, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("plan_10M", parts), &parts, |b, &parts| {
            b.iter(|| black_box(plan_partitions(black_box(10_000_000), parts)))
        });
    }

    group.finish();
}

/// Benchmark the shared error budget under contention-free use
fn bench_error_budget(c: &mut Criterion) {
    c.bench_function("error_budget_consume", |b| {
        let budget = ErrorBudget::new(i64::MAX);
        b.iter(|| black_box(budget.consume()))
    });
}

/// Benchmark random access reads from an indexed file
fn bench_line_index(c: &mut Criterion) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for address in addresses(50_000) {
        writeln!(file, "{}", address).unwrap();
    }
    file.flush().unwrap();

    let mut group = c.benchmark_group("line_index");

    group.bench_function("build_50k", |b| {
        b.iter(|| black_box(LineIndex::build(file.path()).unwrap()))
    });

    let index = LineIndex::build(file.path()).unwrap();
    group.bench_function("sequential_read_1k", |b| {
        let mut source = index.open().unwrap();
        b.iter(|| {
            for line in 20_000..21_000u64 {
                black_box(source.read_at(line).unwrap());
            }
        })
    });

    group.finish();
}

/// Benchmark a whole sweep with an instant prober
fn bench_sweep(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let lines = addresses(10_000);
    let mut group = c.benchmark_group("sweep");
    group.sample_size(20);

    for threads in [1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("10k_addresses", threads),
            &threads,
            |b, &threads| {
                let orchestrator = ScanOrchestrator::new(
                    SweepConfig::default().with_threads(threads),
                    Arc::new(InMemorySource::new(lines.clone())),
                    Arc::new(InstantProber),
                )
                .unwrap();

                b.iter(|| {
                    rt.block_on(async {
                        black_box(
                            orchestrator
                                .process_addresses(10_000, MemorySink::new())
                                .await
                                .unwrap(),
                        )
                    })
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_partitioning,
    bench_error_budget,
    bench_line_index,
    bench_sweep
);
criterion_main!(benches);
