//! Error budget and partial-failure behaviour of a whole sweep

use pingsweep::{
    config::SweepConfig,
    error::{ScanError, ScanResult},
    network::{ProbeError, ProbeOutcome, ProbeReply, Prober},
    output::{MemorySink, ResultSink},
    scanner::{ScanOrchestrator, WorkerExit},
    utils::{AddressSource, SourceOpener},
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// In-memory list where some lines cannot be read
#[derive(Clone)]
struct DamagedList {
    lines: Arc<Vec<String>>,
    unreadable: Arc<HashSet<u64>>,
}

impl DamagedList {
    fn new(count: usize, unreadable: impl IntoIterator<Item = u64>) -> Self {
        Self {
            lines: Arc::new((0..count).map(|i| format!("172.16.0.{}", i)).collect()),
            unreadable: Arc::new(unreadable.into_iter().collect()),
        }
    }
}

impl AddressSource for DamagedList {
    fn read_at(&mut self, line: u64) -> ScanResult<String> {
        if self.unreadable.contains(&line) {
            return Err(ScanError::read(line, "bad sector"));
        }
        self.lines
            .get(line as usize)
            .cloned()
            .ok_or_else(|| ScanError::read(line, "line out of range"))
    }
}

impl SourceOpener for DamagedList {
    fn open(&self) -> ScanResult<Box<dyn AddressSource>> {
        Ok(Box::new(self.clone()))
    }

    fn line_count(&self) -> u64 {
        self.lines.len() as u64
    }
}

/// Every address answers except the listed ones, whose probe errors out
struct BrokenFor(HashSet<String>);

impl Prober for BrokenFor {
    fn probe(&self, address: &str, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        if self.0.contains(address) {
            return Err(ProbeError::Resolve {
                address: address.to_string(),
                reason: "no such host".to_string(),
            });
        }
        Ok(ProbeOutcome::Responsive(ProbeReply {
            payload_size: 64,
            sequence: 0,
            latency: Duration::from_micros(10),
        }))
    }

    fn name(&self) -> &str {
        "broken-for"
    }
}

fn all_up() -> Arc<BrokenFor> {
    Arc::new(BrokenFor(HashSet::new()))
}

fn scanner(
    source: DamagedList,
    prober: Arc<dyn Prober>,
    threads: usize,
    budget: i64,
) -> ScanOrchestrator {
    let config = SweepConfig::new("ips.txt", "good.txt")
        .with_threads(threads)
        .with_error_budget(budget);
    ScanOrchestrator::new(config, Arc::new(source), prober).unwrap()
}

#[tokio::test]
async fn test_exhausted_budget_leaves_lines_unaccounted() {
    // worker 0 owns 0..=9 and hits three unreadable lines at the start
    let source = DamagedList::new(20, [0, 1, 2]);
    let sink = MemorySink::new();

    let summary = scanner(source, all_up(), 2, 0)
        .process_addresses(20, sink.clone())
        .await
        .unwrap();

    assert_eq!(
        summary.workers[0].exit,
        WorkerExit::BudgetExhausted { line: 2 }
    );
    assert_eq!(summary.workers[1].exit, WorkerExit::Completed);

    assert!(summary.successful() + summary.failed() < 20);
    assert_eq!(summary.unaccounted(), 7);
    assert_eq!(summary.successful(), 10);

    // nothing from the aborted range reached the output
    let written: HashSet<String> = sink.lines().into_iter().collect();
    for i in 0..10 {
        assert!(!written.contains(&format!("172.16.0.{}", i)));
    }
}

#[tokio::test]
async fn test_unlimited_budget_evaluates_everything() {
    let source = DamagedList::new(30, [0, 1, 2, 3, 4, 12]);
    let broken: HashSet<String> = ["172.16.0.20", "172.16.0.21"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let summary = scanner(source, Arc::new(BrokenFor(broken)), 3, -1)
        .process_addresses(30, MemorySink::new())
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.successful() + summary.failed(), 30);
    assert_eq!(summary.successful(), 22);
    assert_eq!(summary.stats.errors, 8);
}

#[tokio::test]
async fn test_abort_is_local_to_one_worker() {
    // probe failures only in the first partition
    let broken: HashSet<String> = (0..5).map(|i| format!("172.16.0.{}", i)).collect();
    let source = DamagedList::new(40, []);

    let summary = scanner(source, Arc::new(BrokenFor(broken)), 4, 2)
        .process_addresses(40, MemorySink::new())
        .await
        .unwrap();

    assert_eq!(summary.aborted_workers(), 1);
    assert_eq!(
        summary.workers[0].exit,
        WorkerExit::BudgetExhausted { line: 2 }
    );
    assert!(summary.workers[1..]
        .iter()
        .all(|w| w.exit == WorkerExit::Completed));
    assert_eq!(summary.successful(), 30);
}

#[tokio::test]
async fn test_shared_budget_is_spent_across_workers() {
    // one probe failure per partition, budget only covers two of them
    let broken: HashSet<String> = [0, 10, 20, 30]
        .iter()
        .map(|i| format!("172.16.0.{}", i))
        .collect();
    let source = DamagedList::new(40, []);

    let summary = scanner(source, Arc::new(BrokenFor(broken)), 4, 2)
        .process_addresses(40, MemorySink::new())
        .await
        .unwrap();

    assert_eq!(summary.aborted_workers(), 2);
    assert_eq!(summary.stats.errors, 4);
    assert_eq!(summary.successful() + summary.failed(), 22);
    assert_eq!(summary.unaccounted(), 18);
}

#[tokio::test]
async fn test_sink_failures_do_not_block_workers() {
    struct ReadOnlySink;

    impl ResultSink for ReadOnlySink {
        fn open(&mut self) -> ScanResult<()> {
            Err(ScanError::OutputError("read-only file system".into()))
        }

        fn write(&mut self, _address: &str) -> ScanResult<()> {
            Err(ScanError::OutputError("read-only file system".into()))
        }

        fn describe(&self) -> String {
            "read-only".into()
        }
    }

    let summary = scanner(DamagedList::new(100, []), all_up(), 4, 0)
        .process_addresses(100, ReadOnlySink)
        .await
        .unwrap();

    assert_eq!(summary.successful(), 100);
    assert_eq!(summary.written, 0);
    assert_eq!(summary.write_errors, 100);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_worker_panic_surfaces_as_task_error() {
    struct Panicky;

    impl Prober for Panicky {
        fn probe(&self, _address: &str, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            panic!("prober bug");
        }

        fn name(&self) -> &str {
            "panicky"
        }
    }

    let result = scanner(DamagedList::new(4, []), Arc::new(Panicky), 2, -1)
        .process_addresses(4, MemorySink::new())
        .await;

    assert!(matches!(result, Err(ScanError::TaskError(_))));
}
