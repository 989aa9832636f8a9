//! Scanner module containing the sweep orchestrator and its parts

pub mod budget;
pub mod collector;
pub mod engine;
pub mod partition;
pub mod worker;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub use budget::{BudgetDecision, ErrorBudget};
pub use collector::{CollectorReport, ResultCollector};
pub use engine::ScanOrchestrator;
pub use partition::{plan_partitions, PartitionRange};
pub use worker::{ScanWorker, WorkerExit, WorkerReport, READ_ERROR_THRESHOLD};

/// Live counters shared by all workers
#[derive(Debug, Default)]
pub struct ScanStatistics {
    successful: AtomicU64,
    failed: AtomicU64,
    errors: AtomicU64,
}

impl ScanStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    /// Operational error (read, probe or open failure)
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::AcqRel);
    }

    pub fn reset(&self) {
        self.successful.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
        self.errors.store(0, Ordering::Release);
    }

    pub fn snapshot(&self) -> ScanStats {
        ScanStats {
            successful: self.successful.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            errors: self.errors.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time copy of [`ScanStatistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Addresses that answered
    pub successful: u64,

    /// Addresses that did not answer or could not be evaluated
    pub failed: u64,

    /// Operational errors seen along the way
    pub errors: u64,
}

impl ScanStats {
    pub fn evaluated(&self) -> u64 {
        self.successful + self.failed
    }
}

/// Final outcome of one call to [`ScanOrchestrator::process_addresses`]
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Number of addresses the scan was asked to cover
    pub total: u64,

    pub stats: ScanStats,

    /// Addresses the collector wrote to the sink
    pub written: u64,

    /// Sink open/write failures
    pub write_errors: u64,

    pub workers: Vec<WorkerReport>,

    pub duration: Duration,
}

impl ScanSummary {
    pub fn successful(&self) -> u64 {
        self.stats.successful
    }

    pub fn failed(&self) -> u64 {
        self.stats.failed
    }

    /// Lines skipped because their worker stopped early
    pub fn unaccounted(&self) -> u64 {
        self.total.saturating_sub(self.stats.evaluated())
    }

    pub fn aborted_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.exit.is_early()).count()
    }

    /// Whether every line was evaluated
    pub fn is_complete(&self) -> bool {
        self.aborted_workers() == 0
    }

    /// Get scan rate in addresses per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.stats.evaluated() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_snapshot_and_reset() {
        let stats = ScanStatistics::new();
        stats.record_success();
        stats.record_failure();
        stats.record_failure();
        stats.record_error();

        assert_eq!(
            stats.snapshot(),
            ScanStats {
                successful: 1,
                failed: 2,
                errors: 1
            }
        );

        stats.reset();
        assert_eq!(stats.snapshot(), ScanStats::default());
    }

    #[test]
    fn test_summary_unaccounted() {
        let summary = ScanSummary {
            total: 10,
            stats: ScanStats {
                successful: 3,
                failed: 4,
                errors: 0,
            },
            written: 3,
            write_errors: 0,
            workers: Vec::new(),
            duration: Duration::from_secs(1),
        };
        assert_eq!(summary.unaccounted(), 3);
        assert!(summary.is_complete());
        assert!((summary.scan_rate() - 7.0).abs() < f64::EPSILON);
    }
}
