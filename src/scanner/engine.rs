//! Sweep orchestrator: partitions the input, runs workers and the collector

use super::budget::ErrorBudget;
use super::collector::{CollectorReport, ResultCollector};
use super::partition::plan_partitions;
use super::worker::{ScanWorker, WorkerContext, WorkerReport};
use super::{ScanStatistics, ScanStats, ScanSummary};
use crate::config::SweepConfig;
use crate::error::{ScanError, ScanResult};
use crate::network::Prober;
use crate::output::ResultSink;
use crate::utils::file_input::SourceOpener;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task;

/// Top-level coordinator of a reachability sweep
pub struct ScanOrchestrator {
    config: SweepConfig,
    opener: Arc<dyn SourceOpener>,
    prober: Arc<dyn Prober>,
    /// Counters of the most recently finished scan
    last_stats: Mutex<ScanStats>,
}

impl ScanOrchestrator {
    /// Create a new orchestrator with the given configuration
    pub fn new(
        config: SweepConfig,
        opener: Arc<dyn SourceOpener>,
        prober: Arc<dyn Prober>,
    ) -> ScanResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            opener,
            prober,
            last_stats: Mutex::new(ScanStats::default()),
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Counters of the most recently finished scan
    pub fn statistics(&self) -> ScanStats {
        match self.last_stats.lock() {
            Ok(stats) => *stats,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Scan lines `0..count` and stream responsive addresses into `sink`
    ///
    /// One blocking thread per non-empty partition plus one for the
    /// collector. Returns once every worker has stopped and the collector
    /// has drained the channel. Worker aborts are reported through the
    /// summary; only a panicking thread makes this return an error.
    ///
    /// Each call counts into its own statistics, so overlapping scans on
    /// one orchestrator never mix their totals.
    pub async fn process_addresses<S>(&self, count: u64, sink: S) -> ScanResult<ScanSummary>
    where
        S: ResultSink + 'static,
    {
        let start_time = Instant::now();

        let plan = plan_partitions(count, self.config.threads);
        let stats = Arc::new(ScanStatistics::new());

        if count > self.opener.line_count() {
            log::warn!(
                "Scanning {} lines but the input only has {}",
                count,
                self.opener.line_count()
            );
        }

        let capacity = usize::try_from(count)
            .unwrap_or(usize::MAX)
            .clamp(1, Semaphore::MAX_PERMITS);
        let (responsive_tx, responsive_rx) = mpsc::channel::<String>(capacity);

        let sink_name = sink.describe();

        // Spawned first so it always gets a thread, even with more
        // workers than the blocking pool can run at once.
        let collector = task::spawn_blocking(move || ResultCollector::new(responsive_rx, sink).run());

        let context = WorkerContext {
            opener: Arc::clone(&self.opener),
            prober: Arc::clone(&self.prober),
            budget: Arc::new(ErrorBudget::new(self.config.error_budget)),
            stats: Arc::clone(&stats),
            timeout: self.config.timeout_duration(),
        };

        let mut handles = Vec::with_capacity(plan.len());
        for (id, range) in plan.into_iter().enumerate() {
            if range.is_empty() {
                log::debug!("Thread {}: empty partition, not spawned", id);
                continue;
            }

            let worker = ScanWorker::new(id, range, context.clone(), responsive_tx.clone());
            handles.push(task::spawn_blocking(move || worker.run()));
        }

        log::info!(
            "Scanning {} addresses with {} workers using {}",
            count,
            handles.len(),
            self.prober.name()
        );

        let mut workers: Vec<WorkerReport> = Vec::with_capacity(handles.len());
        let mut failure: Option<ScanError> = None;

        for handle in handles {
            match handle.await {
                Ok(report) => workers.push(report),
                Err(e) => {
                    log::error!("Worker task failed: {}", e);
                    failure.get_or_insert(e.into());
                }
            }
        }

        // Workers are done: closing the channel lets the collector finish
        drop(responsive_tx);

        let collected = match collector.await {
            Ok(report) => report,
            Err(e) => {
                log::error!("Result collector failed: {}", e);
                failure.get_or_insert(e.into());
                CollectorReport::default()
            }
        };

        if let Some(err) = failure {
            return Err(err);
        }

        let summary = ScanSummary {
            total: count,
            stats: stats.snapshot(),
            written: collected.written,
            write_errors: collected.write_errors,
            workers,
            duration: start_time.elapsed(),
        };

        if let Ok(mut last) = self.last_stats.lock() {
            *last = summary.stats;
        }

        if summary.written > 0 {
            log::info!(
                "Wrote {} responsive IP addresses to {}",
                summary.written,
                sink_name
            );
        } else {
            log::info!("No response from any IP");
        }

        if !summary.is_complete() {
            log::warn!(
                "{} workers stopped early, {} addresses were not evaluated",
                summary.aborted_workers(),
                summary.unaccounted()
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ProbeError, ProbeOutcome, ProbeReply};
    use crate::output::MemorySink;
    use crate::utils::file_input::InMemorySource;
    use std::time::Duration;

    struct AlwaysUp;

    impl Prober for AlwaysUp {
        fn probe(&self, _address: &str, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            Ok(ProbeOutcome::Responsive(ProbeReply {
                payload_size: 64,
                sequence: 1,
                latency: Duration::from_micros(50),
            }))
        }

        fn name(&self) -> &str {
            "always-up"
        }
    }

    fn orchestrator(lines: usize, threads: usize) -> ScanOrchestrator {
        let source = InMemorySource::new((0..lines).map(|i| format!("192.0.2.{}", i)));
        let config = SweepConfig::new("ips.txt", "good.txt").with_threads(threads);
        ScanOrchestrator::new(config, Arc::new(source), Arc::new(AlwaysUp)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SweepConfig::default().with_threads(0);
        let result = ScanOrchestrator::new(
            config,
            Arc::new(InMemorySource::default()),
            Arc::new(AlwaysUp),
        );
        assert!(matches!(result, Err(ScanError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_every_address_collected() {
        let scanner = orchestrator(40, 4);
        let sink = MemorySink::new();

        let summary = scanner.process_addresses(40, sink.clone()).await.unwrap();

        assert_eq!(summary.successful(), 40);
        assert_eq!(summary.failed(), 0);
        assert_eq!(summary.written, 40);
        assert_eq!(summary.workers.len(), 4);
        assert!(summary.is_complete());
        assert_eq!(sink.lines().len(), 40);
        assert_eq!(scanner.statistics().successful, 40);
    }

    #[tokio::test]
    async fn test_zero_count_spawns_no_workers() {
        let scanner = orchestrator(5, 3);
        let summary = scanner
            .process_addresses(0, MemorySink::new())
            .await
            .unwrap();

        assert!(summary.workers.is_empty());
        assert_eq!(summary.stats.evaluated(), 0);
        assert_eq!(summary.written, 0);
    }

    #[tokio::test]
    async fn test_statistics_reset_between_scans() {
        let scanner = orchestrator(6, 2);
        scanner.process_addresses(6, MemorySink::new()).await.unwrap();
        let second = scanner.process_addresses(3, MemorySink::new()).await.unwrap();

        assert_eq!(second.successful(), 3);
        assert_eq!(scanner.statistics().successful, 3);
    }

    #[tokio::test]
    async fn test_more_workers_than_lines() {
        let scanner = orchestrator(2, 8);
        let sink = MemorySink::new();
        let summary = scanner.process_addresses(2, sink.clone()).await.unwrap();

        assert_eq!(summary.workers.len(), 2);
        assert_eq!(summary.successful(), 2);
        assert_eq!(sink.lines().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_scans_keep_separate_counts() {
        let scanner = orchestrator(50, 4);

        let (first, second) = tokio::join!(
            scanner.process_addresses(50, MemorySink::new()),
            scanner.process_addresses(20, MemorySink::new())
        );
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first.successful(), 50);
        assert_eq!(first.stats.evaluated(), 50);
        assert_eq!(second.successful(), 20);
        assert_eq!(second.stats.evaluated(), 20);

        let last = scanner.statistics().successful;
        assert!(last == 50 || last == 20);
    }
}
