//! Per-partition scan loop

use super::budget::{BudgetDecision, ErrorBudget};
use super::partition::PartitionRange;
use super::ScanStatistics;
use crate::network::{ProbeOutcome, Prober};
use crate::utils::file_input::SourceOpener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Read failures a worker tolerates before they start charging the budget
pub const READ_ERROR_THRESHOLD: u32 = 3;

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Every line of the range was evaluated
    Completed,
    /// The budget ran out while handling `line`
    BudgetExhausted { line: u64 },
    /// The input could not be opened, nothing was evaluated
    SourceUnavailable,
}

impl WorkerExit {
    pub fn is_early(&self) -> bool {
        !matches!(self, WorkerExit::Completed)
    }
}

/// What one worker did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    pub range: PartitionRange,
    /// Lines evaluated (each counted once as successful or failed)
    pub processed: u64,
    pub exit: WorkerExit,
}

/// Everything the workers of one scan share
#[derive(Clone)]
pub struct WorkerContext {
    pub opener: Arc<dyn SourceOpener>,
    pub prober: Arc<dyn Prober>,
    pub budget: Arc<ErrorBudget>,
    pub stats: Arc<ScanStatistics>,
    pub timeout: Duration,
}

/// Sequentially scans one partition on a blocking thread
pub struct ScanWorker {
    id: usize,
    range: PartitionRange,
    context: WorkerContext,
    responsive: mpsc::Sender<String>,
}

impl ScanWorker {
    pub fn new(
        id: usize,
        range: PartitionRange,
        context: WorkerContext,
        responsive: mpsc::Sender<String>,
    ) -> Self {
        Self {
            id,
            range,
            context,
            responsive,
        }
    }

    /// Run the scan loop to completion or budget exhaustion
    ///
    /// Blocks the calling thread; must not run on an async executor thread.
    pub fn run(self) -> WorkerReport {
        let mut processed = 0u64;

        let mut source = match self.context.opener.open() {
            Ok(source) => source,
            Err(e) => {
                log::error!(
                    "Thread {}: Unable to open input file! More: {}",
                    self.id,
                    e
                );
                self.context.stats.record_error();
                self.charge_budget();
                return self.report(processed, WorkerExit::SourceUnavailable);
            }
        };

        log::debug!("Thread {}: scanning lines {}", self.id, self.range);

        // Never reset: once the threshold is hit every later read failure counts
        let mut read_errors = 0u32;

        for line in self.range.lines() {
            processed += 1;

            let address = match source.read_at(line) {
                Ok(address) => address,
                Err(e) => {
                    log::warn!(
                        "Thread {}: Read line operation failure at line {}! More: {}",
                        self.id,
                        line,
                        e
                    );
                    self.context.stats.record_failure();
                    self.context.stats.record_error();
                    read_errors += 1;

                    if read_errors >= READ_ERROR_THRESHOLD
                        && self.charge_budget() == BudgetDecision::Exhausted
                    {
                        return self.abort(processed, line);
                    }
                    continue;
                }
            };

            log::debug!("Pinging {}", address);

            match self.context.prober.probe(&address, self.context.timeout) {
                Ok(ProbeOutcome::Responsive(reply)) => {
                    log::info!(
                        "SUCCESS: {} ({} bytes, seq={}, time={:?})",
                        address,
                        reply.payload_size,
                        reply.sequence,
                        reply.latency
                    );
                    self.context.stats.record_success();

                    if self.responsive.blocking_send(address).is_err() {
                        log::error!("Thread {}: result collector is gone", self.id);
                    }
                }
                Ok(ProbeOutcome::Unresponsive) => {
                    log::info!("FAILURE: {}", address);
                    self.context.stats.record_failure();
                }
                Err(e) => {
                    log::warn!("Thread {}: probe of {} failed: {}", self.id, address, e);
                    self.context.stats.record_failure();
                    self.context.stats.record_error();

                    if self.charge_budget() == BudgetDecision::Exhausted {
                        return self.abort(processed, line);
                    }
                }
            }
        }

        self.report(processed, WorkerExit::Completed)
    }

    fn charge_budget(&self) -> BudgetDecision {
        let decision = self.context.budget.consume();
        if let Some(left) = self.context.budget.remaining() {
            log::debug!("Thread {}: error budget left {}", self.id, left);
        }
        decision
    }

    fn abort(&self, processed: u64, line: u64) -> WorkerReport {
        log::error!(
            "Thread {}: error budget exhausted at line {}, skipping {} remaining lines",
            self.id,
            line,
            self.range.len() - processed
        );
        self.report(processed, WorkerExit::BudgetExhausted { line })
    }

    fn report(&self, processed: u64, exit: WorkerExit) -> WorkerReport {
        WorkerReport {
            id: self.id,
            range: self.range,
            processed,
            exit,
        }
    }
}
