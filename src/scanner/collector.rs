//! Streaming writer for responsive addresses

use crate::output::ResultSink;
use tokio::sync::mpsc;

/// What the collector managed to write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorReport {
    pub written: u64,
    pub write_errors: u64,
}

/// Single consumer of the responsive-address channel
///
/// Runs for the whole scan, next to the workers. Sink failures are logged
/// and counted but never stop the drain, otherwise a full channel would
/// stall every producer.
pub struct ResultCollector<S> {
    receiver: mpsc::Receiver<String>,
    sink: S,
    opened: bool,
}

impl<S: ResultSink> ResultCollector<S> {
    pub fn new(receiver: mpsc::Receiver<String>, sink: S) -> Self {
        Self {
            receiver,
            sink,
            opened: false,
        }
    }

    /// Drain until every sender is dropped and the channel is empty
    ///
    /// Blocks the calling thread.
    pub fn run(mut self) -> CollectorReport {
        let mut report = CollectorReport::default();

        while let Some(address) = self.receiver.blocking_recv() {
            if !self.ensure_open() {
                report.write_errors += 1;
                continue;
            }

            match self.sink.write(&address) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    log::error!("Error writing responsive IP {}: {}", address, e);
                    report.write_errors += 1;
                }
            }
        }

        log::debug!(
            "Result collector finished: {} written, {} failed",
            report.written,
            report.write_errors
        );
        report
    }

    /// Open the sink on first use; a failed open is retried next time
    fn ensure_open(&mut self) -> bool {
        if self.opened {
            return true;
        }

        match self.sink.open() {
            Ok(()) => {
                log::debug!("Writing responsive addresses to {}", self.sink.describe());
                self.opened = true;
            }
            Err(e) => log::error!("Unable to open {}: {}", self.sink.describe(), e),
        }
        self.opened
    }
}
