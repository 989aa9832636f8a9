//! pingsweep - concurrent reachability sweep over large address lists
//!
//! Splits a line-addressable address file across a fixed number of
//! workers, probes every address once and streams the responsive ones to
//! an output file while the scan is still running.

pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use config::{SweepConfig, UNLIMITED_ERROR_BUDGET};
pub use error::{ScanError, ScanResult};
pub use network::{build_prober, ProbeError, ProbeMethod, ProbeOutcome, ProbeReply, Prober};
pub use output::{FileSink, MemorySink, ResultSink};
pub use scanner::{
    plan_partitions, ErrorBudget, PartitionRange, ScanOrchestrator, ScanStats, ScanSummary,
    WorkerExit,
};
pub use utils::file_input::{AddressSource, InMemorySource, LineIndex, SourceOpener};

pub type Result<T> = std::result::Result<T, ScanError>;
