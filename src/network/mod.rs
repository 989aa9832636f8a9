//! Network module: liveness probers
//!
//! A [`Prober`] performs exactly one reachability check against one
//! address. "No reply within the timeout" is an ordinary
//! [`ProbeOutcome::Unresponsive`]; a [`ProbeError`] means the probe could
//! not be carried out at all (resolution, socket or process failure).

pub mod icmp;
pub mod system;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use icmp::IcmpPinger;
pub use system::SystemPinger;

/// Available probe implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// Shell out to the operating system's `ping`
    System,
    /// Native ICMP echo over a raw socket (needs privileges)
    Icmp,
}

impl ProbeMethod {
    /// Get the name of the probe method
    pub fn name(&self) -> &'static str {
        match self {
            ProbeMethod::System => "system",
            ProbeMethod::Icmp => "icmp",
        }
    }

    /// Check if the method requires raw sockets
    pub fn requires_raw_socket(&self) -> bool {
        matches!(self, ProbeMethod::Icmp)
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProbeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" | "exec" => Ok(ProbeMethod::System),
            "icmp" | "native" | "raw" => Ok(ProbeMethod::Icmp),
            _ => Err(format!("Unknown probe method: {}", s)),
        }
    }
}

/// Details of an echo reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReply {
    /// Size of the received ICMP message in bytes (0 when unknown)
    pub payload_size: usize,
    /// Echo sequence number
    pub sequence: u16,
    /// Round-trip time
    pub latency: Duration,
}

/// Result of a single probe that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Responsive(ProbeReply),
    Unresponsive,
}

impl ProbeOutcome {
    pub fn is_responsive(&self) -> bool {
        matches!(self, ProbeOutcome::Responsive(_))
    }

    pub fn reply(&self) -> Option<&ProbeReply> {
        match self {
            ProbeOutcome::Responsive(reply) => Some(reply),
            ProbeOutcome::Unresponsive => None,
        }
    }
}

/// Probe mechanism failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Address resolution failed for {address}: {reason}")]
    Resolve { address: String, reason: String },

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Failed to run ping: {0}")]
    Spawn(String),

    #[error("Unsupported target: {0}")]
    Unsupported(String),
}

/// One-shot liveness check against a single address
pub trait Prober: Send + Sync {
    /// Send exactly one probe and wait at most `timeout` for the answer
    fn probe(&self, address: &str, timeout: Duration) -> Result<ProbeOutcome, ProbeError>;

    fn name(&self) -> &str;
}

impl<P: Prober + ?Sized> Prober for Arc<P> {
    fn probe(&self, address: &str, timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        (**self).probe(address, timeout)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build the prober selected by `method`
///
/// Raw-socket probers check their privileges here so a missing capability
/// is reported before any worker starts.
pub fn build_prober(method: ProbeMethod) -> crate::Result<Arc<dyn Prober>> {
    match method {
        ProbeMethod::System => Ok(Arc::new(SystemPinger::new())),
        ProbeMethod::Icmp => Ok(Arc::new(IcmpPinger::new()?)),
    }
}
