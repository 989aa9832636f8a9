//! Probe by running the operating system's `ping` binary

use super::{ProbeError, ProbeOutcome, ProbeReply, Prober};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Extra time granted to the child before it is killed
const KILL_GRACE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shells out to `ping` and looks only at the exit status
#[derive(Debug, Clone)]
pub struct SystemPinger {
    program: String,
}

impl Default for SystemPinger {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPinger {
    pub fn new() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }

    /// Use a different executable (useful where `ping` lives off PATH)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for a single echo request with the given wait time
    pub fn ping_args(address: &str, timeout: Duration) -> Vec<String> {
        if cfg!(windows) {
            vec![
                "-n".to_string(),
                "1".to_string(),
                "-w".to_string(),
                timeout.as_millis().to_string(),
                address.to_string(),
            ]
        } else if cfg!(target_os = "macos") {
            // BSD ping takes -W in milliseconds
            vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                timeout.as_millis().to_string(),
                address.to_string(),
            ]
        } else {
            let secs = ((timeout.as_millis() + 999) / 1000).max(1);
            vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                secs.to_string(),
                address.to_string(),
            ]
        }
    }

    /// Wait for the child, killing it once the deadline has passed
    fn wait_with_deadline(child: &mut Child, deadline: Instant) -> Result<bool, ProbeError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.success()),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(false);
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(ProbeError::Spawn(e.to_string())),
            }
        }
    }
}

impl Prober for SystemPinger {
    fn probe(&self, address: &str, timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        let start = Instant::now();

        let mut child = Command::new(&self.program)
            .args(Self::ping_args(address, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ProbeError::Spawn(format!("{}: {}", self.program, e)))?;

        let deadline = start + timeout + KILL_GRACE;
        if Self::wait_with_deadline(&mut child, deadline)? {
            Ok(ProbeOutcome::Responsive(ProbeReply {
                payload_size: 0,
                sequence: 0,
                latency: start.elapsed(),
            }))
        } else {
            Ok(ProbeOutcome::Unresponsive)
        }
    }

    fn name(&self) -> &str {
        "system-ping"
    }
}
