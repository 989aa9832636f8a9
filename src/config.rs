//! Configuration module for the pingsweep scanner

use crate::network::ProbeMethod;
use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Budget value meaning "absorb any number of errors"
pub const UNLIMITED_ERROR_BUDGET: i64 = -1;

/// Main configuration structure for sweep operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// File with one address per line
    pub input: PathBuf,

    /// File receiving responsive addresses
    pub output: PathBuf,

    /// Number of concurrent workers
    pub threads: usize,

    /// Operational errors tolerated across the whole scan (negative = unlimited)
    pub error_budget: i64,

    /// Timeout for each probe in milliseconds
    pub timeout_ms: u64,

    /// Probe implementation to use
    pub method: ProbeMethod,

    /// Append to the output file instead of truncating it
    pub append: bool,

    /// Suppress all log output
    pub silent: bool,

    /// Only scan the first `count` lines of the input
    pub count: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("ips.txt"),
            output: PathBuf::from("good.txt"),
            threads: num_cpus::get().max(1),
            error_budget: UNLIMITED_ERROR_BUDGET,
            timeout_ms: 2000,
            method: ProbeMethod::System,
            append: false,
            silent: false,
            count: None,
        }
    }
}

impl SweepConfig {
    /// Create a new sweep configuration
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    /// Set the number of workers
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the shared error budget
    pub fn with_error_budget(mut self, error_budget: i64) -> Self {
        self.error_budget = error_budget;
        self
    }

    /// Set the probe timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the probe method
    pub fn with_method(mut self, method: ProbeMethod) -> Self {
        self.method = method;
        self
    }

    /// Append instead of truncating the output file
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether the error budget never runs out
    pub fn unlimited_budget(&self) -> bool {
        self.error_budget < 0
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ScanError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: SweepConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path of the per-user config file
    pub fn default_config_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".pingsweep.toml")
    }

    /// Load configuration from default locations
    pub fn load_default_config() -> Self {
        let path = Self::default_config_path();

        if path.exists() {
            match Self::from_toml_file(&path) {
                Ok(config) => {
                    log::debug!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.threads == 0 {
            return Err(ScanError::ConfigError(
                "Invalid thread count less than 1!".to_string(),
            ));
        }

        if self.input.as_os_str().is_empty() {
            return Err(ScanError::ConfigError(
                "Invalid input file parameter!".to_string(),
            ));
        }

        if self.output.as_os_str().is_empty() {
            return Err(ScanError::ConfigError(
                "Invalid output file parameter!".to_string(),
            ));
        }

        if self.timeout_ms == 0 {
            return Err(ScanError::ConfigError(
                "Probe timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
