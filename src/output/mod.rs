//! Output sinks for responsive addresses
//!
//! Results are plain text, one address per line, written and flushed one at
//! a time so an interrupted scan still leaves a readable partial file.

use crate::error::{ScanError, ScanResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Destination for responsive addresses
///
/// Only the result collector touches a sink, so implementations need no
/// internal locking of their own.
pub trait ResultSink: Send {
    /// Prepare the sink. Calling it again after success is a no-op.
    fn open(&mut self) -> ScanResult<()>;

    /// Append one address and flush it
    fn write(&mut self, address: &str) -> ScanResult<()>;

    /// Human readable destination for log messages
    fn describe(&self) -> String;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn open(&mut self) -> ScanResult<()> {
        (**self).open()
    }

    fn write(&mut self, address: &str) -> ScanResult<()> {
        (**self).write(address)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Plain text file sink
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    append: bool,
    file: Option<File>,
}

impl FileSink {
    /// Sink that truncates `path` when opened
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: false,
            file: None,
        }
    }

    /// Sink that appends to `path` when opened
    pub fn appending(path: impl Into<PathBuf>) -> Self {
        Self {
            append: true,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl ResultSink for FileSink {
    fn open(&mut self) -> ScanResult<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if self.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }

        let file = options.open(&self.path).map_err(|e| {
            ScanError::OutputError(format!(
                "failed to create output file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        self.file = Some(file);
        Ok(())
    }

    /// Unbuffered: a failed write leaves nothing pending that a later
    /// write could still push out.
    fn write(&mut self, address: &str) -> ScanResult<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            ScanError::OutputError(format!("{} is not open", self.path.display()))
        })?;

        let line = format!("{}\n", address);
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| {
                ScanError::OutputError(format!("failed to write ip {} to file: {}", address, e))
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory sink; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses written so far, in arrival order
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl ResultSink for MemorySink {
    fn open(&mut self) -> ScanResult<()> {
        Ok(())
    }

    fn write(&mut self, address: &str) -> ScanResult<()> {
        self.lines
            .lock()
            .map_err(|_| ScanError::OutputError("memory sink poisoned".to_string()))?
            .push(address.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
