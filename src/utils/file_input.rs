//! Line-addressable address input
//!
//! The address list can be far larger than memory, so the file is indexed
//! once (byte offset of every line start) and each worker then opens its
//! own handle and seeks straight to the line it needs.

use crate::error::{ScanError, ScanResult};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Random access to addresses by zero-based line index
pub trait AddressSource: Send {
    fn read_at(&mut self, line: u64) -> ScanResult<String>;
}

/// Hands out independent [`AddressSource`] handles, one per worker
pub trait SourceOpener: Send + Sync {
    fn open(&self) -> ScanResult<Box<dyn AddressSource>>;

    /// Number of addressable lines
    fn line_count(&self) -> u64;
}

/// Byte offsets of every line in a plain text address file
#[derive(Debug, Clone)]
pub struct LineIndex {
    path: PathBuf,
    offsets: Arc<Vec<u64>>,
}

impl LineIndex {
    /// Index `path` with a single sequential pass
    pub fn build<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                ScanError::InputError(format!("No \"{}\" file was found!", path.display()))
            }
            _ => ScanError::InputError(format!(
                "Unable to open input file {}: {}",
                path.display(),
                e
            )),
        })?;

        let mut reader = BufReader::new(file);
        let mut offsets = Vec::new();
        let mut line = Vec::new();
        let mut position = 0u64;

        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            offsets.push(position);
            position += read as u64;
        }

        log::debug!("Indexed {} lines in {}", offsets.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            offsets: Arc::new(offsets),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.offsets.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Check that at least `count` lines are available
    ///
    /// `None` means "scan the whole file". An empty file is rejected since
    /// there is nothing to scan.
    pub fn resolve_count(&self, count: Option<u64>) -> ScanResult<u64> {
        if self.is_empty() {
            return Err(ScanError::InputError(format!(
                "Input file {} contains no addresses",
                self.path.display()
            )));
        }

        match count {
            None => Ok(self.len()),
            Some(requested) if requested > self.len() => Err(ScanError::InputError(format!(
                "Input file {} has {} lines, {} requested",
                self.path.display(),
                self.len(),
                requested
            ))),
            Some(requested) => Ok(requested),
        }
    }
}

impl SourceOpener for LineIndex {
    fn open(&self) -> ScanResult<Box<dyn AddressSource>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(IndexedLineReader {
            reader: BufReader::new(file),
            offsets: Arc::clone(&self.offsets),
        }))
    }

    fn line_count(&self) -> u64 {
        self.len()
    }
}

/// A worker's private handle on an indexed file
pub struct IndexedLineReader {
    reader: BufReader<File>,
    offsets: Arc<Vec<u64>>,
}

impl AddressSource for IndexedLineReader {
    fn read_at(&mut self, line: u64) -> ScanResult<String> {
        let offset = usize::try_from(line)
            .ok()
            .and_then(|i| self.offsets.get(i))
            .copied()
            .ok_or_else(|| ScanError::read(line, "line out of range"))?;

        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| ScanError::read(line, e.to_string()))?;

        let mut bytes = Vec::new();
        self.reader
            .read_until(b'\n', &mut bytes)
            .map_err(|e| ScanError::read(line, e.to_string()))?;

        let text = String::from_utf8(bytes).map_err(|_| ScanError::read(line, "invalid UTF-8"))?;
        parse_address_line(line, &text)
    }
}

/// Addresses already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    lines: Arc<Vec<String>>,
}

impl InMemorySource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Arc::new(lines.into_iter().map(Into::into).collect()),
        }
    }
}

impl SourceOpener for InMemorySource {
    fn open(&self) -> ScanResult<Box<dyn AddressSource>> {
        Ok(Box::new(self.clone()))
    }

    fn line_count(&self) -> u64 {
        self.lines.len() as u64
    }
}

impl AddressSource for InMemorySource {
    fn read_at(&mut self, line: u64) -> ScanResult<String> {
        let text = usize::try_from(line)
            .ok()
            .and_then(|i| self.lines.get(i))
            .ok_or_else(|| ScanError::read(line, "line out of range"))?;
        parse_address_line(line, text)
    }
}

fn parse_address_line(line: u64, text: &str) -> ScanResult<String> {
    let address = text.trim();
    if address.is_empty() {
        return Err(ScanError::read(line, "empty address"));
    }
    Ok(address.to_string())
}
