//! Splitting the address list into per-worker line ranges

use std::fmt;
use std::ops::Range;

/// Contiguous block of zero-based line indices owned by one worker
///
/// Stored as start + length so that an empty block (the `end < start` case)
/// is representable with unsigned indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionRange {
    start: u64,
    len: u64,
}

impl PartitionRange {
    /// Inclusive range `[start, end]`
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            len: end.saturating_sub(start) + u64::from(end >= start),
        }
    }

    /// Range with no lines, positioned at `start`
    pub fn empty(start: u64) -> Self {
        Self { start, len: 0 }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last line of the range, `None` when empty
    pub fn end(&self) -> Option<u64> {
        (self.len > 0).then(|| self.start + self.len - 1)
    }

    /// Inclusive `(start, end)` pair, `None` when empty
    pub fn bounds(&self) -> Option<(u64, u64)> {
        self.end().map(|end| (self.start, end))
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Line indices in increasing order
    pub fn lines(&self) -> Range<u64> {
        self.start..self.start + self.len
    }
}

impl fmt::Display for PartitionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds() {
            Some((start, end)) => write!(f, "[{}, {}]", start, end),
            None => write!(f, "[empty@{}]", self.start),
        }
    }
}

/// Split `count` lines into exactly `parts` contiguous ranges
///
/// Every range holds `count / parts` lines except the last one, which also
/// takes the remainder. With fewer lines than parts each leading range gets
/// a single line and the trailing ranges are empty. Zero lines or zero parts
/// give an empty plan.
pub fn plan_partitions(count: u64, parts: usize) -> Vec<PartitionRange> {
    if parts == 0 || count == 0 {
        return Vec::new();
    }

    let parts = parts as u64;
    let base = count / parts;

    if base == 0 {
        return (0..parts)
            .map(|i| {
                if i < count {
                    PartitionRange { start: i, len: 1 }
                } else {
                    PartitionRange::empty(count)
                }
            })
            .collect();
    }

    (0..parts)
        .map(|i| {
            let start = i * base;
            let end = if i + 1 == parts { count } else { start + base };
            PartitionRange {
                start,
                len: end - start,
            }
        })
        .collect()
}
