//! Segment type and fixed-size chunk planning.

use std::fmt;

/// A single segment: byte range [start, end) (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl Segment {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// libcurl range spec (inclusive end): `start-(end-1)`.
    pub fn curl_range(&self) -> String {
        if self.is_empty() {
            "0-0".to_string()
        } else {
            format!("{}-{}", self.start, self.end - 1)
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Cuts `total_size` bytes into consecutive `chunk_size` ranges, in ascending
/// offset order. The last segment holds the remainder.
///
/// Returns an empty vec if either argument is 0.
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Vec<Segment> {
    if total_size == 0 || chunk_size == 0 {
        return Vec::new();
    }

    let count = total_size.div_ceil(chunk_size);
    let mut out = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    while offset < total_size {
        let end = offset.saturating_add(chunk_size).min(total_size);
        out.push(Segment { start: offset, end });
        offset = end;
    }
    out
}
