//! In-memory byte source, for bytes already held by the process and for
//! exercising the fetcher without a network.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::head::Probe;
use super::{ByteSource, Sink, SourceError};
use crate::segmenter::Segment;

#[derive(Debug)]
pub struct MemorySource {
    data: Vec<u8>,
    accept_ranges: bool,
    /// Size of each slice handed to the sink.
    delivery: usize,
    /// Remaining `copy_to` calls that fail with `failure_status`.
    failures_left: AtomicU32,
    failure_status: u32,
    requests: Mutex<Vec<Option<Segment>>>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            accept_ranges: true,
            delivery: 64 * 1024,
            failures_left: AtomicU32::new(0),
            failure_status: 503,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_accept_ranges(mut self, accept: bool) -> Self {
        self.accept_ranges = accept;
        self
    }

    pub fn with_delivery_size(mut self, size: usize) -> Self {
        self.delivery = size.max(1);
        self
    }

    /// Make the next `times` transfers fail with HTTP `status`.
    pub fn failing(self, times: u32, status: u32) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        Self {
            failure_status: status,
            ..self
        }
    }

    /// Every range requested so far, in request order (`None` = whole body).
    pub fn requests(&self) -> Vec<Option<Segment>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ByteSource for MemorySource {
    fn probe(&self) -> Result<Probe, SourceError> {
        Ok(Probe {
            content_length: Some(self.data.len() as u64),
            accept_ranges: self.accept_ranges,
        })
    }

    fn copy_to(&self, range: Option<Segment>, sink: &mut Sink<'_>) -> Result<u64, SourceError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(range);
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SourceError::Http(self.failure_status));
        }

        let len = self.data.len() as u64;
        let body = match range {
            Some(_) if !self.accept_ranges => return Err(SourceError::RangeIgnored(200)),
            Some(seg) if seg.start >= len => return Err(SourceError::Http(416)),
            Some(seg) => &self.data[seg.start as usize..seg.end.min(len) as usize],
            None => &self.data[..],
        };

        let mut delivered = 0u64;
        for piece in body.chunks(self.delivery) {
            sink(piece).map_err(SourceError::Storage)?;
            delivered += piece.len() as u64;
        }
        Ok(delivered)
    }
}
