//! Byte sources: the per-variant handle the fetcher pulls bytes from.
//!
//! Sources are blocking (libcurl easy handles); async callers run them inside
//! `tokio::task::spawn_blocking`.

mod error;
mod head;
mod http;
mod memory;

pub use error::SourceError;
pub use head::{parse_headers, Probe};
pub use http::{fetch_bytes, HttpSource, TransferOptions};
pub use memory::MemorySource;

use std::fmt;
use std::io;

use crate::segmenter::Segment;

/// Receives body bytes in arrival order. An error aborts the transfer.
pub type Sink<'a> = dyn FnMut(&[u8]) -> io::Result<()> + 'a;

/// Opaque handle able to stream one variant's bytes.
pub trait ByteSource: Send + Sync + fmt::Debug {
    /// Ask the remote for the content length and range support without
    /// transferring the body.
    fn probe(&self) -> Result<Probe, SourceError>;

    /// Stream the body (or only `range`) into `sink`, returning the number of
    /// bytes delivered.
    fn copy_to(&self, range: Option<Segment>, sink: &mut Sink<'_>) -> Result<u64, SourceError>;
}
