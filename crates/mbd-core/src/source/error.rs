//! Transport error type shared by byte sources and the retry classifier.

use std::io;

use crate::error::FailureKind;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// The response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// A range was requested but the server answered with the whole body.
    #[error("server ignored range request (HTTP {0})")]
    RangeIgnored(u32),
    /// The transfer ended with a byte count other than the one requested.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// The sink failed (disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] io::Error),
}

impl SourceError {
    /// Project onto the per-item failure taxonomy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SourceError::Curl(e) if e.is_operation_timedout() => FailureKind::TransportTimeout,
            SourceError::Http(401 | 403 | 410 | 451) => FailureKind::UnavailableSource,
            SourceError::Storage(_) => FailureKind::Io,
            _ => FailureKind::TransferFailed,
        }
    }
}
