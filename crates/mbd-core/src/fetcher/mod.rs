//! Copies one variant's bytes into a local file.
//!
//! Two modes:
//! - **Sequential**: one request for the whole body, flushed to disk every
//!   `buffer_size` bytes. Used for small or unknown-length bodies and for
//!   servers without range support.
//! - **Segmented**: when the declared length is larger than one chunk and the
//!   server honours ranges, the body is cut into `chunk_size` ranges that are
//!   requested one at a time in ascending order. Each segment is buffered and
//!   written only once complete, so a retried segment never rewrites bytes
//!   that are already on disk.
//!
//! Either way, the destination is created (truncated) before the first byte
//! and closed on every exit path. A failed fetch leaves the partial file for
//! the caller to remove.

mod segmented;
mod sequential;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::FailureKind;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::segmenter::Segment;
use crate::source::{ByteSource, SourceError};
use crate::storage::StorageWriterBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Bytes per ranged request in segmented mode.
    pub chunk_size: u64,
    /// Flush granularity in sequential mode.
    pub buffer_size: usize,
    /// Applied per segment and to the length probe.
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 10_485_760,
            buffer_size: 2 * 1024 * 1024,
            retry: RetryPolicy::default(),
        }
    }
}

/// Byte-level progress, reported after every flush to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    pub bytes_done: u64,
    /// `None` when the length is unknown and the fetch is unbounded.
    pub total_bytes: Option<u64>,
}

impl FetchProgress {
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(t) if t > 0 => Some((self.bytes_done as f64 / t as f64).min(1.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Sequential,
    Segmented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub bytes: u64,
    pub mode: FetchMode,
    /// Ranged requests issued (excluding retries); 1 for sequential.
    pub segments: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("content length is zero or could not be obtained")]
    EmptyContent,
    #[error("segment {index} {range}: {source}")]
    SegmentFailed {
        index: usize,
        range: Segment,
        #[source]
        source: SourceError,
    },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("fetch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl FetchError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            FetchError::EmptyContent => FailureKind::EmptyContent,
            FetchError::SegmentFailed { source, .. } | FetchError::Source(source) => {
                source.failure_kind()
            }
            FetchError::Storage { .. } => FailureKind::Io,
            FetchError::Join(_) => FailureKind::Internal,
        }
    }

    fn storage(path: &Path) -> impl FnOnce(io::Error) -> FetchError + '_ {
        move |source| FetchError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One in-flight fetch. Lives only for the duration of a `fetch_blocking` call.
#[derive(Debug)]
struct DownloadTask {
    total: Option<u64>,
    transferred: u64,
}

impl DownloadTask {
    fn advance(&mut self, n: u64) -> FetchProgress {
        self.transferred += n;
        FetchProgress {
            bytes_done: self.transferred,
            total_bytes: self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Sequential { total: Option<u64> },
    Segmented { total: u64 },
}

/// Decide the mode from the declared length, probing the server only when
/// the body is big enough to be split.
fn plan(source: &dyn ByteSource, declared: Option<u64>, opts: &FetchOptions) -> Result<Plan, FetchError> {
    match declared {
        Some(0) => Err(FetchError::EmptyContent),
        Some(n) if n > opts.chunk_size => {
            let probe = run_with_retry(&opts.retry, || source.probe())?;
            match probe.content_length {
                None | Some(0) => Err(FetchError::EmptyContent),
                Some(total) if probe.accept_ranges => Ok(Plan::Segmented { total }),
                Some(total) => Ok(Plan::Sequential { total: Some(total) }),
            }
        }
        other => Ok(Plan::Sequential { total: other }),
    }
}

/// Blocking fetch of `source` into `dest`. `declared` is the size the
/// discovery backend advertised (`None` = unknown).
pub fn fetch_blocking(
    source: &dyn ByteSource,
    declared: Option<u64>,
    dest: &Path,
    opts: &FetchOptions,
    on_progress: &mut dyn FnMut(FetchProgress),
) -> Result<FetchReport, FetchError> {
    let plan = plan(source, declared, opts)?;
    tracing::debug!(dest = %dest.display(), ?plan, "fetch starting");

    let mut builder = StorageWriterBuilder::create(dest).map_err(FetchError::storage(dest))?;
    let report = match plan {
        Plan::Sequential { total } => {
            let mut writer = builder.build();
            let mut task = DownloadTask { total, transferred: 0 };
            let bytes = sequential::run(source, &mut writer, &mut task, opts.buffer_size, on_progress)?;
            writer.sync().map_err(FetchError::storage(dest))?;
            FetchReport {
                bytes,
                mode: FetchMode::Sequential,
                segments: 1,
            }
        }
        Plan::Segmented { total } => {
            builder.preallocate(total).map_err(FetchError::storage(dest))?;
            let mut writer = builder.build();
            let mut task = DownloadTask {
                total: Some(total),
                transferred: 0,
            };
            let segments = segmented::run(source, &mut writer, &mut task, opts, on_progress)?;
            writer.sync().map_err(FetchError::storage(dest))?;
            FetchReport {
                bytes: writer.written(),
                mode: FetchMode::Segmented,
                segments,
            }
        }
    };

    tracing::info!(dest = %dest.display(), bytes = report.bytes, mode = ?report.mode, "fetch complete");
    Ok(report)
}

/// Async entry point: runs `fetch_blocking` on the blocking pool.
pub async fn fetch<P>(
    source: Arc<dyn ByteSource>,
    declared: Option<u64>,
    dest: PathBuf,
    opts: FetchOptions,
    mut on_progress: P,
) -> Result<FetchReport, FetchError>
where
    P: FnMut(FetchProgress) + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        fetch_blocking(source.as_ref(), declared, &dest, &opts, &mut on_progress)
    })
    .await?
}
