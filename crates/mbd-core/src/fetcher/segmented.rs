//! Ranged fetch: fixed-size segments, one at a time, ascending.

use super::{DownloadTask, FetchError, FetchOptions, FetchProgress};
use crate::retry::run_with_retry;
use crate::segmenter::{plan_chunks, Segment};
use crate::source::{ByteSource, SourceError};
use crate::storage::StorageWriter;

/// Returns the number of segments fetched.
pub(super) fn run(
    source: &dyn ByteSource,
    writer: &mut StorageWriter,
    task: &mut DownloadTask,
    opts: &FetchOptions,
    on_progress: &mut dyn FnMut(FetchProgress),
) -> Result<usize, FetchError> {
    let total = task.total.unwrap_or(0);
    let segments = plan_chunks(total, opts.chunk_size);

    for (index, seg) in segments.iter().copied().enumerate() {
        let bytes = run_with_retry(&opts.retry, || fetch_segment(source, seg)).map_err(|source| {
            FetchError::SegmentFailed {
                index,
                range: seg,
                source,
            }
        })?;
        writer
            .write_at(seg.start, &bytes)
            .map_err(FetchError::storage(writer.path()))?;
        tracing::debug!(index, range = %seg, "segment written");
        on_progress(task.advance(bytes.len() as u64));
    }
    Ok(segments.len())
}

fn fetch_segment(source: &dyn ByteSource, seg: Segment) -> Result<Vec<u8>, SourceError> {
    let mut buf = Vec::with_capacity(seg.len() as usize);
    let received = source.copy_to(Some(seg), &mut |data: &[u8]| -> std::io::Result<()> {
        buf.extend_from_slice(data);
        Ok(())
    })?;
    if received != seg.len() {
        return Err(SourceError::PartialTransfer {
            expected: seg.len(),
            received,
        });
    }
    Ok(buf)
}
