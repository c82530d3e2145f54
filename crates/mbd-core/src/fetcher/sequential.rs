//! Single-request fetch, flushed in `buffer_size` increments.

use std::io;

use super::{DownloadTask, FetchError, FetchProgress};
use crate::source::ByteSource;
use crate::storage::StorageWriter;

pub(super) fn run(
    source: &dyn ByteSource,
    writer: &mut StorageWriter,
    task: &mut DownloadTask,
    buffer_size: usize,
    on_progress: &mut dyn FnMut(FetchProgress),
) -> Result<u64, FetchError> {
    let mut buf: Vec<u8> = Vec::with_capacity(buffer_size);
    let mut sink = |data: &[u8]| -> io::Result<()> {
        buf.extend_from_slice(data);
        if buf.len() >= buffer_size {
            writer.append(&buf)?;
            on_progress(task.advance(buf.len() as u64));
            buf.clear();
        }
        Ok(())
    };
    source.copy_to(None, &mut sink)?;

    if !buf.is_empty() {
        writer
            .append(&buf)
            .map_err(FetchError::storage(writer.path()))?;
        on_progress(task.advance(buf.len() as u64));
    }
    Ok(writer.written())
}
