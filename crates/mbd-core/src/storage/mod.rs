//! Destination files for fetches.
//!
//! Files are created (or truncated) up front, optionally preallocated
//! (fallocate on Unix, else set_len), written strictly front to back, and
//! synced before the caller promotes them to their final name.

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

use std::io;
use std::path::Path;

/// Rename a finished intermediate to its final artifact path.
///
/// Both paths live under the same output root, so this is an atomic rename.
pub fn promote(temp_path: &Path, final_path: &Path) -> io::Result<()> {
    std::fs::rename(temp_path, final_path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ),
        )
    })
}
