//! Builder for creating and preallocating destination files.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use super::writer::StorageWriter;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Builder for a destination file. Call `preallocate` (when the size is known)
/// then `build` to get the ordered `StorageWriter`.
pub struct StorageWriterBuilder {
    file: File,
    path: PathBuf,
}

impl StorageWriterBuilder {
    /// Create a new file at `path`, truncating anything already there.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                io::Error::new(e.kind(), format!("failed to create {}: {}", path.display(), e))
            })?;
        Ok(StorageWriterBuilder {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Preallocate `size` bytes. On Unix tries `posix_fallocate` first and
    /// falls back to `set_len` on failure or non-Unix.
    pub fn preallocate(&mut self, size: u64) -> io::Result<()> {
        #[cfg(unix)]
        {
            let fd = self.file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, path = %self.path.display(), "posix_fallocate failed, falling back to set_len");
        }
        self.file.set_len(size)
    }

    pub fn build(self) -> StorageWriter {
        StorageWriter::new(self.file, self.path)
    }
}
