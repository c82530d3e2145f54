//! Front-to-back writer for destination files.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Writer that only accepts data at the current end of what it has written,
/// so bytes land in strictly ascending offset order. The file is closed when
/// the writer is dropped, on success and failure alike.
pub struct StorageWriter {
    file: File,
    path: PathBuf,
    written: u64,
}

impl StorageWriter {
    pub(crate) fn new(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            written: 0,
        }
    }

    /// Write `data` at `offset`, which must equal `written()`.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        if offset != self.written {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "out-of-order write to {}: offset {} but {} bytes written",
                    self.path.display(),
                    offset,
                    self.written
                ),
            ));
        }
        self.write_raw(offset, data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Write `data` right after everything written so far.
    pub fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_at(self.written, data)
    }

    #[cfg(unix)]
    fn write_raw(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    #[cfg(not(unix))]
    fn write_raw(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom};
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)
    }

    /// Bytes written so far; also the offset of the next write.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and sync file data to disk.
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
