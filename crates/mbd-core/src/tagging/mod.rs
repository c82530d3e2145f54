//! Metadata tagging of audio artifacts.
//!
//! A `Tagger` opens a `TagHandle` on a file; edits are collected on the handle
//! and written by `save`. `TagSession` wraps a handle so that it is saved on
//! every exit path: explicitly through `TagSession::save`, or from `Drop`
//! when the caller bails out early.

mod cover;
mod ffmpeg;

pub use cover::CoverArt;
pub use ffmpeg::{tag_args, FfmpegTagger};

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("cannot open {} for tagging: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to save tags to {}: {message}", .path.display())]
    Save { path: PathBuf, message: String },
    #[error("tagging io: {0}")]
    Io(#[from] io::Error),
}

pub trait TagHandle: Send {
    fn set_performers(&mut self, performers: &[String]);
    fn set_title(&mut self, title: &str);
    fn set_cover_art(&mut self, art: CoverArt);
    /// Persist pending edits. Consumes the handle.
    fn save(self: Box<Self>) -> Result<(), TagError>;
}

pub trait Tagger: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn TagHandle>, TagError>;
}

/// Scoped tag handle: saved exactly once, by `save` or on drop.
pub struct TagSession {
    path: PathBuf,
    handle: Option<Box<dyn TagHandle>>,
}

impl TagSession {
    pub fn open(tagger: &dyn Tagger, path: &Path) -> Result<Self, TagError> {
        let handle = tagger.open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            handle: Some(handle),
        })
    }

    pub fn set_performers(&mut self, performers: &[String]) {
        if let Some(h) = self.handle.as_mut() {
            h.set_performers(performers);
        }
    }

    pub fn set_title(&mut self, title: &str) {
        if let Some(h) = self.handle.as_mut() {
            h.set_title(title);
        }
    }

    pub fn set_cover_art(&mut self, art: CoverArt) {
        if let Some(h) = self.handle.as_mut() {
            h.set_cover_art(art);
        }
    }

    pub fn save(mut self) -> Result<(), TagError> {
        match self.handle.take() {
            Some(h) => h.save(),
            None => Ok(()),
        }
    }
}

impl Drop for TagSession {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            if let Err(e) = h.save() {
                tracing::warn!(path = %self.path.display(), error = %e, "saving tags on early exit failed");
            }
        }
    }
}
