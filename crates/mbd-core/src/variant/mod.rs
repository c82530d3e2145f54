//! Items (what the user asked for) and variants (what the remote offers).
//!
//! Variants are supplied by a discovery backend and never mutated here; the
//! selector only filters and ranks them.

mod item;

pub use item::{Item, ItemPolicy, OutputKind};

use std::fmt;
use std::sync::Arc;

use crate::source::ByteSource;

/// Container/video component of a variant. The declaration order is the
/// ordinal space used by the progressive allow-list (`code`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Mp4,
    WebM,
    Other,
    /// No video component (audio-only variant).
    None,
}

impl Container {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn extension(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::WebM => "webm",
            Container::Other | Container::None => "bin",
        }
    }
}

/// Audio component of a variant, in the same ordinal scheme as `Container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCodec {
    Mp3,
    Aac,
    Vorbis,
    Opus,
    Other,
    /// No audio component (video-only variant).
    None,
}

impl AudioCodec {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Aac => "m4a",
            AudioCodec::Vorbis => "ogg",
            AudioCodec::Opus => "opus",
            AudioCodec::Other | AudioCodec::None => "bin",
        }
    }
}

/// Container codes below this are commonly playable with an embedded audio track.
pub const PROGRESSIVE_CONTAINER_CODE_LIMIT: u8 = 2;
/// Audio codes below this are commonly playable inside those containers.
pub const PROGRESSIVE_AUDIO_CODE_LIMIT: u8 = 3;

/// One fetchable stream choice for an item.
#[derive(Clone)]
pub struct Variant {
    /// Backend identifier for logs (e.g. a yt-dlp `format_id`).
    pub format_id: String,
    pub container: Container,
    pub audio: AudioCodec,
    /// Vertical resolution in pixels, if the variant carries video.
    pub resolution: Option<u32>,
    /// Audio bitrate in kbit/s, if known.
    pub audio_bitrate: Option<u32>,
    /// Declared size in bytes; `None` means unknown (treated as unbounded).
    pub content_length: Option<u64>,
    pub source: Arc<dyn ByteSource>,
}

impl Variant {
    pub fn has_video(&self) -> bool {
        self.container != Container::None
    }

    pub fn has_audio(&self) -> bool {
        self.audio != AudioCodec::None
    }

    pub fn is_audio_only(&self) -> bool {
        !self.has_video() && self.has_audio()
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    /// Carries both components in an allow-listed, commonly playable combination.
    pub fn is_progressive(&self) -> bool {
        self.container.code() < PROGRESSIVE_CONTAINER_CODE_LIMIT
            && self.audio.code() < PROGRESSIVE_AUDIO_CODE_LIMIT
    }

    /// Extension for a local copy of this variant's bytes.
    pub fn file_extension(&self) -> &'static str {
        if self.has_video() {
            self.container.extension()
        } else {
            self.audio.extension()
        }
    }

    /// Short classification label for tables and logs.
    pub fn classification(&self) -> &'static str {
        if self.is_progressive() {
            "progressive"
        } else if self.is_audio_only() {
            "audio-only"
        } else if self.is_video_only() {
            "video-only"
        } else if self.has_video() {
            "muxed"
        } else {
            "empty"
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("format_id", &self.format_id)
            .field("container", &self.container)
            .field("audio", &self.audio)
            .field("resolution", &self.resolution)
            .field("audio_bitrate", &self.audio_bitrate)
            .field("content_length", &self.content_length)
            .finish()
    }
}
