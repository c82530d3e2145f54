//! One requested download unit and the policy it is selected with.

/// What the user wants produced for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Tagged `.mp3` only.
    Audio,
    /// `.mp4` only.
    Video,
    /// `.mp4` plus a tagged `.mp3`.
    Both,
}

/// Selection and post-processing knobs; identical for every item of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPolicy {
    /// Maximum vertical resolution for video-only picks.
    pub resolution_ceiling: u32,
    /// Prefer a single progressive stream over split audio+video.
    pub prefer_progressive: bool,
    /// Prefer the best audio-only stream for audio output.
    pub prefer_audio_quality: bool,
    /// Also render a waveform image from the tagged audio.
    pub derive_waveform: bool,
}

impl Default for ItemPolicy {
    fn default() -> Self {
        Self {
            resolution_ceiling: 1080,
            prefer_progressive: true,
            prefer_audio_quality: false,
            derive_waveform: false,
        }
    }
}

/// Immutable once built from the batch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Position in the batch; used for fallback names and scratch directories.
    pub index: usize,
    /// Source URL.
    pub source: String,
    pub kind: OutputKind,
    pub policy: ItemPolicy,
}

impl Item {
    pub fn new(index: usize, source: impl Into<String>, kind: OutputKind, policy: ItemPolicy) -> Self {
        Self {
            index,
            source: source.into(),
            kind,
            policy,
        }
    }

    /// True when this item yields an audio artifact that goes through tagging.
    pub fn wants_audio(&self) -> bool {
        matches!(self.kind, OutputKind::Audio | OutputKind::Both)
    }

    pub fn wants_video(&self) -> bool {
        matches!(self.kind, OutputKind::Video | OutputKind::Both)
    }
}
