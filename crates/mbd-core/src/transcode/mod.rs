//! Declarative conversion specs and the transcoder capability.
//!
//! The pipeline never builds command lines itself; it describes inputs,
//! per-track codecs, and an output, and a `Transcoder` turns that into work.
//! `FfmpegTranscoder` is the production implementation.

mod ffmpeg;

pub use ffmpeg::{build_args, parse_ffmpeg_time, probe_duration, FfmpegTranscoder};

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Stream copy, no re-encode.
    Copy,
    H264,
    Mp3,
    Aac,
    Png,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Where an output track's stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    /// First stream of `TrackSpec::kind` in input `n`.
    Input(usize),
    /// A labelled output of the filter graph.
    Filter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSpec {
    pub source: StreamSource,
    pub kind: TrackKind,
    pub codec: Codec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3,
    Mp4,
    /// Single still image.
    Png,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSpec {
    pub inputs: Vec<PathBuf>,
    pub tracks: Vec<TrackSpec>,
    /// Filter graph applied before mapping (`-filter_complex`).
    pub filter: Option<String>,
    pub format: OutputFormat,
    pub output: PathBuf,
    pub overwrite: bool,
}

impl ConversionSpec {
    /// Audio track of `input` re-encoded to mp3.
    pub fn extract_mp3(input: &Path, output: &Path) -> Self {
        Self {
            inputs: vec![input.to_path_buf()],
            tracks: vec![TrackSpec {
                source: StreamSource::Input(0),
                kind: TrackKind::Audio,
                codec: Codec::Mp3,
            }],
            filter: None,
            format: OutputFormat::Mp3,
            output: output.to_path_buf(),
            overwrite: true,
        }
    }

    /// Separate video and audio files combined into one mp4 (h264 + mp3).
    pub fn mux_mp4(video: &Path, audio: &Path, output: &Path) -> Self {
        Self {
            inputs: vec![video.to_path_buf(), audio.to_path_buf()],
            tracks: vec![
                TrackSpec {
                    source: StreamSource::Input(0),
                    kind: TrackKind::Video,
                    codec: Codec::H264,
                },
                TrackSpec {
                    source: StreamSource::Input(1),
                    kind: TrackKind::Audio,
                    codec: Codec::Mp3,
                },
            ],
            filter: None,
            format: OutputFormat::Mp4,
            output: output.to_path_buf(),
            overwrite: true,
        }
    }

    /// Waveform picture of `audio`'s first audio stream.
    pub fn waveform(audio: &Path, output: &Path) -> Self {
        Self {
            inputs: vec![audio.to_path_buf()],
            tracks: vec![TrackSpec {
                source: StreamSource::Filter("wave".to_string()),
                kind: TrackKind::Video,
                codec: Codec::Png,
            }],
            filter: Some("[0:a]showwavespic=s=1280x240:split_channels=1[wave]".to_string()),
            format: OutputFormat::Png,
            output: output.to_path_buf(),
            overwrite: true,
        }
    }

    /// Every track must refer to an existing input.
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.inputs.is_empty() {
            return Err(ConversionError::InvalidSpec("no inputs".into()));
        }
        if self.tracks.is_empty() {
            return Err(ConversionError::InvalidSpec("no output tracks".into()));
        }
        for t in &self.tracks {
            match &t.source {
                StreamSource::Input(n) if *n >= self.inputs.len() => {
                    return Err(ConversionError::InvalidSpec(format!(
                        "track refers to input {} of {}",
                        n,
                        self.inputs.len()
                    )));
                }
                StreamSource::Filter(_) if self.filter.is_none() => {
                    return Err(ConversionError::InvalidSpec(
                        "filter output mapped without a filter graph".into(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// How far a running conversion has got.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionProgress {
    pub processed: Duration,
    /// Input duration, when it could be probed.
    pub total: Option<Duration>,
}

impl ConversionProgress {
    /// 0-100, or `None` without a known total.
    pub fn percent(&self) -> Option<f64> {
        let total = self.total?.as_secs_f64();
        if total <= 0.0 {
            return None;
        }
        Some((self.processed.as_secs_f64() / total * 100.0).clamp(0.0, 100.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("invalid conversion spec: {0}")]
    InvalidSpec(String),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("transcoder exited with {}: {stderr_tail}", exit_label(.status))]
    Failed {
        status: Option<i32>,
        stderr_tail: String,
    },
    #[error("transcoder io: {0}")]
    Io(#[from] io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Narrow conversion capability. Blocking; the pipeline calls it from
/// `spawn_blocking`.
pub trait Transcoder: Send + Sync {
    fn convert(
        &self,
        spec: &ConversionSpec,
        on_progress: &mut dyn FnMut(ConversionProgress),
    ) -> Result<(), ConversionError>;
}
