//! Discovery through `yt-dlp -J`.

use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{Discover, DiscoveryError, MediaInfo};
use crate::source::{HttpSource, TransferOptions};
use crate::variant::{AudioCodec, Container, Variant};

#[derive(Debug, Clone)]
pub struct YtDlpDiscovery {
    program: String,
    socket_timeout: Duration,
    transfer: TransferOptions,
}

impl YtDlpDiscovery {
    pub fn new(program: impl Into<String>, transfer: TransferOptions) -> Self {
        Self {
            program: program.into(),
            socket_timeout: transfer.connect_timeout,
            transfer,
        }
    }
}

impl Discover for YtDlpDiscovery {
    fn discover(&self, source: &str) -> Result<MediaInfo, DiscoveryError> {
        tracing::debug!(url = %source, program = %self.program, "discovering variants");
        let output = Command::new(&self.program)
            .args(["-J", "--no-playlist", "--no-warnings", "--socket-timeout"])
            .arg(self.socket_timeout.as_secs().max(1).to_string())
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DiscoveryError::Failed(format!("failed to start {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(classify_stderr(&String::from_utf8_lossy(&output.stderr)));
        }
        parse_info_json(&output.stdout, &self.transfer)
    }
}

/// Map yt-dlp's error output onto the discovery error classes.
pub fn classify_stderr(stderr: &str) -> DiscoveryError {
    let last = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("yt-dlp failed")
        .trim()
        .to_string();
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("timed out") {
        DiscoveryError::Timeout(last)
    } else if ["private video", "unavailable", "not available", "http error 403", "sign in"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        DiscoveryError::Unavailable(last)
    } else {
        DiscoveryError::Failed(last)
    }
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    url: Option<String>,
    protocol: Option<String>,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<f64>,
    abr: Option<f64>,
    tbr: Option<f64>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

fn present(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| c != "none")
}

fn container_for(ext: Option<&str>) -> Container {
    match ext {
        Some("mp4") => Container::Mp4,
        Some("webm") => Container::WebM,
        _ => Container::Other,
    }
}

fn audio_codec_for(acodec: &str) -> AudioCodec {
    let a = acodec.to_ascii_lowercase();
    if a.starts_with("mp4a") || a == "aac" {
        AudioCodec::Aac
    } else if a == "mp3" {
        AudioCodec::Mp3
    } else if a == "vorbis" {
        AudioCodec::Vorbis
    } else if a == "opus" {
        AudioCodec::Opus
    } else {
        AudioCodec::Other
    }
}

fn positive(n: Option<f64>) -> Option<u64> {
    n.filter(|v| v.is_finite() && *v > 0.0).map(|v| v.round() as u64)
}

fn to_variant(f: RawFormat, transfer: &TransferOptions) -> Option<Variant> {
    let url = f.url?;
    // Direct downloads only; manifests (m3u8, dash) need a different fetcher.
    if !matches!(f.protocol.as_deref(), None | Some("http") | Some("https")) {
        return None;
    }
    let has_video = present(&f.vcodec);
    let has_audio = present(&f.acodec);
    if !has_video && !has_audio {
        return None;
    }

    let container = if has_video {
        container_for(f.ext.as_deref())
    } else {
        Container::None
    };
    let audio = match f.acodec.as_deref() {
        Some(a) if has_audio => audio_codec_for(a),
        _ => AudioCodec::None,
    };
    let audio_bitrate = if has_audio {
        positive(f.abr.or(if has_video { None } else { f.tbr })).map(|b| b as u32)
    } else {
        None
    };
    let headers: Vec<(String, String)> = f.http_headers.into_iter().collect();

    Some(Variant {
        format_id: f.format_id.unwrap_or_default(),
        container,
        audio,
        resolution: if has_video {
            positive(f.height).map(|h| h as u32)
        } else {
            None
        },
        audio_bitrate,
        content_length: positive(f.filesize).or(positive(f.filesize_approx)),
        source: Arc::new(HttpSource::new(url, *transfer).with_headers(headers)),
    })
}

/// Parse `yt-dlp -J` output into a `MediaInfo`. Formats that cannot be
/// fetched directly (no URL, manifest protocols, storyboards) are dropped.
pub fn parse_info_json(json: &[u8], transfer: &TransferOptions) -> Result<MediaInfo, DiscoveryError> {
    let raw: RawInfo = serde_json::from_slice(json)
        .map_err(|e| DiscoveryError::Failed(format!("invalid yt-dlp json: {}", e)))?;
    let variants: Vec<Variant> = raw
        .formats
        .into_iter()
        .filter_map(|f| to_variant(f, transfer))
        .collect();
    Ok(MediaInfo {
        title: raw.title.unwrap_or_default(),
        author: raw.uploader.or(raw.channel),
        variants,
    })
}
