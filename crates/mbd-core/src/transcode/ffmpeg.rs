//! ffmpeg-backed transcoder.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use super::{
    Codec, ConversionError, ConversionProgress, ConversionSpec, OutputFormat, StreamSource,
    TrackKind, Transcoder,
};

const STDERR_TAIL_LINES: usize = 12;

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

fn codec_name(codec: Codec) -> &'static str {
    match codec {
        Codec::Copy => "copy",
        Codec::H264 => "libx264",
        Codec::Mp3 => "libmp3lame",
        Codec::Aac => "aac",
        Codec::Png => "png",
    }
}

/// ffmpeg argument vector for `spec` (without the program name).
pub fn build_args(spec: &ConversionSpec) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-nostdin".into()];
    args.push(if spec.overwrite { "-y" } else { "-n" }.into());

    for input in &spec.inputs {
        args.push("-i".into());
        args.push(input.clone().into_os_string());
    }
    if let Some(graph) = &spec.filter {
        args.push("-filter_complex".into());
        args.push(graph.into());
    }

    let (mut audio_idx, mut video_idx) = (0usize, 0usize);
    for track in &spec.tracks {
        let (letter, idx) = match track.kind {
            TrackKind::Audio => ("a", &mut audio_idx),
            TrackKind::Video => ("v", &mut video_idx),
        };
        args.push("-map".into());
        args.push(match &track.source {
            StreamSource::Input(n) => format!("{}:{}:0", n, letter),
            StreamSource::Filter(label) => format!("[{}]", label),
        }
        .into());
        args.push(format!("-c:{}:{}", letter, idx).into());
        args.push(codec_name(track.codec).into());
        if track.codec == Codec::Mp3 {
            args.push(format!("-q:{}:{}", letter, idx).into());
            args.push("2".into());
        }
        *idx += 1;
    }

    let output_flags: &[&str] = match spec.format {
        OutputFormat::Mp3 => &["-f", "mp3"],
        OutputFormat::Mp4 => &["-f", "mp4"],
        OutputFormat::Png => &["-frames:v", "1", "-update", "1", "-f", "image2"],
    };
    args.extend(output_flags.iter().map(|a| OsString::from(*a)));
    args.push(spec.output.clone().into_os_string());
    args
}

/// Parse ffmpeg's `HH:MM:SS.ss` clock.
pub fn parse_ffmpeg_time(s: &str) -> Option<Duration> {
    let mut parts = s.trim().split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let sec: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let total = h * 3600.0 + m * 60.0 + sec;
    (total.is_finite() && total >= 0.0).then(|| Duration::from_secs_f64(total))
}

/// `time=` value from an ffmpeg stats line.
fn progress_time(line: &str) -> Option<Duration> {
    let idx = line.find("time=")?;
    let value = line[idx + 5..].split_whitespace().next()?;
    parse_ffmpeg_time(value)
}

/// Media duration via ffprobe; `None` if ffprobe is missing or unsure.
pub fn probe_duration(ffprobe: &str, path: &Path) -> Option<Duration> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let secs: f64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}

/// Feed every `\r`- or `\n`-terminated line of `reader` to `f`. ffmpeg ends
/// its stats lines with `\r`.
fn for_each_line<R: Read>(reader: R, mut f: impl FnMut(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let n = buf.len();
        for &b in buf {
            if b == b'\r' || b == b'\n' {
                if !line.is_empty() {
                    f(&String::from_utf8_lossy(&line));
                    line.clear();
                }
            } else {
                line.push(b);
            }
        }
        reader.consume(n);
    }
    if !line.is_empty() {
        f(&String::from_utf8_lossy(&line));
    }
    Ok(())
}

impl Transcoder for FfmpegTranscoder {
    fn convert(
        &self,
        spec: &ConversionSpec,
        on_progress: &mut dyn FnMut(ConversionProgress),
    ) -> Result<(), ConversionError> {
        spec.validate()?;
        let total = spec
            .inputs
            .first()
            .and_then(|p| probe_duration(&self.ffprobe, p));
        let args = build_args(spec);
        tracing::debug!(program = %self.ffmpeg, ?args, "running transcoder");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: self.ffmpeg.clone(),
                source,
            })?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = child.stderr.take() {
            for_each_line(stderr, |line| match progress_time(line) {
                Some(processed) => on_progress(ConversionProgress { processed, total }),
                None => {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
            })?;
        }

        let status = child.wait()?;
        if !status.success() {
            let _ = fs::remove_file(&spec.output);
            return Err(ConversionError::Failed {
                status: status.code(),
                stderr_tail: tail.into_iter().collect::<Vec<_>>().join("\n"),
            });
        }
        Ok(())
    }
}
