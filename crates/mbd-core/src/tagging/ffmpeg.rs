//! Tag writer that rewrites the mp3 through ffmpeg with stream copy.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{CoverArt, TagError, TagHandle, Tagger};

#[derive(Debug, Clone)]
pub struct FfmpegTagger {
    ffmpeg: String,
}

impl FfmpegTagger {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl Tagger for FfmpegTagger {
    fn open(&self, path: &Path) -> Result<Box<dyn TagHandle>, TagError> {
        fs::metadata(path).map_err(|source| TagError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Box::new(FfmpegTagHandle {
            ffmpeg: self.ffmpeg.clone(),
            path: path.to_path_buf(),
            performers: Vec::new(),
            title: None,
            cover: None,
        }))
    }
}

struct FfmpegTagHandle {
    ffmpeg: String,
    path: PathBuf,
    performers: Vec<String>,
    title: Option<String>,
    cover: Option<CoverArt>,
}

impl FfmpegTagHandle {
    fn is_dirty(&self) -> bool {
        !self.performers.is_empty() || self.title.is_some() || self.cover.is_some()
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(suffix);
    PathBuf::from(o)
}

/// ffmpeg arguments that copy `input`'s audio into `output` with the given
/// tags, adding `cover` as the front-cover picture when present.
pub fn tag_args(
    input: &Path,
    cover: Option<&Path>,
    performers: &[String],
    title: Option<&str>,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(input.into());
    if let Some(c) = cover {
        args.push("-i".into());
        args.push(c.into());
    }
    args.extend(["-map", "0:a"].iter().map(OsString::from));
    if cover.is_some() {
        args.extend(["-map", "1:0"].iter().map(OsString::from));
    }
    args.extend(["-c", "copy", "-id3v2_version", "3"].iter().map(OsString::from));
    if cover.is_some() {
        args.extend(
            [
                "-metadata:s:v",
                "title=Album cover",
                "-metadata:s:v",
                "comment=Cover (front)",
            ]
            .iter()
            .map(OsString::from),
        );
    }
    if !performers.is_empty() {
        args.push("-metadata".into());
        args.push(format!("artist={}", performers.join("; ")).into());
    }
    if let Some(t) = title {
        args.push("-metadata".into());
        args.push(format!("title={}", t).into());
    }
    args.extend(["-f", "mp3"].iter().map(OsString::from));
    args.push(output.into());
    args
}

impl TagHandle for FfmpegTagHandle {
    fn set_performers(&mut self, performers: &[String]) {
        self.performers = performers.to_vec();
    }

    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    fn set_cover_art(&mut self, art: CoverArt) {
        self.cover = Some(art);
    }

    fn save(self: Box<Self>) -> Result<(), TagError> {
        if !self.is_dirty() {
            return Ok(());
        }
        let cover_path = match &self.cover {
            Some(art) => {
                let p = sibling(&self.path, &format!(".cover.{}", art.extension()));
                fs::write(&p, &art.data)?;
                Some(p)
            }
            None => None,
        };
        let tagged = sibling(&self.path, ".tagged.part");
        let args = tag_args(
            &self.path,
            cover_path.as_deref(),
            &self.performers,
            self.title.as_deref(),
            &tagged,
        );

        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();
        if let Some(p) = &cover_path {
            let _ = fs::remove_file(p);
        }

        let failure = match output {
            Ok(out) if out.status.success() => None,
            Ok(out) => Some(
                String::from_utf8_lossy(&out.stderr)
                    .lines()
                    .last()
                    .unwrap_or("ffmpeg failed")
                    .to_string(),
            ),
            Err(e) => Some(format!("failed to start {}: {}", self.ffmpeg, e)),
        };
        if let Some(message) = failure {
            let _ = fs::remove_file(&tagged);
            return Err(TagError::Save {
                path: self.path.clone(),
                message,
            });
        }

        fs::rename(&tagged, &self.path)?;
        tracing::debug!(path = %self.path.display(), "tags saved");
        Ok(())
    }
}
