//! In-process stand-ins for the external collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mbd_core::discovery::{Discover, DiscoveryError, MediaInfo};
use mbd_core::helper::{CoverArtSource, HelperError, PlaylistInfo, PlaylistResolver};
use mbd_core::pipeline::Toolkit;
use mbd_core::source::{MemorySource, SourceError};
use mbd_core::tagging::{CoverArt, TagError, TagHandle, Tagger};
use mbd_core::transcode::{ConversionError, ConversionProgress, ConversionSpec, OutputFormat, Transcoder};
use mbd_core::variant::{AudioCodec, Container, Variant};

pub fn variant(
    format_id: &str,
    container: Container,
    audio: AudioCodec,
    resolution: Option<u32>,
    audio_bitrate: Option<u32>,
    body: &[u8],
) -> Variant {
    Variant {
        format_id: format_id.to_string(),
        container,
        audio,
        resolution,
        audio_bitrate,
        content_length: Some(body.len() as u64),
        source: Arc::new(MemorySource::new(body.to_vec())),
    }
}

/// Typical listing: two audio-only, video-only up to 1080p, one 360p progressive.
pub fn typical_variants() -> Vec<Variant> {
    vec![
        variant("140", Container::None, AudioCodec::Aac, None, Some(128), b"audio-128"),
        variant("251", Container::None, AudioCodec::Opus, None, Some(160), b"audio-160"),
        variant("136", Container::Mp4, AudioCodec::None, Some(720), None, b"video-720"),
        variant("137", Container::Mp4, AudioCodec::None, Some(1080), None, b"video-1080"),
        variant("18", Container::Mp4, AudioCodec::Aac, Some(360), Some(96), b"progressive-360"),
    ]
}

pub fn media(title: &str, variants: Vec<Variant>) -> MediaInfo {
    MediaInfo {
        title: title.to_string(),
        author: Some("Some Artist".to_string()),
        variants,
    }
}

/// Discovery answers keyed by source URL; unknown URLs fail.
#[derive(Default)]
pub struct FakeDiscovery {
    answers: HashMap<String, Result<MediaInfo, DiscoveryError>>,
    panics: Vec<String>,
}

impl FakeDiscovery {
    pub fn with(mut self, url: &str, answer: Result<MediaInfo, DiscoveryError>) -> Self {
        self.answers.insert(url.to_string(), answer);
        self
    }

    /// Discovery of `url` panics instead of answering.
    pub fn panicking(mut self, url: &str) -> Self {
        self.panics.push(url.to_string());
        self
    }
}

impl Discover for FakeDiscovery {
    fn discover(&self, source: &str) -> Result<MediaInfo, DiscoveryError> {
        if self.panics.iter().any(|u| u == source) {
            panic!("discovery backend crashed on {}", source);
        }
        self.answers
            .get(source)
            .cloned()
            .unwrap_or_else(|| Err(DiscoveryError::Failed(format!("unknown source {}", source))))
    }
}

pub struct FakePlaylists(pub Option<PlaylistInfo>);

impl PlaylistResolver for FakePlaylists {
    fn resolve(&self, playlist_url: &str) -> Result<PlaylistInfo, HelperError> {
        self.0.clone().ok_or_else(|| HelperError::Request {
            url: playlist_url.to_string(),
            source: SourceError::Http(500),
        })
    }
}

pub struct FakeCovers {
    pub fail: bool,
}

impl CoverArtSource for FakeCovers {
    fn cover_art(&self, item_url: &str) -> Result<CoverArt, HelperError> {
        if self.fail {
            return Err(HelperError::Request {
                url: item_url.to_string(),
                source: SourceError::Http(404),
            });
        }
        Ok(CoverArt::sniff(vec![0xff, 0xd8, 0xff, 0xe0]))
    }
}

/// Writes `converted <format> from <n> inputs` to the output and records
/// every spec. Fails for `fail_on` formats.
#[derive(Default)]
pub struct FakeTranscoder {
    pub fail_on: Vec<OutputFormat>,
    specs: Mutex<Vec<ConversionSpec>>,
}

impl FakeTranscoder {
    pub fn failing_on(format: OutputFormat) -> Self {
        Self {
            fail_on: vec![format],
            ..Self::default()
        }
    }

    pub fn specs(&self) -> Vec<ConversionSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl Transcoder for FakeTranscoder {
    fn convert(
        &self,
        spec: &ConversionSpec,
        on_progress: &mut dyn FnMut(ConversionProgress),
    ) -> Result<(), ConversionError> {
        self.specs.lock().unwrap().push(spec.clone());
        spec.validate()?;
        for input in &spec.inputs {
            if !input.exists() {
                return Err(ConversionError::Failed {
                    status: Some(1),
                    stderr_tail: format!("{}: No such file or directory", input.display()),
                });
            }
        }
        if self.fail_on.contains(&spec.format) {
            return Err(ConversionError::Failed {
                status: Some(1),
                stderr_tail: "Conversion failed!".to_string(),
            });
        }
        on_progress(ConversionProgress {
            processed: std::time::Duration::from_secs(1),
            total: Some(std::time::Duration::from_secs(1)),
        });
        std::fs::write(
            &spec.output,
            format!("converted {:?} from {} inputs", spec.format, spec.inputs.len()),
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTags {
    pub path: PathBuf,
    pub performers: Vec<String>,
    pub title: Option<String>,
    pub cover_mime: Option<String>,
}

/// Records what each saved handle carried.
#[derive(Default)]
pub struct FakeTagger {
    saved: Arc<Mutex<Vec<SavedTags>>>,
}

impl FakeTagger {
    pub fn saved(&self) -> Vec<SavedTags> {
        self.saved.lock().unwrap().clone()
    }
}

struct FakeHandle {
    tags: SavedTags,
    saved: Arc<Mutex<Vec<SavedTags>>>,
}

impl TagHandle for FakeHandle {
    fn set_performers(&mut self, performers: &[String]) {
        self.tags.performers = performers.to_vec();
    }

    fn set_title(&mut self, title: &str) {
        self.tags.title = Some(title.to_string());
    }

    fn set_cover_art(&mut self, art: CoverArt) {
        self.tags.cover_mime = Some(art.mime_type);
    }

    fn save(self: Box<Self>) -> Result<(), TagError> {
        self.saved.lock().unwrap().push(self.tags);
        Ok(())
    }
}

impl Tagger for FakeTagger {
    fn open(&self, path: &Path) -> Result<Box<dyn TagHandle>, TagError> {
        if !path.exists() {
            return Err(TagError::Open {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(Box::new(FakeHandle {
            tags: SavedTags {
                path: path.to_path_buf(),
                performers: Vec::new(),
                title: None,
                cover_mime: None,
            },
            saved: Arc::clone(&self.saved),
        }))
    }
}

/// Fakes plus the toolkit built from them, so tests can inspect the fakes.
pub struct Tools {
    pub transcoder: Arc<FakeTranscoder>,
    pub tagger: Arc<FakeTagger>,
    pub toolkit: Toolkit,
}

pub fn tools(transcoder: FakeTranscoder, covers_fail: bool) -> Tools {
    let transcoder = Arc::new(transcoder);
    let tagger = Arc::new(FakeTagger::default());
    let toolkit = Toolkit {
        transcoder: transcoder.clone(),
        tagger: tagger.clone(),
        covers: Arc::new(FakeCovers { fail: covers_fail }),
    };
    Tools {
        transcoder,
        tagger,
        toolkit,
    }
}
