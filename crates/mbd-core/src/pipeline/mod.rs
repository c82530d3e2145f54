//! Stage coordinator: drives one item from variant selection to its final
//! artifacts.
//!
//! ```text
//! Selecting → Fetching → {Muxing | Extracting} → Tagging → [Deriving] → Done
//!                 any non-terminal stage ─────────────────────────────→ Failed
//! ```
//!
//! Every error inside the machine is converted into a failed `StageResult`
//! at the item boundary; nothing is propagated to the orchestrator.
//! Intermediates (`*.part`) and the split-fetch scratch directory are removed
//! on every exit path by scoped guards.

mod error;
mod stage;
mod workdir;

pub use error::PipelineError;
pub use stage::{Stage, StageTracker};
pub use workdir::{ScratchFile, TempDirGuard};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::discovery::MediaInfo;
use crate::error::FailureKind;
use crate::fetcher::{self, FetchOptions, FetchReport};
use crate::helper::CoverArtSource;
use crate::naming;
use crate::progress::ProgressAggregator;
use crate::selector::{self, Plan};
use crate::storage;
use crate::tagging::{TagSession, Tagger};
use crate::transcode::{ConversionSpec, Transcoder};
use crate::variant::{Item, Variant};

/// External collaborators used by the stages.
#[derive(Clone)]
pub struct Toolkit {
    pub transcoder: Arc<dyn Transcoder>,
    pub tagger: Arc<dyn Tagger>,
    pub covers: Arc<dyn CoverArtSource>,
}

/// Everything an item's run needs besides the item itself. Shared by all
/// items of a batch.
pub struct PipelineContext {
    /// Directory artifacts are written to (the playlist directory for playlists).
    pub output_root: PathBuf,
    pub fetch: FetchOptions,
    pub progressive_threshold: u32,
    pub tools: Toolkit,
    pub progress: Arc<ProgressAggregator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSuccess {
    pub source: String,
    /// Produced artifacts, in the order they were produced.
    pub artifacts: Vec<PathBuf>,
    /// Set when an optional stage failed but the primary artifacts exist.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub source: String,
    pub kind: FailureKind,
    /// Stage the item was in when it failed.
    pub stage: Stage,
    pub message: String,
    pub trace: Option<String>,
}

/// Terminal outcome of one item's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Success(ItemSuccess),
    Failure(ItemFailure),
}

impl StageResult {
    pub fn is_success(&self) -> bool {
        matches!(self, StageResult::Success(_))
    }

    pub fn source(&self) -> &str {
        match self {
            StageResult::Success(s) => &s.source,
            StageResult::Failure(f) => &f.source,
        }
    }

    pub fn failure(&self) -> Option<&ItemFailure> {
        match self {
            StageResult::Failure(f) => Some(f),
            StageResult::Success(_) => None,
        }
    }

    /// Failure for an item whose task crashed before producing a result.
    pub fn crashed(source: &str, message: String) -> Self {
        StageResult::Failure(ItemFailure {
            source: source.to_string(),
            kind: FailureKind::Internal,
            stage: Stage::Failed,
            message,
            trace: None,
        })
    }
}

/// Run one item to a terminal state. `stem` names its artifacts.
pub async fn run_item(ctx: &PipelineContext, item: &Item, info: &MediaInfo, stem: &str) -> StageResult {
    let mut tracker = StageTracker::new(&item.source);
    let mut run = ItemRun {
        ctx,
        item,
        info,
        stem,
        tracker: &mut tracker,
        artifacts: Vec::new(),
        warning: None,
    };

    let outcome = run.drive().await;
    match outcome {
        Ok(()) => {
            let ItemRun {
                artifacts, warning, ..
            } = run;
            tracker.advance(Stage::Done);
            tracing::info!(url = %item.source, artifacts = artifacts.len(), "item done");
            StageResult::Success(ItemSuccess {
                source: item.source.clone(),
                artifacts,
                warning,
            })
        }
        Err(e) => {
            let stage = tracker.fail();
            tracing::warn!(url = %item.source, %stage, kind = %e.kind(), error = %e, "item failed");
            StageResult::Failure(ItemFailure {
                source: item.source.clone(),
                kind: e.kind(),
                stage,
                message: e.to_string(),
                trace: e.trace(),
            })
        }
    }
}

struct ItemRun<'a> {
    ctx: &'a PipelineContext,
    item: &'a Item,
    info: &'a MediaInfo,
    stem: &'a str,
    tracker: &'a mut StageTracker,
    artifacts: Vec<PathBuf>,
    warning: Option<String>,
}

impl ItemRun<'_> {
    fn root(&self) -> &Path {
        &self.ctx.output_root
    }

    async fn drive(&mut self) -> Result<(), PipelineError> {
        let plan = selector::select(
            &self.info.variants,
            self.item.kind,
            &self.item.policy,
            self.ctx.progressive_threshold,
        )?;
        tracing::info!(url = %self.item.source, plan = plan.label(), "variant selected");
        self.tracker.advance(Stage::Fetching);

        match plan {
            Plan::AudioOnly(v) => {
                let part = ScratchFile::new(naming::intermediate_path(self.root(), self.stem, v.file_extension()));
                self.fetch(&v, part.path(), "audio").await?;
                self.tagged_audio_from(part.path()).await
            }
            Plan::Progressive(v) => {
                let part = ScratchFile::new(naming::intermediate_path(self.root(), self.stem, v.file_extension()));
                self.fetch(&v, part.path(), "media").await?;
                if !self.item.wants_video() {
                    return self.tagged_audio_from(part.path()).await;
                }
                let video = naming::video_artifact(self.root(), self.stem);
                storage::promote(part.path(), &video).map_err(PipelineError::io(&video))?;
                part.keep();
                self.artifacts.push(video.clone());
                if self.item.wants_audio() {
                    self.tagged_audio_from(&video).await?;
                }
                Ok(())
            }
            Plan::Split { audio, video } => self.split(&audio, &video).await,
        }
    }

    /// Fetch both tracks into a scratch directory, mux them, and (for Both)
    /// extract the tagged mp3 from the fetched audio track.
    async fn split(&mut self, audio: &Variant, video: &Variant) -> Result<(), PipelineError> {
        let dir = self.root().join(naming::split_temp_dir_name(self.item.index));
        let temp = TempDirGuard::create(dir.clone()).map_err(PipelineError::io(dir))?;
        let audio_path = temp.path().join(format!("audio.{}", audio.file_extension()));
        let video_path = temp.path().join(format!("video.{}", video.file_extension()));

        let (a, v) = tokio::join!(
            self.fetch(audio, &audio_path, "audio"),
            self.fetch(video, &video_path, "video")
        );
        a?;
        v?;

        self.tracker.advance(Stage::Muxing);
        let out = naming::video_artifact(self.root(), self.stem);
        let part = ScratchFile::new(naming::part_path(&out));
        self.convert(ConversionSpec::mux_mp4(&video_path, &audio_path, part.path()), "muxing")
            .await?;
        storage::promote(part.path(), &out).map_err(PipelineError::io(&out))?;
        part.keep();
        self.artifacts.push(out);

        if self.item.wants_audio() {
            self.tagged_audio_from(&audio_path).await?;
        }
        Ok(())
    }

    /// Extracting → Tagging → [Deriving] from any file with an audio track.
    async fn tagged_audio_from(&mut self, input: &Path) -> Result<(), PipelineError> {
        self.tracker.advance(Stage::Extracting);
        let mp3 = naming::audio_artifact(self.root(), self.stem);
        let part = ScratchFile::new(naming::part_path(&mp3));
        self.convert(ConversionSpec::extract_mp3(input, part.path()), "extracting")
            .await?;

        self.tracker.advance(Stage::Tagging);
        self.tag(part.path()).await?;
        storage::promote(part.path(), &mp3).map_err(PipelineError::io(&mp3))?;
        part.keep();
        self.artifacts.push(mp3.clone());

        if self.item.policy.derive_waveform {
            self.tracker.advance(Stage::Deriving);
            let png = naming::waveform_artifact(self.root(), self.stem);
            match self.derive_waveform(&mp3, &png).await {
                Ok(()) => self.artifacts.push(png),
                Err(e) => {
                    tracing::warn!(url = %self.item.source, error = %e, "waveform not generated");
                    self.warning = Some(format!("waveform not generated: {}", e));
                }
            }
        }
        Ok(())
    }

    async fn derive_waveform(&self, mp3: &Path, png: &Path) -> Result<(), PipelineError> {
        let part = ScratchFile::new(naming::part_path(png));
        self.convert(ConversionSpec::waveform(mp3, part.path()), "deriving")
            .await?;
        storage::promote(part.path(), png).map_err(PipelineError::io(png))?;
        part.keep();
        Ok(())
    }

    async fn fetch(&self, v: &Variant, dest: &Path, what: &'static str) -> Result<FetchReport, PipelineError> {
        tracing::debug!(url = %self.item.source, format = %v.format_id, what, "fetching variant");
        let reporter = self
            .ctx
            .progress
            .byte_reporter(&format!("{} {}", what, self.stem), v.content_length);
        let sink = reporter.clone();
        let result = fetcher::fetch(
            Arc::clone(&v.source),
            v.content_length,
            dest.to_path_buf(),
            self.ctx.fetch,
            move |p| sink.report(p),
        )
        .await;
        reporter.finish();
        result.map_err(|source| PipelineError::Fetch { what, source })
    }

    async fn convert(&self, spec: ConversionSpec, step: &'static str) -> Result<(), PipelineError> {
        let transcoder = Arc::clone(&self.ctx.tools.transcoder);
        let reporter = self.ctx.progress.conversion_reporter(step);
        let sink = reporter.clone();
        let result = tokio::task::spawn_blocking(move || {
            transcoder.convert(&spec, &mut |p| sink.report(p))
        })
        .await?;
        match result {
            Ok(()) => {
                reporter.finish();
                Ok(())
            }
            Err(source) => Err(PipelineError::Conversion { step, source }),
        }
    }

    /// Performers, title and cover art. The tag session is saved even when
    /// the cover fetch fails; the failure still fails the item.
    async fn tag(&self, path: &Path) -> Result<(), PipelineError> {
        let tagger = Arc::clone(&self.ctx.tools.tagger);
        let covers = Arc::clone(&self.ctx.tools.covers);
        let path = path.to_path_buf();
        let source = self.item.source.clone();
        let title = self.info.title.clone();
        let performers: Vec<String> = self.info.author.iter().cloned().collect();

        tokio::task::spawn_blocking(move || -> Result<(), PipelineError> {
            let mut session = TagSession::open(tagger.as_ref(), &path)?;
            if !performers.is_empty() {
                session.set_performers(&performers);
            }
            if !title.is_empty() {
                session.set_title(&title);
            }
            let cover = covers.cover_art(&source)?;
            session.set_cover_art(cover);
            session.save()?;
            Ok(())
        })
        .await?
    }
}
