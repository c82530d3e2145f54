//! Batch orchestrator: resolve items, discover variants concurrently, fan out
//! one pipeline run per surviving item, and hard-join them into a report.
//!
//! Only playlist resolution and output-directory creation are fatal to a
//! batch. Discovery failures drop the item (logged); pipeline failures are
//! reported per item and never abort the others.

mod report;

pub use report::BatchReport;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::discovery::{Discover, MediaInfo};
use crate::fetcher::FetchOptions;
use crate::helper::PlaylistResolver;
use crate::naming;
use crate::pipeline::{self, PipelineContext, StageResult, Toolkit};
use crate::progress::ProgressAggregator;
use crate::selector::PROGRESSIVE_THRESHOLD;
use crate::variant::{Item, ItemPolicy, OutputKind};

/// What to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Single(String),
    /// Expanded through the helper service.
    Playlist(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub target: Target,
    pub kind: OutputKind,
    pub policy: ItemPolicy,
}

pub struct Orchestrator {
    discovery: Arc<dyn Discover>,
    playlists: Arc<dyn PlaylistResolver>,
    tools: Toolkit,
    fetch: FetchOptions,
    progressive_threshold: u32,
    draw_progress: bool,
}

impl Orchestrator {
    pub fn new(discovery: Arc<dyn Discover>, playlists: Arc<dyn PlaylistResolver>, tools: Toolkit) -> Self {
        Self {
            discovery,
            playlists,
            tools,
            fetch: FetchOptions::default(),
            progressive_threshold: PROGRESSIVE_THRESHOLD,
            draw_progress: true,
        }
    }

    pub fn with_fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_progressive_threshold(mut self, threshold: u32) -> Self {
        self.progressive_threshold = threshold;
        self
    }

    /// Keep bars off the terminal (tests, `--quiet`-style callers).
    pub fn hide_progress(mut self) -> Self {
        self.draw_progress = false;
        self
    }

    /// Run a whole batch. Returns only after every item reached a terminal
    /// state. `output_root` must exist; playlists get their own subdirectory.
    pub async fn run(&self, request: &BatchRequest, output_root: &Path) -> Result<BatchReport> {
        let (root, sources) = self.resolve(&request.target, output_root).await?;
        let items: Vec<Item> = sources
            .into_iter()
            .enumerate()
            .map(|(i, source)| Item::new(i + 1, source, request.kind, request.policy))
            .collect();
        tracing::info!(items = items.len(), root = %root.display(), "batch resolved");

        let (survivors, skipped) = self.discover_all(items).await;
        let stems = naming::disambiguate_stems(
            survivors
                .iter()
                .map(|(item, info)| (item.index, naming::artifact_stem(&info.title, item.index)))
                .collect(),
        );

        let progress = Arc::new(if self.draw_progress {
            ProgressAggregator::new(survivors.len())
        } else {
            ProgressAggregator::hidden(survivors.len())
        });
        let ctx = Arc::new(PipelineContext {
            output_root: root,
            fetch: self.fetch,
            progressive_threshold: self.progressive_threshold,
            tools: self.tools.clone(),
            progress: Arc::clone(&progress),
        });

        let mut handles = Vec::with_capacity(survivors.len());
        for ((item, info), stem) in survivors.into_iter().zip(stems) {
            let ctx = Arc::clone(&ctx);
            let source = item.source.clone();
            let handle = tokio::spawn(async move {
                let result = pipeline::run_item(&ctx, &item, &info, &stem).await;
                ctx.progress.item_finished();
                result
            });
            handles.push((source, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (source, handle) in handles {
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(url = %source, error = %e, "item task crashed");
                    progress.item_finished();
                    StageResult::crashed(&source, format!("item task crashed: {}", e))
                }
            };
            results.push(result);
        }
        progress.finish();

        let report = BatchReport { results, skipped };
        tracing::info!(
            items = report.len(),
            completed = progress.completed(),
            failed = report.failures().count(),
            skipped = report.skipped.len(),
            "batch finished"
        );
        Ok(report)
    }

    /// Item sources plus the directory artifacts go to.
    async fn resolve(&self, target: &Target, output_root: &Path) -> Result<(PathBuf, Vec<String>)> {
        match target {
            Target::Single(url) => Ok((output_root.to_path_buf(), vec![url.clone()])),
            Target::Playlist(url) => {
                let playlists = Arc::clone(&self.playlists);
                let url = url.clone();
                let info = tokio::task::spawn_blocking(move || playlists.resolve(&url))
                    .await
                    .context("playlist task join")?
                    .context("playlist resolution failed")?;
                let dir = output_root.join(naming::playlist_dir_name(&info.name));
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("create playlist directory {}", dir.display()))?;
                tracing::debug!(dir = %dir.display(), "playlist directory ready");
                Ok((dir, info.urls))
            }
        }
    }

    /// Discovery for every item at once. Items whose discovery fails or finds
    /// no variants are dropped and their sources returned separately.
    async fn discover_all(&self, items: Vec<Item>) -> (Vec<(Item, MediaInfo)>, Vec<String>) {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let discovery = Arc::clone(&self.discovery);
                let source = item.source.clone();
                (item, tokio::task::spawn_blocking(move || discovery.discover(&source)))
            })
            .collect();

        let mut survivors = Vec::new();
        let mut skipped = Vec::new();
        for (item, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(url = %item.source, error = %e, "discovery task crashed; item skipped");
                    skipped.push(item.source);
                    continue;
                }
            };
            match outcome {
                Ok(info) if info.variants.is_empty() => {
                    tracing::warn!(url = %item.source, "no variants discovered; item skipped");
                    skipped.push(item.source);
                }
                Ok(info) => {
                    tracing::debug!(url = %item.source, variants = info.variants.len(), title = %info.title, "discovered");
                    survivors.push((item, info));
                }
                Err(e) => {
                    tracing::warn!(url = %item.source, error = %e, "discovery failed; item skipped");
                    skipped.push(item.source);
                }
            }
        }
        (survivors, skipped)
    }
}
