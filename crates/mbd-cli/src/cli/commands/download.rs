//! `mbd download` – run a batch and report per-item failures.

use anyhow::{Context, Result};
use std::sync::Arc;

use mbd_core::batch::Orchestrator;
use mbd_core::config::MbdConfig;
use mbd_core::discovery::YtDlpDiscovery;
use mbd_core::helper::HelperClient;
use mbd_core::pipeline::Toolkit;
use mbd_core::tagging::FfmpegTagger;
use mbd_core::transcode::FfmpegTranscoder;

use super::ping::ping_helper;
use crate::cli::DownloadArgs;

pub async fn run_download(cfg: &MbdConfig, args: &DownloadArgs) -> Result<()> {
    let request = args.request()?;
    let transfer = cfg.transfer_options();
    let helper = HelperClient::new(&cfg.helper_url, transfer)?;
    ping_helper(&helper).await?;

    let output_root = match &args.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create output directory {}", dir.display()))?;
            dir.clone()
        }
        None => std::env::current_dir().context("current directory")?,
    };

    let helper = Arc::new(helper);
    let tools = Toolkit {
        transcoder: Arc::new(FfmpegTranscoder::new(cfg.ffmpeg_path.clone(), cfg.ffprobe_path.clone())),
        tagger: Arc::new(FfmpegTagger::new(cfg.ffmpeg_path.clone())),
        covers: helper.clone(),
    };
    let orchestrator = Orchestrator::new(
        Arc::new(YtDlpDiscovery::new(cfg.ytdlp_path.clone(), transfer)),
        helper,
        tools,
    )
    .with_fetch_options(cfg.fetch_options())
    .with_progressive_threshold(cfg.progressive_threshold);

    let report = orchestrator.run(&request, &output_root).await?;

    for line in report.warning_lines() {
        eprintln!("warning: {}", line);
    }
    for line in report.failure_lines() {
        eprintln!("{}", line);
    }
    if !report.skipped.is_empty() {
        println!("{} item(s) skipped (no variants found; see log).", report.skipped.len());
    }
    println!("Download completed.");
    Ok(())
}
