//! CLI for the MBD batch media downloader.

mod commands;

use anyhow::{bail, Result};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use mbd_core::batch::{BatchRequest, Target};
use mbd_core::config;
use mbd_core::variant::{ItemPolicy, OutputKind};
use std::path::PathBuf;

use commands::{run_download, run_ping, run_probe};

/// Top-level CLI for the MBD batch media downloader.
#[derive(Debug, Parser)]
#[command(name = "mbd")]
#[command(about = "MBD: batch media downloader with tagging and muxing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a single item or every item of a playlist.
    Download(DownloadArgs),

    /// List the variants a source offers.
    Probe {
        /// Source URL.
        url: String,
    },

    /// Check that the helper service is reachable.
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Audio,
    Video,
    Both,
}

impl From<FormatArg> for OutputKind {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Audio => OutputKind::Audio,
            FormatArg::Video => OutputKind::Video,
            FormatArg::Both => OutputKind::Both,
        }
    }
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["url", "playlist"])))]
pub struct DownloadArgs {
    /// URL of a single item.
    #[arg(short, long)]
    pub url: Option<String>,

    /// URL of a playlist; expanded through the helper service.
    #[arg(short, long)]
    pub playlist: Option<String>,

    /// What to produce.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Audio)]
    pub format: FormatArg,

    /// Allow video above the progressive threshold (split audio + video, muxed locally).
    #[arg(short, long)]
    pub development: bool,

    /// Maximum vertical resolution for video.
    #[arg(short, long, default_value_t = 1080, value_name = "N")]
    pub max_resolution: u32,

    /// Use the best audio-only stream for audio output.
    #[arg(long)]
    pub max_quality: bool,

    /// Also render a waveform picture next to each mp3.
    #[arg(long)]
    pub waveform: bool,

    /// Directory for artifacts (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl DownloadArgs {
    /// Exactly one of `--url`/`--playlist` must be set.
    pub fn request(&self) -> Result<BatchRequest> {
        let target = match (&self.url, &self.playlist) {
            (Some(u), None) => Target::Single(u.clone()),
            (None, Some(p)) => Target::Playlist(p.clone()),
            (Some(_), Some(_)) => bail!("--url and --playlist are mutually exclusive"),
            (None, None) => bail!("one of --url or --playlist is required"),
        };
        Ok(BatchRequest {
            target,
            kind: self.format.into(),
            policy: ItemPolicy {
                resolution_ceiling: self.max_resolution,
                prefer_progressive: !self.development,
                prefer_audio_quality: self.max_quality,
                derive_waveform: self.waveform,
            },
        })
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Download(args) => run_download(&cfg, &args).await?,
            CliCommand::Probe { url } => run_probe(&cfg, &url).await?,
            CliCommand::Ping => run_ping(&cfg).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
