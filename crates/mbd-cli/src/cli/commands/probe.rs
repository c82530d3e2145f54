//! `mbd probe <url>` – list discovered variants.

use anyhow::{Context, Result};
use mbd_core::config::MbdConfig;
use mbd_core::discovery::{Discover, YtDlpDiscovery};

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}

pub async fn run_probe(cfg: &MbdConfig, url: &str) -> Result<()> {
    let discovery = YtDlpDiscovery::new(cfg.ytdlp_path.clone(), cfg.transfer_options());
    let info = tokio::task::spawn_blocking({
        let url = url.to_string();
        move || discovery.discover(&url)
    })
    .await
    .context("discovery task join")?
    .with_context(|| format!("discovery failed for {}", url))?;

    println!("{}", info.title);
    if let Some(author) = &info.author {
        println!("by {}", author);
    }
    println!(
        "{:<8} {:<12} {:<6} {:>6} {:>6} {:>12}",
        "FORMAT", "KIND", "EXT", "RES", "KBPS", "SIZE"
    );
    for v in &info.variants {
        println!(
            "{:<8} {:<12} {:<6} {:>6} {:>6} {:>12}",
            v.format_id,
            v.classification(),
            v.file_extension(),
            opt(v.resolution),
            opt(v.audio_bitrate),
            opt(v.content_length)
        );
    }
    Ok(())
}
