//! `mbd ping` – check the helper service.

use anyhow::{Context, Result};
use mbd_core::config::MbdConfig;
use mbd_core::helper::HelperClient;

/// Fails when `/test` does not answer 2xx.
pub async fn ping_helper(helper: &HelperClient) -> Result<()> {
    let helper = helper.clone();
    tokio::task::spawn_blocking(move || helper.ping())
        .await
        .context("ping task join")?
        .context("helper service unavailable")
}

pub async fn run_ping(cfg: &MbdConfig) -> Result<()> {
    let helper = HelperClient::new(&cfg.helper_url, cfg.transfer_options())?;
    ping_helper(&helper).await?;
    println!("Helper service at {} is reachable.", helper.base_url());
    Ok(())
}
