//! Variant discovery: turn a source URL into the list of fetchable variants.

mod ytdlp;

pub use ytdlp::{classify_stderr, parse_info_json, YtDlpDiscovery};

use crate::variant::Variant;

/// What discovery knows about one item.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub title: String,
    pub author: Option<String>,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery timed out: {0}")]
    Timeout(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("discovery failed: {0}")]
    Failed(String),
}

/// Blocking; the orchestrator runs it on the blocking pool, one call per item.
pub trait Discover: Send + Sync {
    fn discover(&self, source: &str) -> Result<MediaInfo, DiscoveryError>;
}
