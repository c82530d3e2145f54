//! Client for the playlist/thumbnail helper service.
//!
//! Routes: `GET /test` (reachability), `GET /playlist?url=` returning
//! `{name, urls}`, and `GET /thumbnail?url=` returning image bytes.

use serde::Deserialize;
use url::Url;

use crate::source::{fetch_bytes, SourceError, TransferOptions};
use crate::tagging::CoverArt;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistInfo {
    pub name: String,
    pub urls: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("invalid helper url {0}: {1}")]
    BadUrl(String, url::ParseError),
    #[error("helper service unavailable at {url}: {source}")]
    Unavailable {
        url: String,
        #[source]
        source: SourceError,
    },
    #[error("helper request {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: SourceError,
    },
    #[error("helper returned invalid playlist json: {0}")]
    InvalidPlaylist(#[from] serde_json::Error),
}

/// Expands a playlist URL into its name and item URLs.
pub trait PlaylistResolver: Send + Sync {
    fn resolve(&self, playlist_url: &str) -> Result<PlaylistInfo, HelperError>;
}

/// Fetches the cover image for an item.
pub trait CoverArtSource: Send + Sync {
    fn cover_art(&self, item_url: &str) -> Result<CoverArt, HelperError>;
}

#[derive(Debug, Clone)]
pub struct HelperClient {
    base: Url,
    transfer: TransferOptions,
}

impl HelperClient {
    pub fn new(base_url: &str, transfer: TransferOptions) -> Result<Self, HelperError> {
        let base = Url::parse(base_url).map_err(|e| HelperError::BadUrl(base_url.to_string(), e))?;
        Ok(Self { base, transfer })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `<base>/<route>?url=<item>`, with the item URL percent-encoded.
    pub fn route(&self, route: &str, item_url: Option<&str>) -> Result<Url, HelperError> {
        let mut u = self
            .base
            .join(route)
            .map_err(|e| HelperError::BadUrl(route.to_string(), e))?;
        if let Some(item) = item_url {
            u.query_pairs_mut().clear().append_pair("url", item);
        }
        Ok(u)
    }

    fn get(&self, u: &Url) -> Result<Vec<u8>, HelperError> {
        fetch_bytes(u.as_str(), &self.transfer).map_err(|source| HelperError::Request {
            url: u.to_string(),
            source,
        })
    }

    /// Any non-2xx or network failure means unavailable.
    pub fn ping(&self) -> Result<(), HelperError> {
        let u = self.route("test", None)?;
        fetch_bytes(u.as_str(), &self.transfer)
            .map(|_| ())
            .map_err(|source| HelperError::Unavailable {
                url: u.to_string(),
                source,
            })
    }

    pub fn playlist(&self, playlist_url: &str) -> Result<PlaylistInfo, HelperError> {
        let u = self.route("playlist", Some(playlist_url))?;
        let body = self.get(&u)?;
        let info: PlaylistInfo = serde_json::from_slice(&body)?;
        tracing::info!(playlist = %info.name, items = info.urls.len(), "playlist resolved");
        Ok(info)
    }

    pub fn thumbnail(&self, item_url: &str) -> Result<Vec<u8>, HelperError> {
        let u = self.route("thumbnail", Some(item_url))?;
        self.get(&u)
    }
}

impl PlaylistResolver for HelperClient {
    fn resolve(&self, playlist_url: &str) -> Result<PlaylistInfo, HelperError> {
        self.playlist(playlist_url)
    }
}

impl CoverArtSource for HelperClient {
    fn cover_art(&self, item_url: &str) -> Result<CoverArt, HelperError> {
        self.thumbnail(item_url).map(CoverArt::sniff)
    }
}
