use std::error::Error as _;
use std::io;
use std::path::PathBuf;

use crate::error::FailureKind;
use crate::fetcher::FetchError;
use crate::helper::HelperError;
use crate::selector::NoEligibleVariant;
use crate::tagging::TagError;
use crate::transcode::ConversionError;

/// Anything that ends an item's run early.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Selection(#[from] NoEligibleVariant),
    #[error("fetching {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: FetchError,
    },
    #[error("{step}: {source}")]
    Conversion {
        step: &'static str,
        #[source]
        source: ConversionError,
    },
    #[error(transparent)]
    Tagging(#[from] TagError),
    #[error("cover art: {0}")]
    CoverArt(#[from] HelperError),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("item task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> PipelineError {
        let path = path.into();
        move |source| PipelineError::Io { path, source }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Selection(_) => FailureKind::NoEligibleVariant,
            PipelineError::Fetch { source, .. } => source.failure_kind(),
            PipelineError::Conversion { .. } => FailureKind::ConversionFailed,
            PipelineError::Tagging(_) | PipelineError::CoverArt(_) => FailureKind::TaggingFailed,
            PipelineError::Io { .. } => FailureKind::Io,
            PipelineError::Join(_) => FailureKind::Internal,
        }
    }

    /// The `source()` chain below the top-level message, one cause per line.
    pub fn trace(&self) -> Option<String> {
        let mut causes = Vec::new();
        let mut next = self.source();
        while let Some(cause) = next {
            causes.push(format!("caused by: {}", cause));
            next = cause.source();
        }
        (!causes.is_empty()).then(|| causes.join("\n"))
    }
}
