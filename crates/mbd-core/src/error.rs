//! Closed set of per-item failure kinds carried in a failed `StageResult`.

use std::fmt;

/// Why an item's pipeline stopped. The human-readable message travels next to
/// this in `ItemFailure`; callers branch on the kind, not on the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Selection found no variant matching the item's policy.
    NoEligibleVariant,
    /// Declared or probed size was zero or could not be obtained.
    EmptyContent,
    /// A network call exceeded the transport timeout.
    TransportTimeout,
    /// The remote source rejected access (401/403/410).
    UnavailableSource,
    /// Non-success response or short body in the middle of a fetch.
    TransferFailed,
    /// The transcoding engine reported failure.
    ConversionFailed,
    /// Tags could not be written back to the artifact.
    TaggingFailed,
    /// Local filesystem error (create dir, rename, remove).
    Io,
    /// The item's task crashed before producing a result.
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NoEligibleVariant => "no eligible variant",
            FailureKind::EmptyContent => "empty content",
            FailureKind::TransportTimeout => "transport timeout",
            FailureKind::UnavailableSource => "unavailable source",
            FailureKind::TransferFailed => "transfer failed",
            FailureKind::ConversionFailed => "conversion failed",
            FailureKind::TaggingFailed => "tagging failed",
            FailureKind::Io => "io",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
