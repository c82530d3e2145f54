//! Variant selection: a pure function from (variants, output kind, policy)
//! to a fetch plan.
//!
//! Every pick is a stable max: when several candidates tie, the first in
//! input order wins.

use crate::variant::{Container, ItemPolicy, OutputKind, Variant};

/// Ceilings below this always use a progressive stream.
pub const PROGRESSIVE_THRESHOLD: u32 = 1080;

/// Containers a progressive pick may use.
const PROGRESSIVE_CONTAINERS: &[Container] = &[Container::Mp4];

/// What to fetch for one item.
#[derive(Debug, Clone)]
pub enum Plan {
    /// One audio-only stream.
    AudioOnly(Variant),
    /// One stream carrying both audio and video.
    Progressive(Variant),
    /// Separate audio-only and video-only streams, muxed afterwards.
    Split { audio: Variant, video: Variant },
}

impl Plan {
    pub fn label(&self) -> &'static str {
        match self {
            Plan::AudioOnly(_) => "audio-only",
            Plan::Progressive(_) => "progressive",
            Plan::Split { .. } => "split",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no eligible {wanted} variant")]
pub struct NoEligibleVariant {
    pub wanted: &'static str,
}

/// Highest `key` wins; ties keep the earliest candidate.
fn stable_max_by_key<'a, I, K>(candidates: I, key: impl Fn(&Variant) -> K) -> Option<&'a Variant>
where
    I: IntoIterator<Item = &'a Variant>,
    K: Ord,
{
    candidates.into_iter().fold(None, |best, v| match best {
        Some(b) if key(v) <= key(b) => Some(b),
        _ => Some(v),
    })
}

/// Audio-only variant with the highest bitrate (unknown bitrate counts as 0).
pub fn best_audio_only(variants: &[Variant]) -> Result<&Variant, NoEligibleVariant> {
    stable_max_by_key(
        variants.iter().filter(|v| v.is_audio_only()),
        |v| v.audio_bitrate.unwrap_or(0),
    )
    .ok_or(NoEligibleVariant { wanted: "audio-only" })
}

/// Video-only variant with the highest resolution not above `ceiling`.
/// Variants without a known resolution are never eligible.
pub fn best_video_only(variants: &[Variant], ceiling: u32) -> Result<&Variant, NoEligibleVariant> {
    stable_max_by_key(
        variants
            .iter()
            .filter(|v| v.is_video_only() && v.resolution.is_some_and(|r| r <= ceiling)),
        |v| v.resolution.unwrap_or(0),
    )
    .ok_or(NoEligibleVariant { wanted: "video-only" })
}

/// Progressive variant in an allow-listed container with the highest resolution.
pub fn best_progressive(variants: &[Variant]) -> Result<&Variant, NoEligibleVariant> {
    stable_max_by_key(
        variants
            .iter()
            .filter(|v| v.is_progressive() && PROGRESSIVE_CONTAINERS.contains(&v.container)),
        |v| v.resolution.unwrap_or(0),
    )
    .ok_or(NoEligibleVariant { wanted: "progressive" })
}

/// True when video output should come from one progressive stream.
pub fn uses_progressive(policy: &ItemPolicy, threshold: u32) -> bool {
    policy.prefer_progressive || policy.resolution_ceiling < threshold
}

/// Choose what to fetch for an item.
///
/// - Audio: the progressive stream when progressive is preferred and audio
///   quality is not; the best audio-only stream otherwise.
/// - Video and Both: the progressive stream when `uses_progressive`;
///   otherwise best audio-only plus best video-only under the ceiling.
pub fn select(
    variants: &[Variant],
    kind: OutputKind,
    policy: &ItemPolicy,
    threshold: u32,
) -> Result<Plan, NoEligibleVariant> {
    match kind {
        OutputKind::Audio => {
            if policy.prefer_progressive && !policy.prefer_audio_quality {
                best_progressive(variants).cloned().map(Plan::Progressive)
            } else {
                best_audio_only(variants).cloned().map(Plan::AudioOnly)
            }
        }
        OutputKind::Video | OutputKind::Both => {
            if uses_progressive(policy, threshold) {
                best_progressive(variants).cloned().map(Plan::Progressive)
            } else {
                let audio = best_audio_only(variants)?.clone();
                let video = best_video_only(variants, policy.resolution_ceiling)?.clone();
                Ok(Plan::Split { audio, video })
            }
        }
    }
}
