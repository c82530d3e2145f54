//! On-disk naming for artifacts, playlist directories and split-fetch scratch space.
//!
//! Every name derived from remote metadata goes through `sanitize`; final
//! artifact names additionally replace spaces (`artifact_name`).

mod sanitize;

pub use sanitize::{artifact_name, sanitize};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Suffix of intermediate downloads that sit next to their final artifact.
pub const PART_SUFFIX: &str = ".part";

/// Stem for an item's artifacts. Falls back to `item_<index>` when the title
/// sanitizes to nothing usable.
pub fn artifact_stem(title: &str, index: usize) -> String {
    let name = artifact_name(title.trim());
    if name.is_empty() || name.chars().all(|c| c == '_' || c == '.') {
        format!("item_{}", index)
    } else {
        name
    }
}

/// Make stems unique within a batch: the first item keeps its stem, later
/// items with the same stem get `_<index>` appended.
pub fn disambiguate_stems(stems: Vec<(usize, String)>) -> Vec<String> {
    let mut seen = HashSet::new();
    stems
        .into_iter()
        .map(|(index, stem)| {
            if seen.insert(stem.clone()) {
                stem
            } else {
                format!("{}_{}", stem, index)
            }
        })
        .collect()
}

pub fn audio_artifact(root: &Path, stem: &str) -> PathBuf {
    root.join(format!("{}.mp3", stem))
}

pub fn video_artifact(root: &Path, stem: &str) -> PathBuf {
    root.join(format!("{}.mp4", stem))
}

pub fn waveform_artifact(root: &Path, stem: &str) -> PathBuf {
    root.join(format!("{}.waveform.png", stem))
}

/// Intermediate download path: `<root>/<stem>.src.<ext>.part`. Never equal to
/// the `.part` of a conversion output, even when the fetched codec already
/// matches the artifact extension.
pub fn intermediate_path(root: &Path, stem: &str, extension: &str) -> PathBuf {
    part_path(&root.join(format!("{}.src.{}", stem, extension)))
}

/// Appends `.part` to a final path (e.g. `clip.mp4` → `clip.mp4.part`).
pub fn part_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(PART_SUFFIX);
    PathBuf::from(o)
}

/// Directory that becomes the output root for a playlist batch.
pub fn playlist_dir_name(playlist_name: &str) -> String {
    format!("playlist_{}", sanitize(playlist_name))
}

/// Scratch directory for one item's split fetch. The process id keeps
/// concurrently running processes apart; the item index keeps items apart.
pub fn split_temp_dir_name(item_index: usize) -> String {
    format!("temp_{}_{}", std::process::id(), item_index)
}
