//! Filename sanitization for names derived from remote metadata.

const FORBIDDEN: [char; 3] = ['/', '\\', '|'];

fn is_kept(c: char) -> bool {
    (' '..='~').contains(&c) && !FORBIDDEN.contains(&c)
}

/// Replaces every character outside printable ASCII (32–126), plus `/`, `\`
/// and `|`, with `_`. Idempotent: its output only contains kept characters.
pub fn sanitize(name: &str) -> String {
    name.chars().map(|c| if is_kept(c) { c } else { '_' }).collect()
}

/// `sanitize` followed by replacing spaces with `_`; used for final artifact names.
pub fn artifact_name(name: &str) -> String {
    sanitize(name).replace(' ', "_")
}
