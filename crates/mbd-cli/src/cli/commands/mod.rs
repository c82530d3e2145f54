//! CLI command handlers, one per file.

mod download;
mod ping;
mod probe;

pub use download::run_download;
pub use ping::run_ping;
pub use probe::run_probe;
