pub mod config;
pub mod error;
pub mod logging;

pub mod batch;
pub mod discovery;
pub mod fetcher;
pub mod helper;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod retry;
pub mod segmenter;
pub mod selector;
pub mod source;
pub mod storage;
pub mod tagging;
pub mod transcode;
pub mod variant;
