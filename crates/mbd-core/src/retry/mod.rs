//! Retry and backoff policy.
//!
//! Classifies transport failures (timeouts, throttling, connection drops)
//! and computes exponential backoff so ranged segments and probes share one
//! policy.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
