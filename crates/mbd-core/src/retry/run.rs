//! Retry loop: run a closure until success or the policy says stop.

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::source::SourceError;

/// Runs `f` until it succeeds or the retry policy says to stop, sleeping the
/// backoff between attempts. Blocking; call from `spawn_blocking`.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, SourceError>
where
    F: FnMut() -> Result<T, SourceError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, error = %e, "retrying");
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
