//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::retry::policy::ErrorKind;
use crate::source::SourceError;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

pub fn classify(e: &SourceError) -> ErrorKind {
    match e {
        SourceError::Curl(ce) => classify_curl_error(ce),
        SourceError::Http(code) => classify_http_status(*code),
        // Server closed early; the same request usually succeeds again.
        SourceError::PartialTransfer { .. } => ErrorKind::Connection,
        SourceError::RangeIgnored(_) | SourceError::Storage(_) => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(502), ErrorKind::Http5xx(502)));
    }

    #[test]
    fn access_errors_are_final() {
        assert_eq!(classify(&SourceError::Http(403)), ErrorKind::Other);
        assert_eq!(classify(&SourceError::Http(404)), ErrorKind::Other);
        assert_eq!(classify(&SourceError::RangeIgnored(200)), ErrorKind::Other);
    }

    #[test]
    fn short_body_and_timeout_retry() {
        let short = SourceError::PartialTransfer {
            expected: 10,
            received: 4,
        };
        assert_eq!(classify(&short), ErrorKind::Connection);
        assert_eq!(classify(&SourceError::Curl(curl::Error::new(28))), ErrorKind::Timeout);
    }
}
