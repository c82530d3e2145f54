//! Parse HTTP response header lines into a `Probe`.

/// What a HEAD request tells us before fetching a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Probe {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

/// Parse collected header lines. With redirects, curl hands us the headers of
/// every hop; a status line resets what was collected so the last hop wins.
pub fn parse_headers(lines: &[String]) -> Probe {
    let mut probe = Probe::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            probe = Probe::default();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                probe.content_length = value.parse::<u64>().ok();
            } else if name.eq_ignore_ascii_case("accept-ranges") {
                probe.accept_ranges = value.eq_ignore_ascii_case("bytes");
            }
        }
    }

    probe
}
