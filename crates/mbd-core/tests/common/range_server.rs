//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes:
//! - `/media`: the body. HEAD answers with Content-Length (and
//!   `Accept-Ranges: bytes` when enabled); GET honours `Range: bytes=X-Y`
//!   with 206 Partial Content.
//! - `/test`: 200 when the helper is "up", 503 otherwise.
//! - `/playlist?url=...`: the configured playlist JSON.
//! - `/thumbnail?url=...`: a few PNG magic bytes.
//! - `/forbidden`: 403 for every method.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

pub const THUMBNAIL: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` even if ranges work.
    pub advertise_ranges: bool,
    pub helper_up: bool,
    /// Body for `/playlist`; `None` answers 404.
    pub playlist_json: Option<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            advertise_ranges: true,
            helper_up: true,
            playlist_json: None,
        }
    }
}

pub struct TestServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Base URL with trailing slash, e.g. "http://127.0.0.1:12345/".
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Request lines received so far ("GET /media bytes=0-9", "HEAD /media").
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn start(body: Vec<u8>) -> TestServer {
    start_with_options(body, ServerOptions::default())
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &body, &opts, &log));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: &ServerOptions, log: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, target, range) = parse_request(request);
    let path = target.split('?').next().unwrap_or("");
    log.lock().unwrap().push(match range {
        Some((s, e)) => format!("{} {} bytes={}-{}", method, path, s, e),
        None => format!("{} {}", method, path),
    });
    let head_only = method.eq_ignore_ascii_case("HEAD");

    match path {
        "/media" => serve_media(&mut stream, body, opts, head_only, range),
        "/test" if opts.helper_up => respond(&mut stream, "200 OK", "", b"ok", head_only),
        "/test" => respond(&mut stream, "503 Service Unavailable", "", b"", head_only),
        "/playlist" => match &opts.playlist_json {
            Some(json) => respond(&mut stream, "200 OK", "Content-Type: application/json\r\n", json.as_bytes(), head_only),
            None => respond(&mut stream, "404 Not Found", "", b"", head_only),
        },
        "/thumbnail" => respond(&mut stream, "200 OK", "Content-Type: image/png\r\n", THUMBNAIL, head_only),
        "/forbidden" => respond(&mut stream, "403 Forbidden", "", b"", head_only),
        _ => respond(&mut stream, "404 Not Found", "", b"", head_only),
    }
}

fn serve_media(
    stream: &mut std::net::TcpStream,
    body: &[u8],
    opts: &ServerOptions,
    head_only: bool,
    range: Option<(u64, u64)>,
) {
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges && opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };
    if head_only {
        let response = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}\r\n", total, accept_ranges);
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    let (status, slice) = match range.filter(|_| opts.support_ranges) {
        Some((start, end_incl)) => {
            let start = start.min(total);
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                ("416 Range Not Satisfiable".to_string(), &body[0..0])
            } else {
                let end_excl = (end_incl + 1) as usize;
                ("206 Partial Content".to_string(), &body[start as usize..end_excl])
            }
        }
        None => ("200 OK".to_string(), body),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}\r\n",
        status,
        slice.len(),
        accept_ranges
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

fn respond(stream: &mut std::net::TcpStream, status: &str, extra: &str, body: &[u8], head_only: bool) {
    let response = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n{}\r\n", status, body.len(), extra);
    let _ = stream.write_all(response.as_bytes());
    if !head_only {
        let _ = stream.write_all(body);
    }
}

/// Returns (method, target, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut method = "";
    let mut target = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            target = parts.next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, target, range)
}
