//! libcurl-backed byte source.

use std::io;
use std::str;
use std::time::Duration;

use curl::easy::{Easy, List};

use super::head::{parse_headers, Probe};
use super::{ByteSource, Sink, SourceError};
use crate::segmenter::Segment;

/// Transport knobs applied to every easy handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for this long.
    pub low_speed_time: Duration,
    pub low_speed_limit: u32,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
            low_speed_limit: 1024,
        }
    }
}

/// One variant's direct URL plus any headers the discovery backend says the
/// CDN expects.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    headers: Vec<(String, String)>,
    transfer: TransferOptions,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, transfer: TransferOptions) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            transfer,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn easy(&self) -> Result<Easy, SourceError> {
        let mut easy = configured_easy(&self.url, &self.transfer)?;
        if !self.headers.is_empty() {
            let mut list = List::new();
            for (k, v) in &self.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl ByteSource for HttpSource {
    fn probe(&self) -> Result<Probe, SourceError> {
        let mut easy = self.easy()?;
        easy.nobody(true)?;

        let mut lines: Vec<String> = Vec::new();
        let perform = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform()
        };
        check_perform(&mut easy, perform, None)?;

        let probe = parse_headers(&lines);
        tracing::debug!(url = %self.url, ?probe, "HEAD probe");
        Ok(probe)
    }

    fn copy_to(&self, range: Option<Segment>, sink: &mut Sink<'_>) -> Result<u64, SourceError> {
        let mut easy = self.easy()?;
        if let Some(seg) = range {
            easy.range(&seg.curl_range())?;
        }
        let received = perform_into(&mut easy, sink)?;

        if range.is_some() {
            let code = easy.response_code()?;
            if code != 206 {
                return Err(SourceError::RangeIgnored(code));
            }
        }
        Ok(received)
    }
}

/// GET a small body into memory (thumbnails, helper JSON).
pub fn fetch_bytes(url: &str, transfer: &TransferOptions) -> Result<Vec<u8>, SourceError> {
    let mut easy = configured_easy(url, transfer)?;
    let mut body = Vec::new();
    let mut collect = |data: &[u8]| -> io::Result<()> {
        body.extend_from_slice(data);
        Ok(())
    };
    perform_into(&mut easy, &mut collect)?;
    Ok(body)
}

fn configured_easy(url: &str, transfer: &TransferOptions) -> Result<Easy, SourceError> {
    let mut easy = Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.fail_on_error(true)?;
    easy.connect_timeout(transfer.connect_timeout)?;
    easy.low_speed_limit(transfer.low_speed_limit)?;
    easy.low_speed_time(transfer.low_speed_time)?;
    Ok(easy)
}

/// Run the transfer, handing body bytes to `sink`. A sink failure aborts curl
/// with a write error, which is reported as `SourceError::Storage`.
fn perform_into(easy: &mut Easy, sink: &mut Sink<'_>) -> Result<u64, SourceError> {
    let mut received = 0u64;
    let mut sink_error: Option<io::Error> = None;
    let perform = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match sink(data) {
            Ok(()) => {
                received += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                sink_error = Some(e);
                Ok(0)
            }
        })?;
        transfer.perform()
    };
    check_perform(easy, perform, sink_error)?;
    Ok(received)
}

fn check_perform(
    easy: &mut Easy,
    perform: Result<(), curl::Error>,
    sink_error: Option<io::Error>,
) -> Result<(), SourceError> {
    match perform {
        Ok(()) => {}
        Err(e) if e.is_write_error() => {
            return Err(match sink_error {
                Some(io_err) => SourceError::Storage(io_err),
                None => SourceError::Curl(e),
            });
        }
        Err(e) if e.is_http_returned_error() => {
            return Err(SourceError::Http(easy.response_code()?));
        }
        Err(e) => return Err(SourceError::Curl(e)),
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(SourceError::Http(code));
    }
    Ok(())
}
