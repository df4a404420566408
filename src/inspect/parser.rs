//! Incremental HTTP header block parser.
//!
//! # Responsibilities
//! - Accumulate client bytes until the blank-line terminator arrives
//! - Detect a terminator split across any number of reads
//! - Split header lines into a case-insensitive map
//! - Enforce the header size cap

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::error::RouterError;

/// Blank line ending the header block.
const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Default cap on the header block size (64 KiB).
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Header map keyed by lower-cased header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing an earlier value for the same name.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Look up a header by name, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lower-cased name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A completed header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    /// Request line (e.g. `GET / HTTP/1.1`).
    pub start_line: String,
    /// Parsed header fields.
    pub headers: HeaderMap,
    /// Every byte fed so far, including the terminator and any early body bytes.
    pub raw_bytes: Bytes,
}

/// Per-connection incremental parser.
///
/// Not reusable: once a block has been produced, further feeds are ignored.
#[derive(Debug)]
pub struct HeaderParser {
    buffer: BytesMut,
    /// Bytes of `buffer` already searched for the terminator.
    scanned: usize,
    complete: bool,
    max_header_bytes: usize,
}

impl HeaderParser {
    /// Create a parser that fails once the header block exceeds `max_header_bytes`.
    pub fn new(max_header_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            complete: false,
            max_header_bytes,
        }
    }

    /// Append a chunk and return the header block once it is complete.
    ///
    /// Returns `Ok(None)` while the terminator has not been seen, and for every
    /// feed after the block has been produced.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<HeaderBlock>, RouterError> {
        if self.complete {
            return Ok(None);
        }

        self.buffer.extend_from_slice(chunk);

        // Back up far enough to catch a terminator straddling two chunks.
        let from = self.scanned.saturating_sub(TERMINATOR.len() - 1);
        let Some(offset) = find(&self.buffer[from..], TERMINATOR) else {
            self.scanned = self.buffer.len();
            if self.buffer.len() >= self.max_header_bytes {
                return Err(RouterError::HeaderTooLarge {
                    limit: self.max_header_bytes,
                });
            }
            return Ok(None);
        };

        let head_len = from + offset;
        if head_len + TERMINATOR.len() > self.max_header_bytes {
            return Err(RouterError::HeaderTooLarge {
                limit: self.max_header_bytes,
            });
        }

        let (start_line, headers) = parse_head(&self.buffer[..head_len]);
        self.complete = true;
        self.scanned = self.buffer.len();

        Ok(Some(HeaderBlock {
            start_line,
            headers,
            raw_bytes: std::mem::take(&mut self.buffer).freeze(),
        }))
    }

    /// Whether a header block has been produced.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Bytes currently held while waiting for the terminator.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Split the bytes before the terminator into the start line and header fields.
fn parse_head(head: &[u8]) -> (String, HeaderMap) {
    let text = String::from_utf8_lossy(head);
    let mut lines = text.split("\r\n");
    let start_line = lines.next().unwrap_or_default().to_string();

    let mut headers = HeaderMap::new();
    for line in lines {
        // Lines without a colon carry no field.
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        headers.insert(key, value.trim());
    }

    (start_line, headers)
}
