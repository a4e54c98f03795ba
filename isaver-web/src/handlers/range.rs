//! HTTP Range request parsing for download delivery.
//!
//! Implements the `bytes=<start>-[<end>]` subset of RFC 7233 that download
//! clients actually send. Parsing is deliberately permissive: any header
//! that is not a well-formed single byte range degrades to "no range
//! requested", which yields a full 200 response instead of an error.

use axum::http::HeaderMap;
use axum::http::header;

/// A validated byte range within a file of known size.
///
/// Invariant: `0 <= start <= end < total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive end offset; defaults to `total - 1` when omitted
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    /// Number of body bytes this range covers.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value, `bytes start-end/total`.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Parses a `Range` header value against a file of `total` bytes.
///
/// Returns `None` (full content) for anything but a satisfiable
/// `bytes=<start>-[<end>]` range: other units, missing start, unparseable
/// numbers, start past the end of the file, or inverted ranges. An `end`
/// past the file is clamped to `total - 1`.
pub fn parse_range_header(header: &str, total: u64) -> Option<ByteRange> {
    if total == 0 {
        return None;
    }

    let spec = header.trim().strip_prefix("bytes=")?;
    let (start_str, end_str) = spec.split_once('-')?;

    let start: u64 = start_str.trim().parse().ok()?;
    let end = match end_str.trim() {
        "" => total - 1,
        raw => raw.parse::<u64>().ok()?.min(total - 1),
    };

    if start > end || start >= total {
        return None;
    }

    Some(ByteRange { start, end, total })
}

/// Extracts the `Range` header value from request headers, if present.
pub fn extract_range_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bounded_range() {
        let range = parse_range_header("bytes=200-499", 1000).unwrap();
        assert_eq!(range.start, 200);
        assert_eq!(range.end, 499);
        assert_eq!(range.len(), 300);
        assert_eq!(range.content_range(), "bytes 200-499/1000");
    }

    #[test]
    fn open_ended_range_defaults_to_last_byte() {
        let range = parse_range_header("bytes=900-", 1000).unwrap();
        assert_eq!(range.start, 900);
        assert_eq!(range.end, 999);
        assert_eq!(range.len(), 100);
        assert_eq!(range.content_range(), "bytes 900-999/1000");
    }

    #[test]
    fn end_is_clamped_to_file_size() {
        let range = parse_range_header("bytes=0-99999", 1000).unwrap();
        assert_eq!(range.end, 999);
        assert_eq!(range.len(), 1000);
    }

    #[test]
    fn malformed_headers_degrade_to_full_content() {
        assert_eq!(parse_range_header("chunks=0-100", 1000), None);
        assert_eq!(parse_range_header("bytes=-500", 1000), None);
        assert_eq!(parse_range_header("bytes=abc-def", 1000), None);
        assert_eq!(parse_range_header("bytes=100", 1000), None);
        assert_eq!(parse_range_header("", 1000), None);
        // Multi-range lists are out of scope; serve the whole file instead.
        assert_eq!(parse_range_header("bytes=0-100,200-300", 1000), None);
    }

    #[test]
    fn unsatisfiable_ranges_degrade_to_full_content() {
        assert_eq!(parse_range_header("bytes=1000-", 1000), None);
        assert_eq!(parse_range_header("bytes=500-200", 1000), None);
        assert_eq!(parse_range_header("bytes=0-", 0), None);
    }

    #[test]
    fn whitespace_around_value_is_tolerated() {
        let range = parse_range_header("  bytes=0-9  ", 1000).unwrap();
        assert_eq!(range.len(), 10);
    }
}
