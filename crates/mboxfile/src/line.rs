//! Line classification shared by the detector, reader, and writer.

use crate::error::{Error, Result};

/// The literal that opens an envelope line.
pub(crate) const FROM: &[u8] = b"From ";

/// Length of the `Content-Length: ` header prefix.
const CONTENT_LENGTH_PREFIX_LEN: usize = 16;

/// Returns true when the line begins a new envelope.
pub(crate) fn is_envelope_start(line: &[u8]) -> bool {
    line.starts_with(FROM)
}

/// Returns the number of leading `>` characters when the line is a
/// (possibly quoted) `From ` line, i.e. matches `>*From `. A bare
/// `From ` line reports depth zero.
pub(crate) fn quoted_from_depth(line: &[u8]) -> Option<usize> {
    let depth = line.iter().take_while(|&&b| b == b'>').count();
    line[depth..].starts_with(FROM).then_some(depth)
}

/// Extracts the value of a `Content-Length: ` header line,
/// case-insensitively. The line must not carry its terminator.
pub(crate) fn content_length_value(line: &[u8]) -> Option<&[u8]> {
    if line.len() >= CONTENT_LENGTH_PREFIX_LEN
        && line[..CONTENT_LENGTH_PREFIX_LEN].eq_ignore_ascii_case(b"Content-Length: ")
    {
        Some(&line[CONTENT_LENGTH_PREFIX_LEN..])
    } else {
        None
    }
}

/// Parses a declared `Content-Length` value as a byte count.
pub(crate) fn parse_content_length(value: &[u8]) -> Result<u64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| Error::InvalidContentLength {
            value: String::from_utf8_lossy(value).into_owned(),
        })
}

/// Tests whether a raw line (terminator included) separates headers
/// from the body: at most two bytes long and nothing but whitespace.
/// With `reject_whitespace`, a line containing any space or tab stays
/// part of the header block instead.
pub(crate) fn is_header_boundary(raw: &[u8], reject_whitespace: bool) -> bool {
    if raw.len() > 2 || !raw.trim_ascii().is_empty() {
        return false;
    }
    !(reject_whitespace && raw.iter().any(|&b| b == b' ' || b == b'\t'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_from_depth() {
        assert_eq!(quoted_from_depth(b"From someone"), Some(0));
        assert_eq!(quoted_from_depth(b">From someone"), Some(1));
        assert_eq!(quoted_from_depth(b">>>From someone"), Some(3));
        assert_eq!(quoted_from_depth(b"From: someone"), None);
        assert_eq!(quoted_from_depth(b">>Fromage"), None);
        assert_eq!(quoted_from_depth(b">>"), None);
    }

    #[test]
    fn test_content_length_value() {
        assert_eq!(content_length_value(b"Content-Length: 42"), Some(&b"42"[..]));
        assert_eq!(content_length_value(b"content-length: 0"), Some(&b"0"[..]));
        assert_eq!(content_length_value(b"Content-Length:42"), None);
        assert_eq!(content_length_value(b"Content-Type: text/plain"), None);
    }

    #[test]
    fn test_parse_content_length() {
        assert_eq!(parse_content_length(b"130").unwrap(), 130);
        assert!(parse_content_length(b"ts").is_err());
        assert!(parse_content_length(b"-1").is_err());
    }

    #[test]
    fn test_header_boundary() {
        assert!(is_header_boundary(b"\n", false));
        assert!(is_header_boundary(b"\r\n", false));
        assert!(is_header_boundary(b" \n", false));
        assert!(!is_header_boundary(b" \n", true));
        assert!(is_header_boundary(b"\n", true));
        assert!(!is_header_boundary(b"x\n", false));
        assert!(!is_header_boundary(b"  \n", false));
    }
}
