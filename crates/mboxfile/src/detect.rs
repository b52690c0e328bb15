//! Best-effort dialect detection for an unknown mbox stream.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::line;

/// Bytes inspected when sniffing the line-ending style.
const SNIFF_LEN: usize = 1024;

impl Dialect {
    /// Attempts to figure out the dialect of the mbox the stream
    /// holds. This is a best-effort classification based on what the
    /// text shows; a mailbox with no ambiguous body lines and no
    /// `Content-Length` header is indistinguishable from
    /// [`Dialect::Original`] and classifies as such.
    ///
    /// The stream is scanned from the start and repositioned to the
    /// start before returning; a failed seek is reported.
    ///
    /// Evidence gathered while scanning:
    /// - a `Content-Length` header inside a message's header block,
    /// - a `>From ` line (any number of `>`) inside a message's body,
    /// - the declared length, counted against body bytes, to spot the
    ///   end of a body that has no blank-line separator.
    ///
    /// When the stream ends with only `Content-Length` evidence, the
    /// input is ambiguous between the two Content-Length dialects and
    /// classifies as [`Dialect::ContentLengthQuoted`]. Callers that
    /// know better should pick the dialect themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoLineEnding`] if the first kilobyte holds
    /// neither `\r` nor `\n`, and [`Error::Io`] if the stream fails to
    /// read or seek.
    ///
    /// # Example
    ///
    /// ```
    /// use std::io::Cursor;
    ///
    /// use mboxfile::Dialect;
    ///
    /// let mut stream = Cursor::new("From a@b.c\nSubject: hi\n\nHello\n");
    /// assert_eq!(Dialect::detect(&mut stream)?, Dialect::Original);
    /// # Ok::<(), mboxfile::Error>(())
    /// ```
    pub fn detect<R: Read + Seek>(input: &mut R) -> Result<Self> {
        input.seek(SeekFrom::Start(0))?;
        let crlf = sniff_crlf(input)?;
        input.seek(SeekFrom::Start(0))?;
        let dialect = scan(&mut *input, crlf)?;
        input.seek(SeekFrom::Start(0))?;
        Ok(dialect)
    }
}

/// Looks for the first `\r` or `\n` within the first kilobyte to learn
/// whether lines carry an extra byte of terminator.
fn sniff_crlf<R: Read>(input: &mut R) -> Result<bool> {
    let mut buf = [0_u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        for &byte in &buf[filled..filled + n] {
            match byte {
                b'\r' => return Ok(true),
                b'\n' => return Ok(false),
                _ => {}
            }
        }
        filled += n;
    }
    Err(Error::NoLineEnding)
}

/// Line-by-line evidence scan.
///
/// Header blocks are modeled with a single flag: a `From ` line seen
/// outside a header opens one, a blank line closes it. Once a declared
/// length has been consumed the scan re-enters header state even
/// without a separator, which is what lets Content-Length mailboxes
/// with back-to-back messages classify correctly.
fn scan<R: Read>(input: R, crlf: bool) -> Result<Dialect> {
    let mut reader = BufReader::new(input);

    let mut in_header = false;
    let mut has_content_length = false;
    let mut has_quoted_from = false;
    let mut finished_first = false;
    let mut count: u64 = 0;
    let mut declared: u64 = 0;

    let mut raw = Vec::new();
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let content = raw.strip_suffix(b"\n").unwrap_or(&raw);
        let content = content.strip_suffix(b"\r").unwrap_or(content);
        let trimmed = content.trim_ascii();

        if in_header && trimmed.is_empty() {
            in_header = false;
            count = 0;
            finished_first = true;
            continue;
        }
        if !in_header && !has_content_length && line::is_envelope_start(trimmed) {
            in_header = true;
        }
        if !in_header && has_content_length {
            count += content.len() as u64 + 1 + u64::from(crlf);
        }

        let quoted_from = line::quoted_from_depth(trimmed).is_some_and(|depth| depth >= 1);

        if in_header && trimmed.starts_with(b"Content-Length:") {
            has_content_length = true;
            let value = trimmed.split(|&b| b == b':').nth(1).unwrap_or_default();
            match line::parse_content_length(value.trim_ascii()) {
                Ok(parsed) => declared = parsed,
                // Not an integer after all; evidence stands, the
                // declared length does not change.
                Err(_) => continue,
            }
        }
        if !in_header && quoted_from {
            has_quoted_from = true;
        }

        if has_quoted_from && has_content_length {
            // Content length plus quoted From lines in a body.
            return Ok(Dialect::ContentLengthQuoted);
        }
        if has_content_length && !in_header && line::is_envelope_start(trimmed) {
            // Content length with a bare From line in a body.
            return Ok(Dialect::ContentLengthUnquoted);
        }
        if !in_header && declared == count {
            // The declared body is consumed; the next line belongs to
            // a new message even without a separating blank line.
            count = 0;
            finished_first = true;
            in_header = true;
        }
        if finished_first && !has_content_length && has_quoted_from {
            return Ok(Dialect::Quoted);
        }
    }

    if has_content_length && !has_quoted_from {
        // Could be either Content-Length dialect; err toward the
        // quoted variant.
        return Ok(Dialect::ContentLengthQuoted);
    }
    Ok(Dialect::Original)
}
