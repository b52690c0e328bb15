//! Streaming reader that splits an mbox stream into messages.

use std::io::{self, BufRead, Read, Write};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::line;

/// What a dialect handler decided about one line.
enum LineOutcome {
    /// Not handled; the generic loop copies the line as-is.
    Copy,
    /// The handler consumed the line, writing a transformed version or
    /// swallowing it along with body bytes it read itself.
    Handled,
    /// The stream ended inside a counted body; the current message is
    /// all there is.
    EndOfStream,
}

/// Reads messages out of an mbox stream, one per call.
///
/// The reader owns a forward-only byte source and demultiplexes it
/// into individual messages: each [`MboxReader::next_message`] call
/// yields one envelope line and writes that message's header and body
/// bytes, un-quoted per the dialect, into the caller's sink.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
///
/// use mboxfile::{Dialect, MboxReader};
///
/// let mbox = "From a@b.c Mon Jul 04 14:23:45 2022\nSubject: hi\n\nHello\n";
/// let mut reader = MboxReader::new(Dialect::Original, Cursor::new(mbox));
///
/// let mut message = Vec::new();
/// let envelope = reader.next_message(&mut message)?;
/// assert_eq!(envelope.as_deref(), Some("From a@b.c Mon Jul 04 14:23:45 2022"));
/// assert_eq!(message, b"Subject: hi\n\nHello\n");
/// assert!(reader.next_message(&mut Vec::new())?.is_none());
/// # Ok::<(), mboxfile::Error>(())
/// ```
#[derive(Debug)]
pub struct MboxReader<R> {
    dialect: Dialect,
    input: R,
    /// Envelope line already consumed while scanning for the end of
    /// the previous message, held for the next call. A new envelope is
    /// only recognizable after its line has been fully read.
    lookahead: Option<Vec<u8>>,
}

impl<R: BufRead> MboxReader<R> {
    /// Creates a reader over a dialect-tagged stream.
    pub fn new(dialect: Dialect, input: R) -> Self {
        Self {
            dialect,
            input,
            lookahead: None,
        }
    }

    /// The dialect this session reads.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Consumes the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.input
    }

    /// Writes the next message's bytes into the sink and returns its
    /// envelope line, without the terminator.
    ///
    /// Returns `Ok(None)` once the stream is exhausted; the final
    /// message is delivered by the preceding call like any other. A
    /// body cut short of its declared `Content-Length` is delivered
    /// with whatever bytes were present and likewise followed by
    /// `Ok(None)`; callers that must tell truncation from a clean end
    /// compare the bytes received against the declared length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentLength`](crate::Error::InvalidContentLength)
    /// when a declared length fails to parse, and
    /// [`Error::Io`](crate::Error::Io) when the underlying stream or
    /// the sink fails.
    pub fn next_message<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<Option<String>> {
        let mut envelope = self.lookahead.take();
        let mut in_message = envelope.is_some();
        let mut declared: u64 = 0;

        let mut raw = Vec::new();
        loop {
            raw.clear();
            let n = self.input.read_until(b'\n', &mut raw)?;
            if n == 0 || !raw.ends_with(b"\n") {
                // End of stream. An unterminated trailing line cannot
                // be recognized as an envelope and is not delivered.
                break;
            }
            let content = &raw[..raw.len() - 1];

            if line::is_envelope_start(content) {
                if in_message {
                    self.lookahead = Some(content.to_vec());
                    break;
                }
                envelope = Some(content.to_vec());
                continue;
            }
            if content.is_empty() && !in_message {
                in_message = true;
            }

            let outcome = match self.dialect {
                Dialect::Original => LineOutcome::Copy,
                Dialect::Quoted => dequote_line(content, sink)?,
                Dialect::ContentLengthQuoted => {
                    self.counted_line(content, sink, &mut declared, true)?
                }
                Dialect::ContentLengthUnquoted => {
                    self.counted_line(content, sink, &mut declared, false)?
                }
            };
            match outcome {
                LineOutcome::Copy => sink.write_all(&raw)?,
                LineOutcome::Handled => {}
                LineOutcome::EndOfStream => break,
            }
        }

        Ok(envelope.map(|from| String::from_utf8_lossy(&from).into_owned()))
    }

    /// Line handler for the two Content-Length dialects: un-quotes
    /// when the dialect asks for it, records declared lengths, and
    /// takes over body copying at the header/body boundary.
    fn counted_line<W: Write + ?Sized>(
        &mut self,
        content: &[u8],
        sink: &mut W,
        declared: &mut u64,
        dequote: bool,
    ) -> Result<LineOutcome> {
        if dequote {
            if let LineOutcome::Handled = dequote_line(content, sink)? {
                return Ok(LineOutcome::Handled);
            }
        }
        if let Some(value) = line::content_length_value(content) {
            *declared = line::parse_content_length(value)?;
            // The header line itself flows through to the sink.
            return Ok(LineOutcome::Copy);
        }
        if content.is_empty() {
            sink.write_all(b"\n")?;
            return if dequote {
                self.copy_counted_lines(sink, *declared)
            } else {
                self.copy_counted_bytes(sink, *declared)
            };
        }
        Ok(LineOutcome::Copy)
    }

    /// Copies the declared number of body bytes line by line,
    /// un-quoting each, decrementing by raw line length.
    fn copy_counted_lines<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
        mut remaining: u64,
    ) -> Result<LineOutcome> {
        if remaining == 0 {
            return Ok(LineOutcome::Handled);
        }
        let mut raw = Vec::new();
        loop {
            raw.clear();
            let n = self.input.read_until(b'\n', &mut raw)?;
            if n == 0 || !raw.ends_with(b"\n") {
                // Declared bytes remain outstanding but the stream is
                // done; surface the plain end of stream.
                return Ok(LineOutcome::EndOfStream);
            }
            remaining = remaining.saturating_sub(raw.len() as u64);
            if line::quoted_from_depth(&raw).is_some_and(|depth| depth >= 1) {
                sink.write_all(&raw[1..])?;
            } else {
                sink.write_all(&raw)?;
            }
            if remaining == 0 {
                return Ok(LineOutcome::Handled);
            }
        }
    }

    /// Copies exactly the declared number of body bytes, verbatim,
    /// with no line-oriented re-scanning. A shortfall is left for the
    /// outer loop to observe as end of stream.
    fn copy_counted_bytes<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
        declared: u64,
    ) -> Result<LineOutcome> {
        io::copy(&mut (&mut self.input).take(declared), sink)?;
        Ok(LineOutcome::Handled)
    }
}

/// Strips one `>` from any `>+From ` line. Lines that do not match are
/// left for the generic loop.
fn dequote_line<W: Write + ?Sized>(content: &[u8], sink: &mut W) -> Result<LineOutcome> {
    if line::quoted_from_depth(content).is_some_and(|depth| depth >= 1) {
        sink.write_all(&content[1..])?;
        sink.write_all(b"\n")?;
        return Ok(LineOutcome::Handled);
    }
    Ok(LineOutcome::Copy)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::Error;

    const PLAIN_BOX: &str = "\
From someone
From: bubbles@bubbletown.com
To: mrmxpdstk@lazytown.com
Subject: To interpretation

>From all of us, to all of you, be happy!
From someone-else
From: mrspam@corporate.corp.com
To: mrmxpdstk@lazytown.com
Subject: Bestest offer in the universe!!11!!

You won't believe these prices!
>From 1 cent to 11 cents, we carry the least expensive
line of jets this side of the Gobi Desert!
";

    const CONTENT_LENGTH_BOX: &str = "\
From someone
From: bubbles@bubbletown.com
To: mrmxpdstk@lazytown.com
Subject: To interpretation
Content-Length: 42

>From all of us, to all of you, be happy!
From someone-else
>From mug: weird header
Content-Length: 130
From: mrspam@corporate.corp.com
To: mrmxpdstk@lazytown.com
Subject: Bestest offer in the universe!!11!!

You won't believe these prices!
>From 1 cent to 11 cents, we carry the least expensive
line of jets this side of the Gobi Desert!
From nobody
From: nobody@nowhere.man
To: mrmxpdstk@lazytown.com
Subject: Mysterious Jenkins
Content-Length: 0

";

    const BAD_VALUE_BOX: &str = "\
From someone
From: bubbles@bubbletown.com
Subject: To interpretation
Content-Length: ts

>From all of us, to all of you, be happy!
";

    const TRUNCATED_BOX: &str = "\
From someone
From: bubbles@bubbletown.com
Subject: To interpretation
Content-Length: 42

>From all of us, to all of you, be happy!
From someone-else
Content-Length: 130
From: mrspam@corporate.corp.com
Subject: Bestest offer in the universe!!11!!

You won't believe these prices!
line of jets this side of the Gobi Desert!
";

    fn read_all(dialect: Dialect, data: &str) -> Vec<(String, Vec<u8>)> {
        let mut reader = MboxReader::new(dialect, Cursor::new(data.as_bytes()));
        let mut messages = Vec::new();
        loop {
            let mut body = Vec::new();
            match reader.next_message(&mut body).unwrap() {
                Some(envelope) => messages.push((envelope, body)),
                None => return messages,
            }
        }
    }

    #[test]
    fn test_read_original() {
        let messages = read_all(Dialect::Original, PLAIN_BOX);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, "From someone");
        assert_eq!(
            messages[0].1,
            b"From: bubbles@bubbletown.com\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: To interpretation\n\
              \n\
              >From all of us, to all of you, be happy!\n"
        );
        assert_eq!(messages[1].0, "From someone-else");
        assert_eq!(
            messages[1].1,
            b"From: mrspam@corporate.corp.com\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: Bestest offer in the universe!!11!!\n\
              \n\
              You won't believe these prices!\n\
              >From 1 cent to 11 cents, we carry the least expensive\n\
              line of jets this side of the Gobi Desert!\n"
        );
    }

    #[test]
    fn test_read_quoted_strips_one_level() {
        let messages = read_all(Dialect::Quoted, PLAIN_BOX);
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].1,
            b"From: bubbles@bubbletown.com\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: To interpretation\n\
              \n\
              From all of us, to all of you, be happy!\n"
        );
        assert_eq!(
            messages[1].1,
            b"From: mrspam@corporate.corp.com\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: Bestest offer in the universe!!11!!\n\
              \n\
              You won't believe these prices!\n\
              From 1 cent to 11 cents, we carry the least expensive\n\
              line of jets this side of the Gobi Desert!\n"
        );
    }

    #[test]
    fn test_read_content_length_quoted() {
        let messages = read_all(Dialect::ContentLengthQuoted, CONTENT_LENGTH_BOX);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].0, "From someone");
        assert_eq!(
            messages[0].1,
            b"From: bubbles@bubbletown.com\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: To interpretation\n\
              Content-Length: 42\n\
              \n\
              From all of us, to all of you, be happy!\n"
        );
        assert_eq!(messages[1].0, "From someone-else");
        assert_eq!(
            messages[1].1,
            b"From mug: weird header\n\
              Content-Length: 130\n\
              From: mrspam@corporate.corp.com\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: Bestest offer in the universe!!11!!\n\
              \n\
              You won't believe these prices!\n\
              From 1 cent to 11 cents, we carry the least expensive\n\
              line of jets this side of the Gobi Desert!\n"
        );
        assert_eq!(messages[2].0, "From nobody");
        assert_eq!(
            messages[2].1,
            b"From: nobody@nowhere.man\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: Mysterious Jenkins\n\
              Content-Length: 0\n\
              \n"
        );
    }

    #[test]
    fn test_read_content_length_unquoted() {
        let messages = read_all(Dialect::ContentLengthUnquoted, CONTENT_LENGTH_BOX);
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1].1,
            b">From mug: weird header\n\
              Content-Length: 130\n\
              From: mrspam@corporate.corp.com\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: Bestest offer in the universe!!11!!\n\
              \n\
              You won't believe these prices!\n\
              >From 1 cent to 11 cents, we carry the least expensive\n\
              line of jets this side of the Gobi Desert!\n"
        );
        assert_eq!(
            messages[2].1,
            b"From: nobody@nowhere.man\n\
              To: mrmxpdstk@lazytown.com\n\
              Subject: Mysterious Jenkins\n\
              Content-Length: 0\n\
              \n"
        );
    }

    #[test]
    fn test_read_malformed_content_length_is_an_error() {
        for dialect in [Dialect::ContentLengthQuoted, Dialect::ContentLengthUnquoted] {
            let mut reader = MboxReader::new(dialect, Cursor::new(BAD_VALUE_BOX.as_bytes()));
            let err = reader.next_message(&mut Vec::new()).unwrap_err();
            assert!(matches!(err, Error::InvalidContentLength { ref value } if value == "ts"));
        }
    }

    #[test]
    fn test_read_truncated_body_ends_the_stream() {
        let mut reader = MboxReader::new(
            Dialect::ContentLengthQuoted,
            Cursor::new(TRUNCATED_BOX.as_bytes()),
        );
        let mut first = Vec::new();
        assert_eq!(
            reader.next_message(&mut first).unwrap().as_deref(),
            Some("From someone")
        );

        // The declared 130 bytes are not all there; the message is
        // delivered with what exists and the stream then ends.
        let mut second = Vec::new();
        assert_eq!(
            reader.next_message(&mut second).unwrap().as_deref(),
            Some("From someone-else")
        );
        assert!(second.ends_with(b"line of jets this side of the Gobi Desert!\n"));
        assert!(reader.next_message(&mut Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_read_empty_stream() {
        let mut reader = MboxReader::new(Dialect::Original, Cursor::new(&b""[..]));
        assert!(reader.next_message(&mut Vec::new()).unwrap().is_none());
    }
}
