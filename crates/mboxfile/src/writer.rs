//! Streaming writer that serializes messages into an mbox stream.

use std::io::{self, Write};

use crate::dialect::Dialect;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::line;
use crate::staging::{FileStaging, Staging};

/// Appends messages to an mbox-formatted byte stream.
///
/// Each [`MboxWriter::write_mail`] call emits one envelope line
/// followed by the message bytes, quoted as the dialect requires. The
/// two Content-Length dialects additionally buffer each body through a
/// [`Staging`] implementation so the exact transformed byte length can
/// be declared ahead of the body; [`FileStaging`] is the default.
///
/// # Example
///
/// ```
/// use mboxfile::{Dialect, Envelope, MboxWriter};
///
/// let mut out = Vec::new();
/// let mut writer = MboxWriter::new(Dialect::Quoted, &mut out);
/// let envelope = Envelope::parse("From pi@rpi.cu Mon Jul 04 19:23:45 2022");
/// writer.write_mail(&envelope, b"Subject: hi\n\nFrom here on out.\n")?;
/// assert_eq!(
///     String::from_utf8_lossy(&out),
///     "From pi@rpi.cu Mon Jul 04 19:23:45 2022\nSubject: hi\n\n>From here on out.\n\n"
/// );
/// # Ok::<(), mboxfile::Error>(())
/// ```
#[derive(Debug)]
pub struct MboxWriter<W, S = FileStaging> {
    dialect: Dialect,
    dest: W,
    staging: S,
}

impl<W: Write> MboxWriter<W> {
    /// Creates a writer that stages Content-Length bodies in
    /// temporary files under the system temporary directory.
    pub fn new(dialect: Dialect, dest: W) -> Self {
        Self::with_staging(dialect, dest, FileStaging::default())
    }
}

impl<W: Write, S: Staging> MboxWriter<W, S> {
    /// Creates a writer over an explicit staging implementation.
    pub fn with_staging(dialect: Dialect, dest: W, staging: S) -> Self {
        Self {
            dialect,
            dest,
            staging,
        }
    }

    /// The dialect this session writes.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Consumes the writer, returning the destination stream.
    pub fn into_inner(self) -> W {
        self.dest
    }

    /// Appends one message to the stream.
    ///
    /// The envelope is formatted first; the message bytes (headers and
    /// body) follow with the dialect's quoting applied. Lines are
    /// written `\n`-terminated; an unterminated final line is given a
    /// terminator rather than dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the destination fails, and for the
    /// Content-Length dialects [`Error::Staging`] naming the staging
    /// operation that failed. Header lines flushed to the destination
    /// before a staging failure are not retracted.
    pub fn write_mail(&mut self, envelope: &Envelope, mail: &[u8]) -> Result<()> {
        match self.dialect {
            Dialect::Original => self.write_quoting(envelope, mail, false),
            Dialect::Quoted => self.write_quoting(envelope, mail, true),
            Dialect::ContentLengthQuoted => self.write_counted(envelope, mail, true),
            Dialect::ContentLengthUnquoted => self.write_counted(envelope, mail, false),
        }
    }

    /// Single forward pass for the two non-Content-Length dialects.
    ///
    /// With `requote_quoted`, any `>*From ` line gains one `>`
    /// (mboxrd); without it, only bare `From ` lines are quoted
    /// (mboxo's narrower historical rule).
    fn write_quoting(&mut self, envelope: &Envelope, mail: &[u8], requote_quoted: bool) -> Result<()> {
        self.dest.write_all(envelope.to_line().as_bytes())?;
        self.dest.write_all(b"\n")?;

        let mut ends_blank = false;
        for raw in mail.split_inclusive(|&b| b == b'\n') {
            let quote = match line::quoted_from_depth(raw) {
                Some(depth) => requote_quoted || depth == 0,
                None => false,
            };
            if quote {
                self.dest.write_all(b">")?;
            }
            self.dest.write_all(raw)?;
            if !raw.ends_with(b"\n") {
                self.dest.write_all(b"\n")?;
            }
            ends_blank = raw == b"\n" || raw == b"\r\n";
        }
        if !ends_blank {
            // Separate the message from the next envelope.
            self.dest.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Two-phase pass for the Content-Length dialects: headers stream
    /// straight to the destination while the body is staged and
    /// counted, then the declared length and the staged bytes follow.
    fn write_counted(&mut self, envelope: &Envelope, mail: &[u8], quote: bool) -> Result<()> {
        let key = envelope.address.clone();
        let mut staged = self
            .staging
            .open_writer(&key)
            .map_err(|e| Error::staging("open-writer", &key, e))?;

        let outcome = stage_message(&mut self.dest, &mut staged, envelope, mail, quote, &key);
        drop(staged);
        let outcome = outcome.and_then(|body_len| self.emit_staged(&key, body_len));

        // Release the staging resource on every path; the primary
        // error, if any, wins over a failed release.
        let released = self
            .staging
            .remove(&key)
            .map_err(|e| Error::staging("remove", &key, e));
        outcome.and(released)
    }

    /// Declares the counted length and copies the staged body back to
    /// the destination.
    fn emit_staged(&mut self, key: &str, body_len: u64) -> Result<()> {
        write!(self.dest, "Content-Length: {body_len}\n\n")?;
        let mut reader = self
            .staging
            .open_reader(key)
            .map_err(|e| Error::staging("open-reader", key, e))?;
        io::copy(&mut reader, &mut self.dest)?;
        Ok(())
    }
}

/// Copies header lines to the destination and body lines into the
/// staging writer, returning the staged byte count.
///
/// The header/body boundary is a line of at most two bytes that trims
/// to nothing; for the unquoted dialect a line containing any space or
/// tab stays part of the header instead. The boundary line itself is
/// consumed; the blank emitted after the `Content-Length` header
/// replaces it.
fn stage_message<W: Write, T: Write>(
    dest: &mut W,
    staged: &mut T,
    envelope: &Envelope,
    mail: &[u8],
    quote: bool,
    key: &str,
) -> Result<u64> {
    dest.write_all(envelope.to_line().as_bytes())?;
    dest.write_all(b"\n")?;

    let mut in_header = true;
    let mut count: u64 = 0;
    for raw in mail.split_inclusive(|&b| b == b'\n') {
        let quoted = quote && line::quoted_from_depth(raw).is_some();
        if in_header {
            if line::is_header_boundary(raw, !quote) {
                in_header = false;
                continue;
            }
            if quoted {
                dest.write_all(b">")?;
            }
            dest.write_all(raw)?;
            if !raw.ends_with(b"\n") {
                dest.write_all(b"\n")?;
            }
            continue;
        }

        let mut line_len = raw.len() as u64;
        if quoted {
            staged
                .write_all(b">")
                .map_err(|e| Error::staging("write", key, e))?;
            line_len += 1;
        }
        staged
            .write_all(raw)
            .map_err(|e| Error::staging("write", key, e))?;
        if !raw.ends_with(b"\n") {
            staged
                .write_all(b"\n")
                .map_err(|e| Error::staging("write", key, e))?;
            line_len += 1;
        }
        count += line_len;
    }
    staged
        .flush()
        .map_err(|e| Error::staging("write", key, e))?;
    Ok(count)
}
