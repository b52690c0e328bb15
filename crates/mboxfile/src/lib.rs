//! # mboxfile
//!
//! Streaming reader, writer, and dialect detector for mbox files.
//!
//! An mbox file is a flat, append-only store of mail messages
//! concatenated into one text stream, each introduced by an envelope
//! line beginning with `From `. There is no single canonical mbox
//! format; four incompatible historical dialects disagree on how to
//! keep a body line that itself starts with `From ` from being
//! mistaken for a new envelope:
//!
//! - **mboxo** ([`Dialect::Original`]) quotes literal `From ` body
//!   lines with `>` on write and never un-quotes on read.
//! - **mboxrd** ([`Dialect::Quoted`]) adds one `>` to any `>*From `
//!   line on write and strips one on read, making quoting reversible.
//! - **mboxcl** ([`Dialect::ContentLengthQuoted`]) quotes like mboxrd
//!   and declares each body's exact byte length in a `Content-Length`
//!   header.
//! - **mboxcl2** ([`Dialect::ContentLengthUnquoted`]) declares
//!   `Content-Length` but does not quote at all.
//!
//! You will need to know which dialect to use when reading or writing
//! an mbox, for best results; [`Dialect::detect`] makes a best-effort
//! guess from the text itself.
//!
//! ## Reading
//!
//! ```ignore
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use mboxfile::{Dialect, MboxReader};
//!
//! let mut file = File::open("inbox.mbox")?;
//! let dialect = Dialect::detect(&mut file)?;
//!
//! let mut reader = MboxReader::new(dialect, BufReader::new(file));
//! let mut message = Vec::new();
//! while let Some(envelope) = reader.next_message(&mut message)? {
//!     println!("{envelope}: {} bytes", message.len());
//!     message.clear();
//! }
//! ```
//!
//! ## Writing
//!
//! ```ignore
//! use std::fs::File;
//!
//! use mboxfile::{Dialect, Envelope, MboxWriter};
//!
//! let file = File::create("outbox.mbox")?;
//! let mut writer = MboxWriter::new(Dialect::Quoted, file);
//!
//! let envelope = Envelope::parse("From pi@rpi.cu Mon Jul 04 19:23:45 2022");
//! writer.write_mail(&envelope, mail_bytes)?;
//! ```
//!
//! The two Content-Length dialects buffer each message body through a
//! [`Staging`] implementation while its transformed length is
//! computed; [`FileStaging`] (temporary files) is the default and
//! [`MemoryStaging`] keeps everything in memory.
//!
//! These routines do not concern themselves with file locking. You may
//! want to consider that while working with mbox files on systems that
//! might actively write to the file.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod detect;
mod dialect;
mod envelope;
mod error;
mod line;
mod reader;
mod staging;
mod writer;

pub use dialect::Dialect;
pub use envelope::{Envelope, TIME_FORMAT};
pub use error::{Error, Result};
pub use reader::MboxReader;
pub use staging::{FileStaging, MemoryStaging, MemoryWriter, Staging};
pub use writer::MboxWriter;
