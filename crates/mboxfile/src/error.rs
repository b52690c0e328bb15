//! Error types for mbox operations.

use std::io;

/// Result type alias for mbox operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Mbox error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A `Content-Length` header value failed integer parsing.
    ///
    /// Fatal for the current message only; messages already read or
    /// written through the same session are unaffected.
    #[error("invalid Content-Length value: {value:?}")]
    InvalidContentLength {
        /// The text that failed to parse.
        value: String,
    },

    /// The staging facility failed while buffering a message body.
    #[error("staging {operation} failed for key {key:?}: {source}")]
    Staging {
        /// Which staging operation failed (`open-writer`, `write`,
        /// `open-reader`, or `remove`).
        operation: &'static str,
        /// The staging key (the envelope address).
        key: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// No carriage return or line feed was found in the first kilobyte
    /// while sniffing; the stream is not line-oriented text.
    #[error("no carriage return or line feed in the first kilobyte")]
    NoLineEnding,
}

impl Error {
    /// Creates a staging error from a failed operation.
    pub(crate) fn staging(operation: &'static str, key: &str, source: io::Error) -> Self {
        Self::Staging {
            operation,
            key: key.to_string(),
            source,
        }
    }
}
