//! The four mbox dialects.

use std::fmt;

/// One of the four historical mbox file formats.
///
/// The dialects share surface syntax (messages concatenated into one
/// stream, each introduced by a `From ` envelope line) but disagree on
/// how a body line that itself starts with `From ` is kept from being
/// mistaken for a new envelope.
///
/// A dialect is chosen once per reader or writer session. Mixing
/// dialects within one stream is undefined and goes undetected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dialect {
    /// mboxo, the original format. Writers quote literal `From ` body
    /// lines with a single `>`; readers perform no un-quoting, so a
    /// quoted line stays quoted.
    Original,
    /// mboxrd. Writers add one `>` to any line already matching
    /// `>*From `, readers strip one, making the transformation
    /// reversible.
    Quoted,
    /// mboxcl. Quotes like mboxrd and additionally declares the exact
    /// byte length of each message body in a `Content-Length` header.
    ContentLengthQuoted,
    /// mboxcl2. Declares `Content-Length` like mboxcl but performs no
    /// quoting at all; the declared length alone delimits the body.
    ContentLengthUnquoted,
}

impl Dialect {
    /// Returns the historical name of the dialect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "mboxo",
            Self::Quoted => "mboxrd",
            Self::ContentLengthQuoted => "mboxcl",
            Self::ContentLengthUnquoted => "mboxcl2",
        }
    }

    /// Returns true for the two dialects that declare a
    /// `Content-Length` header.
    #[must_use]
    pub const fn has_content_length(self) -> bool {
        matches!(self, Self::ContentLengthQuoted | Self::ContentLengthUnquoted)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_historical_names() {
        assert_eq!(Dialect::Original.to_string(), "mboxo");
        assert_eq!(Dialect::Quoted.to_string(), "mboxrd");
        assert_eq!(Dialect::ContentLengthQuoted.to_string(), "mboxcl");
        assert_eq!(Dialect::ContentLengthUnquoted.to_string(), "mboxcl2");
    }

    #[test]
    fn test_has_content_length() {
        assert!(!Dialect::Original.has_content_length());
        assert!(!Dialect::Quoted.has_content_length());
        assert!(Dialect::ContentLengthQuoted.has_content_length());
        assert!(Dialect::ContentLengthUnquoted.has_content_length());
    }
}
