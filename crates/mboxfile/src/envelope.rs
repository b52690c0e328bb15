//! The `From ` envelope line separating messages in an mbox stream.

use std::fmt;

use chrono::NaiveDateTime;

/// Timestamp format used by mbox envelope lines, for use with chrono's
/// format and parse functions: three-letter weekday, three-letter
/// month, two-digit day, `HH:MM:SS`, four-digit year.
pub const TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Rendered width of [`TIME_FORMAT`], e.g. `Mon Jul 04 14:23:45 2022`.
const TIME_WIDTH: usize = 24;

/// The parsed form of an envelope line:
/// `From <address> <timestamp> <extra>`.
///
/// Parsing is lenient. The timestamp is optional; a line carrying less
/// text than the fixed timestamp width still yields the address, with
/// [`Envelope::timestamp`] left as `None`. A mailer might use the
/// parsed fields in some way, if needed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// The sending address, the first token after `From `.
    pub address: String,
    /// Delivery time, when the line carried a parsable timestamp.
    pub timestamp: Option<NaiveDateTime>,
    /// Free text following the timestamp field.
    pub extra: String,
}

impl Envelope {
    /// Creates an envelope from its component parts.
    pub fn new(
        address: impl Into<String>,
        timestamp: Option<NaiveDateTime>,
        extra: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            timestamp,
            extra: extra.into(),
        }
    }

    /// Parses an envelope line into its component parts.
    ///
    /// The leading `From ` literal is tolerated missing. The first
    /// token is the address; the next 24 characters (the rendered
    /// width of [`TIME_FORMAT`]) are parsed as the timestamp and
    /// anything after them becomes [`Envelope::extra`]. A remainder
    /// shorter than the timestamp field, or one that fails to parse,
    /// leaves the timestamp `None` without affecting the other fields.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let data = line.strip_prefix("From ").unwrap_or(line);
        let (address, remainder) = data.split_once(' ').unwrap_or((data, ""));
        let remainder = remainder.trim();

        let mut timestamp = None;
        let mut extra = "";
        if let Some(field) = remainder.get(..TIME_WIDTH) {
            timestamp = NaiveDateTime::parse_from_str(field.trim(), TIME_FORMAT).ok();
            extra = remainder.get(TIME_WIDTH..).unwrap_or_default();
        }

        Self {
            address: address.to_string(),
            timestamp,
            extra: extra.trim().to_string(),
        }
    }

    /// Formats the envelope as a `From ` line, without a terminator.
    ///
    /// A missing timestamp renders as the zero value (the Unix epoch).
    #[must_use]
    pub fn to_line(&self) -> String {
        let timestamp = self.timestamp.unwrap_or_default();
        if self.extra.is_empty() {
            format!("From {} {}", self.address, timestamp.format(TIME_FORMAT))
        } else {
            format!(
                "From {} {} {}",
                self.address,
                timestamp.format(TIME_FORMAT),
                self.extra
            )
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}
