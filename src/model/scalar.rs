//! Lenient scalar types used by the record model.
//!
//! Backups produced by different versions of the exporting app disagree on how
//! some attributes are encoded. None of the types in this module can fail to
//! deserialize: anything that cannot be understood is kept verbatim in an
//! `Unknown`/`Malformed` variant so it can be reported later.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Returns `None` for an empty value or the literal `null` written by the exporter.
pub fn optional_text(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "null" {
        None
    } else {
        Some(value)
    }
}

/// An integer attribute such as a duration or an epoch timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Number {
    Value(i64),
    /// Attribute absent, empty or `null`.
    #[default]
    Missing,
    /// Attribute present but not an integer; the raw text is kept.
    Malformed(String),
}

impl Number {
    pub fn parse(raw: &str) -> Self {
        let Some(text) = optional_text(raw) else {
            return Number::Missing;
        };
        match text.trim().parse::<i64>() {
            Ok(value) => Number::Value(value),
            Err(_) => Number::Malformed(raw.to_string()),
        }
    }

    pub fn get(&self) -> Option<i64> {
        match self {
            Number::Value(value) => Some(*value),
            _ => None,
        }
    }

    /// The value, or the sentinel `0` when absent or malformed.
    pub fn value_or_zero(&self) -> i64 {
        self.get().unwrap_or(0)
    }

    pub(crate) fn fallback(&self) -> Option<&str> {
        match self {
            Number::Malformed(raw) => Some(raw),
            _ => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Value(value) => write!(f, "{}", value),
            Number::Missing | Number::Malformed(_) => Ok(()),
        }
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Number::parse(&raw))
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub Number);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(Number::Value(millis))
    }

    pub fn millis(&self) -> Option<i64> {
        self.0.get()
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        self.millis().and_then(DateTime::from_timestamp_millis)
    }

    /// Human readable UTC rendering, e.g. `2018-02-13 13:55:42 UTC`.
    pub fn rendered(&self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    }

    pub(crate) fn fallback(&self) -> Option<&str> {
        self.0.fallback()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A bool-like attribute (`0`/`1`, sometimes `true`/`false`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    True,
    False,
    Unknown(String),
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Unknown(String::new())
    }
}

impl Flag {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "1" | "true" | "TRUE" | "True" => Flag::True,
            "0" | "false" | "FALSE" | "False" => Flag::False,
            other => Flag::Unknown(other.to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Flag::True => Some(true),
            Flag::False => Some(false),
            Flag::Unknown(_) => None,
        }
    }

    pub(crate) fn fallback(&self) -> Option<&str> {
        match self {
            Flag::Unknown(raw) => optional_text(raw),
            _ => None,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::True => f.write_str("true"),
            Flag::False => f.write_str("false"),
            Flag::Unknown(_) => Ok(()),
        }
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Flag::parse(&raw))
    }
}

/// Declares a closed code table whose unrecognized codes map to `Unknown(raw)`.
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($code:literal => $variant:ident : $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// A code outside the known table, kept verbatim.
            Unknown(String),
        }

        impl $name {
            pub fn from_code(raw: &str) -> Self {
                match raw.trim() {
                    $($code => $name::$variant,)+
                    other => $name::Unknown(other.to_string()),
                }
            }

            /// The code as written in the backup.
            pub fn code(&self) -> &str {
                match self {
                    $($name::$variant => $code,)+
                    $name::Unknown(raw) => raw,
                }
            }

            pub fn is_unknown(&self) -> bool {
                matches!(self, $name::Unknown(_))
            }

            pub(crate) fn fallback(&self) -> Option<&str> {
                match self {
                    $name::Unknown(raw) => optional_text(raw),
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::Unknown(String::new())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($name::$variant => f.write_str($label),)+
                    $name::Unknown(raw) if raw.is_empty() => f.write_str("Unknown"),
                    $name::Unknown(raw) => write!(f, "Unknown({})", raw),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from_code(&raw))
            }
        }
    };
}

coded_enum! {
    /// Mailbox of a single-recipient message.
    MessageType {
        "1" => Inbox: "Received",
        "2" => Sent: "Sent",
        "3" => Draft: "Draft",
        "4" => Outbox: "Outbox",
        "5" => Failed: "Failed",
        "6" => Queued: "Queued",
    }
}

coded_enum! {
    /// Delivery status of a single-recipient message.
    MessageStatus {
        "-1" => None: "None",
        "0" => Complete: "Complete",
        "32" => Pending: "Pending",
        "64" => Failed: "Failed",
    }
}

coded_enum! {
    ReadState {
        "0" => Unread: "Unread",
        "1" => Read: "Read",
    }
}

coded_enum! {
    /// Role of one recipient address of a multi-recipient message.
    AddressType {
        "129" => Bcc: "BCC",
        "130" => Cc: "CC",
        "137" => From: "From",
        "151" => To: "To",
    }
}

coded_enum! {
    CallType {
        "1" => Incoming: "Incoming",
        "2" => Outgoing: "Outgoing",
        "3" => Missed: "Missed",
        "4" => Voicemail: "Voicemail",
        "5" => Rejected: "Rejected",
        "6" => Blocked: "Blocked",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_call_type_keeps_raw_code() {
        let call_type = CallType::from_code("42");
        assert_eq!(call_type, CallType::Unknown("42".to_string()));
        assert_eq!(call_type.code(), "42");
        assert_eq!(call_type.to_string(), "Unknown(42)");
        assert_eq!(call_type.fallback(), Some("42"));
    }

    #[test]
    fn known_codes_decode() {
        assert_eq!(MessageType::from_code("2"), MessageType::Sent);
        assert_eq!(MessageStatus::from_code("-1"), MessageStatus::None);
        assert_eq!(ReadState::from_code(" 1 "), ReadState::Read);
        assert_eq!(AddressType::from_code("137"), AddressType::From);
        assert_eq!(CallType::from_code("6"), CallType::Blocked);
    }

    #[test]
    fn missing_code_is_not_a_fallback() {
        assert_eq!(MessageType::default().fallback(), None);
        assert_eq!(MessageType::from_code("null").fallback(), None);
        assert_eq!(MessageType::default().to_string(), "Unknown");
    }

    #[test]
    fn number_parsing_is_lenient() {
        assert_eq!(Number::parse("1518530142000"), Number::Value(1518530142000));
        assert_eq!(Number::parse("null"), Number::Missing);
        assert_eq!(Number::parse(""), Number::Missing);
        assert_eq!(Number::parse("12abc"), Number::Malformed("12abc".to_string()));
        assert_eq!(Number::parse("12abc").value_or_zero(), 0);
        assert_eq!(Number::parse("12abc").to_string(), "");
    }

    #[test]
    fn timestamp_renders_utc() {
        let ts = Timestamp::from_millis(0);
        assert_eq!(ts.rendered().as_deref(), Some("1970-01-01 00:00:00 UTC"));
        assert_eq!(Timestamp::default().rendered(), None);
    }

    #[test]
    fn flags_accept_both_spellings() {
        assert_eq!(Flag::parse("1"), Flag::True);
        assert_eq!(Flag::parse("false"), Flag::False);
        assert_eq!(Flag::parse("maybe").fallback(), Some("maybe"));
        assert_eq!(Flag::parse("").as_bool(), None);
    }

    #[test]
    fn optional_text_treats_null_as_absent() {
        assert_eq!(optional_text("null"), None);
        assert_eq!(optional_text("  "), None);
        assert_eq!(optional_text("+15551234567"), Some("+15551234567"));
    }
}
