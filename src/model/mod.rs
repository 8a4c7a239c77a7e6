//! Typed records decoded from a backup file.

mod call;
mod mms;
pub mod scalar;
mod sms;
pub mod text;

use std::fmt;

pub use call::Call;
pub use mms::{Mms, MmsAddress, MmsPart};
pub use scalar::{
    AddressType, CallType, Flag, MessageStatus, MessageType, Number, ReadState, Timestamp,
};
pub use sms::Sms;

/// Metadata carried by the root element of a backup file.
///
/// Every field is optional in the source; absence leaves the default value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupInfo {
    /// Expected record count as written, possibly unparseable.
    pub count: Option<String>,
    pub backup_set: String,
    pub backup_date: Timestamp,
}

impl BackupInfo {
    /// The `count` attribute as a number, when it parses.
    pub fn expected_count(&self) -> Option<u64> {
        self.count.as_deref().and_then(|count| count.trim().parse().ok())
    }
}

/// Which of the two backup document kinds a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupKind {
    /// Root `<smses>`, children `<sms>` and `<mms>`.
    Messages,
    /// Root `<calls>`, children `<call>`.
    Calls,
}

impl BackupKind {
    pub fn root_name(&self) -> &'static str {
        match self {
            BackupKind::Messages => "smses",
            BackupKind::Calls => "calls",
        }
    }

    pub(crate) fn from_root_name(name: &[u8]) -> Option<Self> {
        match name {
            b"smses" => Some(BackupKind::Messages),
            b"calls" => Some(BackupKind::Calls),
            _ => None,
        }
    }

    /// Guesses the kind from an exported file name: the app names its files
    /// `sms-<timestamp>.xml` and `calls-<timestamp>.xml`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.rsplit(['/', '\\']).next().unwrap_or(name).to_ascii_lowercase();
        if name.starts_with("calls") {
            Some(BackupKind::Calls)
        } else if name.starts_with("sms") {
            Some(BackupKind::Messages)
        } else {
            None
        }
    }

    /// Record kinds that may appear directly under the root.
    pub fn record_kinds(&self) -> &'static [RecordKind] {
        match self {
            BackupKind::Messages => &[RecordKind::Sms, RecordKind::Mms],
            BackupKind::Calls => &[RecordKind::Call],
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Messages => f.write_str("messages"),
            BackupKind::Calls => f.write_str("calls"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Sms,
    Mms,
    Call,
}

impl RecordKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            RecordKind::Sms => "sms",
            RecordKind::Mms => "mms",
            RecordKind::Call => "call",
        }
    }

    pub(crate) fn from_element_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sms" => Some(RecordKind::Sms),
            b"mms" => Some(RecordKind::Mms),
            b"call" => Some(RecordKind::Call),
            _ => None,
        }
    }
}

/// One decoded record, in the shape handed to every sink.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Sms(Sms),
    Mms(Mms),
    Call(Call),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Sms(_) => RecordKind::Sms,
            Record::Mms(_) => RecordKind::Mms,
            Record::Call(_) => RecordKind::Call,
        }
    }

    pub(crate) fn fallbacks(&self) -> Vec<(&'static str, String)> {
        match self {
            Record::Sms(sms) => sms.fallbacks(),
            Record::Mms(mms) => mms.fallbacks(),
            Record::Call(call) => call.fallbacks(),
        }
    }
}

/// A messages backup materialized in memory (aggregate mode).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Messages {
    pub info: BackupInfo,
    pub sms: Vec<Sms>,
    pub mms: Vec<Mms>,
}

/// A call log backup materialized in memory (aggregate mode).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calls {
    pub info: BackupInfo,
    pub calls: Vec<Call>,
}
