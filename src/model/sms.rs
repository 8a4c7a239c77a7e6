use serde::Deserialize;

use super::scalar::{Flag, MessageStatus, MessageType, ReadState, Timestamp};

/// A single-recipient text message (`<sms>` element).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Sms {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    /// Raw phone number as written by the exporter.
    #[serde(rename = "@address")]
    pub address: String,
    #[serde(rename = "@type")]
    pub message_type: MessageType,
    #[serde(rename = "@subject")]
    pub subject: String,
    #[serde(rename = "@body")]
    pub body: String,
    #[serde(rename = "@service_center")]
    pub service_center: String,
    #[serde(rename = "@status")]
    pub status: MessageStatus,
    #[serde(rename = "@read")]
    pub read: ReadState,
    #[serde(rename = "@date")]
    pub date: Timestamp,
    #[serde(rename = "@locked")]
    pub locked: Flag,
    #[serde(rename = "@date_sent")]
    pub date_sent: Timestamp,
    #[serde(rename = "@readable_date")]
    pub readable_date: String,
    /// Display name; may itself contain commas.
    #[serde(rename = "@contact_name")]
    pub contact_name: String,
}

impl Sms {
    pub(crate) fn fallbacks(&self) -> Vec<(&'static str, String)> {
        [
            ("type", self.message_type.fallback()),
            ("status", self.status.fallback()),
            ("read", self.read.fallback()),
            ("date", self.date.fallback()),
            ("locked", self.locked.fallback()),
            ("date_sent", self.date_sent.fallback()),
        ]
        .into_iter()
        .filter_map(|(field, raw)| raw.map(|raw| (field, raw.to_string())))
        .collect()
    }
}
