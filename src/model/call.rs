use serde::Deserialize;

use super::scalar::{CallType, Number, Timestamp};

/// One entry of a call log backup (`<call>` element).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Call {
    #[serde(rename = "@number")]
    pub number: String,
    /// Duration in seconds.
    #[serde(rename = "@duration")]
    pub duration: Number,
    #[serde(rename = "@date")]
    pub date: Timestamp,
    #[serde(rename = "@type")]
    pub call_type: CallType,
    #[serde(rename = "@readable_date")]
    pub readable_date: String,
    #[serde(rename = "@contact_name")]
    pub contact_name: String,
}

impl Call {
    pub(crate) fn fallbacks(&self) -> Vec<(&'static str, String)> {
        [
            ("duration", self.duration.fallback()),
            ("date", self.date.fallback()),
            ("type", self.call_type.fallback()),
        ]
        .into_iter()
        .filter_map(|(field, raw)| raw.map(|raw| (field, raw.to_string())))
        .collect()
    }
}
