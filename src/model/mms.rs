use serde::{Deserialize, Deserializer};

use super::scalar::{optional_text, AddressType, Flag, ReadState, Timestamp};
use super::text::{split_addresses, split_contact_names};

/// A multi-recipient message with its parts (`<mms>` element).
///
/// `addresses` and `parts` keep the order of the nested `<addr>` and `<part>`
/// elements in the source document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Mms {
    #[serde(rename = "@text_only")]
    pub text_only: Flag,
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
    /// Comma-joined display names, see [`Mms::contact_names`].
    #[serde(rename = "@contact_name")]
    pub contact_name: String,
    #[serde(rename = "@seen")]
    pub seen: Flag,
    #[serde(rename = "@from_address")]
    pub from_address: String,
    /// Tilde-joined raw recipient numbers, see [`Mms::recipient_numbers`].
    #[serde(rename = "@address")]
    pub address: String,
    #[serde(rename = "@m_cls", alias = "@message_classifier")]
    pub message_classifier: String,
    #[serde(rename = "@m_size", alias = "@message_size")]
    pub message_size: String,
    #[serde(rename = "addrs", deserialize_with = "address_list")]
    pub addresses: Vec<MmsAddress>,
    #[serde(rename = "parts", deserialize_with = "part_list")]
    pub parts: Vec<MmsPart>,
}

/// One `<addr>` entry of a multi-recipient message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MmsAddress {
    #[serde(rename = "@address")]
    pub address: String,
    #[serde(rename = "@type")]
    pub address_type: AddressType,
    #[serde(rename = "@charset")]
    pub charset: String,
}

/// One payload unit of a multi-recipient message.
///
/// The base64 payload is carried undecoded; sinks decode it when they need
/// the bytes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MmsPart {
    #[serde(rename = "@ct", alias = "@content_type")]
    pub content_type: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@fn", alias = "@file_name")]
    pub file_name: String,
    #[serde(rename = "@cd", alias = "@content_display")]
    pub content_display: String,
    #[serde(rename = "@text")]
    pub text: String,
    #[serde(rename = "@data")]
    pub data: String,
}

impl MmsPart {
    pub fn has_payload(&self) -> bool {
        optional_text(&self.data).is_some()
    }
}

fn address_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<MmsAddress>, D::Error> {
    #[derive(Deserialize)]
    struct AddressList {
        #[serde(rename = "addr", default)]
        items: Vec<MmsAddress>,
    }
    Ok(AddressList::deserialize(deserializer)?.items)
}

fn part_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<MmsPart>, D::Error> {
    #[derive(Deserialize)]
    struct PartList {
        #[serde(rename = "part", default)]
        items: Vec<MmsPart>,
    }
    Ok(PartList::deserialize(deserializer)?.items)
}

impl Mms {
    /// Raw recipient numbers, in source order.
    pub fn recipient_numbers(&self) -> Vec<&str> {
        split_addresses(&self.address)
    }

    /// Display names, in source order, after suffix-comma cleanup.
    pub fn contact_names(&self) -> Vec<String> {
        split_contact_names(&self.contact_name)
    }

    pub(crate) fn fallbacks(&self) -> Vec<(&'static str, String)> {
        let mut fallbacks: Vec<(&'static str, String)> = [
            ("text_only", self.text_only.fallback()),
            ("read", self.read.fallback()),
            ("date", self.date.fallback()),
            ("locked", self.locked.fallback()),
            ("date_sent", self.date_sent.fallback()),
            ("seen", self.seen.fallback()),
        ]
        .into_iter()
        .filter_map(|(field, raw)| raw.map(|raw| (field, raw.to_string())))
        .collect();

        fallbacks.extend(
            self.addresses
                .iter()
                .filter_map(|addr| addr.address_type.fallback())
                .map(|raw| ("addr.type", raw.to_string())),
        );
        fallbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_fields_split() {
        let mms = Mms {
            address: "+15551234567~+15559876543".to_string(),
            contact_name: "Alice, Bob".to_string(),
            ..Default::default()
        };
        assert_eq!(mms.recipient_numbers(), vec!["+15551234567", "+15559876543"]);
        assert_eq!(mms.contact_names(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn null_data_is_not_a_payload() {
        let part = MmsPart {
            data: "null".to_string(),
            ..Default::default()
        };
        assert!(!part.has_payload());
    }
}
