//! Encodings shared by the writers: base64 attachment payloads and the
//! serialized recipient list of a multi-recipient message.

use base64::{engine::general_purpose::STANDARD, DecodeError, Engine};
use serde::Serialize;

use crate::contact::canonical_number;
use crate::model::Mms;

/// Decodes a part payload, ignoring the line breaks some exporter versions
/// insert every 76 characters.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    if data.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        return STANDARD.decode(compact);
    }
    STANDARD.decode(data)
}

/// One entry of the serialized recipient list.
#[derive(Debug, Serialize)]
pub struct Recipient<'a> {
    pub address: String,
    pub raw_address: &'a str,
    #[serde(rename = "type")]
    pub address_type: String,
    pub charset: &'a str,
}

/// The `<addr>` entries of a message as a JSON array, in source order.
///
/// `address` is the canonical number; `raw_address` is kept as written.
pub fn recipients_json(mms: &Mms) -> serde_json::Result<String> {
    let recipients: Vec<Recipient<'_>> = mms
        .addresses
        .iter()
        .map(|addr| Recipient {
            address: canonical_number(&addr.address),
            raw_address: &addr.address,
            address_type: addr.address_type.to_string(),
            charset: &addr.charset,
        })
        .collect();
    serde_json::to_string(&recipients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AddressType, MmsAddress};

    #[test]
    fn wrapped_base64_is_accepted() {
        assert_eq!(decode_base64("AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_base64("AQ\nID").unwrap(), vec![1, 2, 3]);
        assert!(decode_base64("not base64!").is_err());
    }

    #[test]
    fn recipients_keep_source_order() {
        let mms = Mms {
            addresses: vec![
                MmsAddress {
                    address: "+1 555 123 4567".to_string(),
                    address_type: AddressType::From,
                    charset: "106".to_string(),
                },
                MmsAddress {
                    address: "5559876543".to_string(),
                    address_type: AddressType::To,
                    charset: "106".to_string(),
                },
            ],
            ..Default::default()
        };

        assert_eq!(
            recipients_json(&mms).unwrap(),
            r#"[{"address":"5551234567","raw_address":"+1 555 123 4567","type":"From","charset":"106"},{"address":"5559876543","raw_address":"5559876543","type":"To","charset":"106"}]"#
        );
    }
}
