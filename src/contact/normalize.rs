//! Phone number canonicalization.

/// Digits kept from the end of a longer number: a national number without its
/// country code.
pub const NATIONAL_DIGITS: usize = 10;

/// Display name the exporter writes when the phone had no contact for a number.
pub const UNKNOWN_NAME: &str = "(Unknown)";

/// Reduces a raw phone number to the key used to merge its representations.
///
/// Formatting is dropped (`+1 (555) 123-4567` and `555.123.4567` both become
/// `5551234567`) and only the last [`NATIONAL_DIGITS`] digits of a longer
/// number are kept, so the same number with and without its country code
/// lands on one key. Senders without any digit, such as short-code aliases,
/// are keyed by their trimmed, lower-cased text.
pub fn canonical_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return raw.trim().to_lowercase();
    }
    if digits.len() > NATIONAL_DIGITS {
        return digits[digits.len() - NATIONAL_DIGITS..].to_string();
    }
    digits
}

/// The name to record for a contact, with empty names mapped to [`UNKNOWN_NAME`].
pub fn display_name(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        UNKNOWN_NAME
    } else {
        trimmed
    }
}

pub fn is_unknown_name(name: &str) -> bool {
    name == UNKNOWN_NAME
}
