//! Helpers for the free-text and joined multi-value fields of a backup.

use std::borrow::Cow;

/// Separator between raw recipient numbers in an MMS `address` attribute.
pub const ADDRESS_SEPARATOR: char = '~';

/// Separator between display names in a `contact_name` attribute.
pub const CONTACT_NAME_SEPARATOR: char = ',';

const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "md", "phd", "esq"];

/// Drops the comma in front of a personal suffix: `"Doe, Jr."` becomes `"Doe Jr."`.
///
/// Display names are joined with commas, so a suffix comma would otherwise
/// turn one person into two entries when the list is split.
pub fn remove_commas_before_suffixes(name: &str) -> Cow<'_, str> {
    if !name.contains(CONTACT_NAME_SEPARATOR) {
        return Cow::Borrowed(name);
    }

    let mut cleaned = String::with_capacity(name.len());
    for (i, ch) in name.char_indices() {
        if ch == CONTACT_NAME_SEPARATOR && is_followed_by_suffix(&name[i + 1..]) {
            continue;
        }
        cleaned.push(ch);
    }
    Cow::Owned(cleaned)
}

fn is_followed_by_suffix(rest: &str) -> bool {
    let token: String = rest
        .trim_start()
        .chars()
        .take_while(|c| *c != CONTACT_NAME_SEPARATOR && !c.is_whitespace())
        .collect();
    let token = token.trim_end_matches('.').to_ascii_lowercase();
    NAME_SUFFIXES.contains(&token.as_str())
}

/// Splits a comma-joined display-name list.
///
/// Not validated against names that contain a literal comma; callers must
/// compare the result length against the recipient list before pairing.
pub fn split_contact_names(joined: &str) -> Vec<String> {
    if joined.trim().is_empty() {
        return Vec::new();
    }
    remove_commas_before_suffixes(joined)
        .split(CONTACT_NAME_SEPARATOR)
        .map(|name| name.trim().to_string())
        .collect()
}

/// Splits a tilde-joined raw recipient list.
pub fn split_addresses(joined: &str) -> Vec<&str> {
    if joined.trim().is_empty() {
        return Vec::new();
    }
    joined.split(ADDRESS_SEPARATOR).map(str::trim).collect()
}

/// Escapes CR, LF and TAB so the value fits in one tab-delimited cell.
pub fn clean_cell(value: &str) -> Cow<'_, str> {
    if !value.contains(['\r', '\n', '\t']) {
        return Cow::Borrowed(value);
    }

    let mut cleaned = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\r' => cleaned.push_str("\\r"),
            '\n' => cleaned.push_str("\\n"),
            '\t' => cleaned.push_str("\\t"),
            other => cleaned.push(other),
        }
    }
    Cow::Owned(cleaned)
}
