use std::borrow::Cow;
use std::fmt::Write;

const REPLACEMENT: u32 = 0xFFFD;

/// Rewrites numeric character references that are not legal XML.
///
/// The exporter writes astral characters (emoji) as two references to UTF-16
/// surrogate halves, e.g. `&#55357;&#56832;`, and NUL as `&#0;`. A strict
/// parser rejects both, so before a subtree is deserialized:
///
/// - an adjacent surrogate pair is merged into one reference (`&#128512;`),
/// - a lone surrogate or an out-of-range code point becomes U+FFFD,
/// - `&#0;` is dropped.
///
/// Everything else, including malformed `&#` sequences, is copied unchanged.
pub(crate) fn repair_char_refs(input: &str) -> Cow<'_, str> {
    if !input.contains("&#") {
        return Cow::Borrowed(input);
    }

    let mut repaired = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("&#") {
        repaired.push_str(&rest[..start]);
        let tail = &rest[start..];

        let Some((code, len)) = parse_char_ref(tail) else {
            repaired.push_str("&#");
            rest = &tail[2..];
            continue;
        };
        let after = &tail[len..];

        if is_surrogate(code) {
            let pair = parse_char_ref(after)
                .and_then(|(next, next_len)| combine_surrogates(code, next).map(|c| (c, next_len)));
            match pair {
                Some((combined, next_len)) => {
                    push_ref(&mut repaired, combined);
                    rest = &after[next_len..];
                }
                None => {
                    push_ref(&mut repaired, REPLACEMENT);
                    rest = after;
                }
            }
        } else if code == 0 {
            rest = after;
        } else if char::from_u32(code).is_none() {
            push_ref(&mut repaired, REPLACEMENT);
            rest = after;
        } else {
            repaired.push_str(&tail[..len]);
            rest = after;
        }
    }

    repaired.push_str(rest);
    Cow::Owned(repaired)
}

/// Parses `&#NNN;` or `&#xHHH;` at the start of `s`, returning the code
/// point and the byte length of the reference.
fn parse_char_ref(s: &str) -> Option<(u32, usize)> {
    let body = s.strip_prefix("&#")?;
    let end = body.bytes().take(10).position(|b| b == b';')?;
    let digits = &body[..end];

    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u32::from_str_radix(hex, 16).ok()?
        }
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse().ok()?
        }
        _ => return None,
    };

    Some((code, 2 + end + 1))
}

fn is_surrogate(code: u32) -> bool {
    (0xD800..=0xDFFF).contains(&code)
}

fn combine_surrogates(first: u32, second: u32) -> Option<u32> {
    let (high, low) = match (first, second) {
        (0xD800..=0xDBFF, 0xDC00..=0xDFFF) => (first, second),
        (0xDC00..=0xDFFF, 0xD800..=0xDBFF) => (second, first),
        _ => return None,
    };
    Some(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
}

fn push_ref(out: &mut String, code: u32) {
    let _ = write!(out, "&#{};", code);
}
