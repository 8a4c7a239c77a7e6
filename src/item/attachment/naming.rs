//! Deterministic file names for extracted attachments.

use crate::model::scalar::optional_text;
use crate::model::MmsPart;

pub const PLACEHOLDER_STEM: &str = "attachment";
pub const FALLBACK_EXTENSION: &str = "bin";

/// The media type without parameters, lower-cased: `Image/JPEG; name=a` gives `image/jpeg`.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a part with this content type carries a file worth extracting.
///
/// Text and presentation (`application/smil`) parts are left out.
pub fn is_binary_content_type(content_type: &str) -> bool {
    let media_type = media_type(content_type);
    match media_type.split_once('/') {
        Some(("image" | "video" | "audio", _)) => true,
        Some(("application", subtype)) => subtype != "smil",
        _ => false,
    }
}

/// Whether a part will be extracted: a binary content type with a payload.
pub fn is_attachment(part: &MmsPart) -> bool {
    is_binary_content_type(&part.content_type) && part.has_payload()
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let media_type = media_type(content_type);
    let subtype = media_type.split_once('/')?.1;
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);

    let extension = match subtype {
        "jpeg" | "jpg" | "pjpeg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        "bmp" => "bmp",
        "webp" => "webp",
        "3gpp" | "3gpp2" => "3gp",
        "mp4" => "mp4",
        "amr" => "amr",
        "mpeg" | "mp3" => "mp3",
        "ogg" => "ogg",
        "vcard" => "vcf",
        "pdf" => "pdf",
        _ => return None,
    };
    Some(extension)
}

/// Last path component of a name as written by the phone.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            (stem, Some(extension))
        }
        _ => (name, None),
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn original_name(part: &MmsPart) -> Option<&str> {
    optional_text(&part.name)
        .or_else(|| optional_text(&part.file_name))
        .map(base_name)
        .filter(|name| !name.is_empty())
}

/// `<stem>_<message index>-<part index>.<extension>`.
///
/// The stem comes from the part's `name`, else its `fn`, else
/// [`PLACEHOLDER_STEM`]. The extension comes from the content type, else the
/// original name, else [`FALLBACK_EXTENSION`].
pub fn attachment_file_name(part: &MmsPart, mms_index: usize, part_index: usize) -> String {
    let (stem, original_extension) = original_name(part)
        .map(split_extension)
        .unwrap_or((PLACEHOLDER_STEM, None));

    let stem = sanitize(stem);
    let stem = if stem.trim_matches(['.', '_']).is_empty() {
        PLACEHOLDER_STEM.to_string()
    } else {
        stem
    };

    let extension = extension_for_content_type(&part.content_type)
        .map(str::to_string)
        .or_else(|| {
            original_extension
                .map(|ext| sanitize(ext).to_ascii_lowercase())
                .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    format!("{}_{}-{}.{}", stem, mms_index, part_index, extension)
}
