//! Phone normalisation into WhatsApp ids (`wa_id`).

use std::path::Path;

/// Brazilian country calling code.
pub const COUNTRY_CODE: &str = "55";

/// Total lengths of a prefixed number: area code plus 8 or 9 digits.
const PREFIXED_LENGTHS: [usize; 2] = [12, 13];
/// Lengths of a local number without the country code.
const LOCAL_LENGTHS: [usize; 2] = [10, 11];

/// Normalise a raw spreadsheet value into a digits-only `wa_id`.
///
/// Returns `None` when the value is missing or cannot be recognised.
/// Numbers that already carry the country code are returned unchanged
/// even when their length is off, so the mismatch shows up in the
/// reconciliation report instead of the contact disappearing.
pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    if digits.starts_with(COUNTRY_CODE) {
        if !PREFIXED_LENGTHS.contains(&digits.len()) {
            log::debug!("Prefixed number with unusual length {}: {}", digits.len(), digits);
        }
        return Some(digits);
    }

    if LOCAL_LENGTHS.contains(&digits.len()) {
        return Some(format!("{}{}", COUNTRY_CODE, digits));
    }

    None
}

/// MIME type for an image path, from its extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
