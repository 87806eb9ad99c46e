//! Contact sheet loading.
//!
//! The sheet is a CSV export with a header row. Spreadsheet tools in
//! pt-BR locales export with `;` and in Windows-1252, so the delimiter is
//! sniffed from the header line and cells are decoded lossily.

use log::info;
use std::borrow::Cow;
use std::path::Path;
use wa_dispatch::{ContactRecord, DispatchError, DispatchResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Load every row of `path`, in file order.
pub fn load_contacts(path: &Path, phone_column: &str) -> DispatchResult<Vec<ContactRecord>> {
    if !path.is_file() {
        return Err(DispatchError::file_not_found("Contact sheet", path));
    }
    let content = std::fs::read(path)?;
    let contacts = parse_contacts(&content, phone_column)?;
    info!("Read {} rows from {}", contacts.len(), path.display());
    Ok(contacts)
}

/// Parse CSV bytes; the phone column is looked up by header name.
///
/// Bytes that are not valid UTF-8 are replaced, so a legacy-encoded name
/// column never rejects the sheet.
pub fn parse_contacts(content: &[u8], phone_column: &str) -> DispatchResult<Vec<ContactRecord>> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(sniff_delimiter(content))
        .from_reader(content);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| lossy(h).into_owned())
        .collect();
    let column = headers
        .iter()
        .position(|h| h == phone_column)
        .ok_or_else(|| DispatchError::missing_column(phone_column, &headers))?;

    let mut contacts = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record?;
        let raw = record.get(column).filter(|v| !v.is_empty()).map(lossy);
        contacts.push(ContactRecord::new(idx + 1, raw.as_deref()));
    }
    Ok(contacts)
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn sniff_delimiter(content: &[u8]) -> u8 {
    let header = content.split(|b| *b == b'\n').next().unwrap_or_default();
    let semicolons = header.iter().filter(|b| **b == b';').count();
    let commas = header.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}
