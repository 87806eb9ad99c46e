//! Reconciliation report writer.

use log::info;
use std::path::Path;
use wa_dispatch::{sort_for_report, DispatchResult, ReconciliationRecord};

pub const REPORT_HEADERS: [&str; 9] = [
    "original_phone",
    "wa_id_sent",
    "input_returned",
    "wa_id_returned",
    "match",
    "http_status",
    "message_status",
    "message_id",
    "error",
];

/// Write `records` as CSV to `path`, sorted for review. The caller's
/// slice keeps its order.
pub fn write_report(path: &Path, records: &[ReconciliationRecord]) -> DispatchResult<()> {
    let mut sorted = records.to_vec();
    sort_for_report(&mut sorted);
    let file = std::fs::File::create(path)?;
    write_records(file, &sorted)?;
    info!("Report saved to {}", path.display());
    Ok(())
}

/// Write `records` in their current order. The header row is always
/// written, even for an empty run.
pub fn write_records<W: std::io::Write>(
    writer: W,
    records: &[ReconciliationRecord],
) -> DispatchResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(REPORT_HEADERS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
