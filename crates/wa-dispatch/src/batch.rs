//! Sequential batch run: optional one-time upload, then one dispatch and
//! one reconciliation record per contact.

use crate::error::DispatchResult;
use crate::executor::{RetryPolicy, RetryingExecutor};
use crate::media::MediaUploader;
use crate::messaging::MessageDispatcher;
use crate::phone::normalize_phone;
use crate::reconcile::reconcile;
use crate::transport::{HttpTransport, Sleeper};
use crate::types::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Counts logged at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub matched: usize,
    /// Dispatched without error but the echoes did not agree.
    pub mismatched: usize,
    pub invalid_phone: usize,
    /// Dispatched and ended with an error.
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_records(records: &[ReconciliationRecord]) -> Self {
        let mut s = BatchSummary {
            total: records.len(),
            ..Default::default()
        };
        for rec in records {
            match (&rec.wa_id_sent, &rec.error, rec.match_verdict) {
                (None, _, _) => s.invalid_phone += 1,
                (Some(_), Some(_), _) => s.failed += 1,
                (Some(_), None, MatchVerdict::Yes) => s.matched += 1,
                (Some(_), None, MatchVerdict::No) => s.mismatched += 1,
            }
        }
        s
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One record per contact, in input order.
    pub records: Vec<ReconciliationRecord>,
    pub media_reference: Option<MediaReference>,
    pub summary: BatchSummary,
}

/// Drives a whole run against one messaging webhook.
pub struct BatchRunner {
    config: DispatchConfig,
    executor: RetryingExecutor,
}

impl BatchRunner {
    pub fn new(
        config: DispatchConfig,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let executor = RetryingExecutor::new(transport, sleeper, RetryPolicy::from_config(&config));
        Self { config, executor }
    }

    /// Upload the campaign image. Any error here is fatal for the run.
    pub async fn upload_media(&self, image: &Path) -> DispatchResult<MediaReference> {
        info!("Uploading image once to obtain media_id...");
        MediaUploader::new(self.executor.clone(), &self.config)?
            .upload_file(image)
            .await
    }

    /// Run the batch. Only the upload can fail; per-contact problems end
    /// up in the returned records.
    pub async fn run(
        &self,
        contacts: &[ContactRecord],
        image: Option<&Path>,
    ) -> DispatchResult<BatchReport> {
        let media_reference = match image {
            Some(path) => Some(self.upload_media(path).await?),
            None => None,
        };

        let dispatcher = MessageDispatcher::new(self.executor.clone(), &self.config);
        let delay = Duration::from_millis(self.config.inter_request_delay_ms);
        let total = contacts.len();
        info!("Loaded {} contacts, starting dispatch", total);

        let mut records = Vec::with_capacity(total);
        for (idx, contact) in contacts.iter().enumerate() {
            let raw = contact.raw_phone.as_deref();
            let Some(wa_id) = normalize_phone(raw) else {
                warn!(
                    "[{}/{}] row {}: invalid phone {:?}",
                    idx + 1,
                    total,
                    contact.row,
                    raw.unwrap_or("")
                );
                records.push(ReconciliationRecord::invalid_phone(raw));
                continue;
            };

            info!("[{}/{}] Sending to wa_id={} ...", idx + 1, total, wa_id);
            let request = DispatchRequest::new(wa_id.as_str(), media_reference.clone());
            let outcome = dispatcher.dispatch(&request).await;
            let record = reconcile(raw, &wa_id, &outcome);
            if !outcome.is_success() {
                warn!(
                    "[{}/{}] wa_id={} failed (status={:?}, error={:?})",
                    idx + 1,
                    total,
                    wa_id,
                    outcome.status_http,
                    outcome.error
                );
            } else if record.match_verdict == MatchVerdict::No {
                warn!(
                    "[{}/{}] wa_id={} not confirmed: input={:?} wa_id returned={:?}",
                    idx + 1,
                    total,
                    wa_id,
                    record.input_returned,
                    record.wa_id_returned
                );
            }
            records.push(record);

            if !delay.is_zero() {
                self.executor.pause(delay).await;
            }
        }

        let summary = BatchSummary::from_records(&records);
        info!(
            "Batch finished: {} contacts, {} matched, {} mismatched, {} invalid phone, {} failed",
            summary.total, summary.matched, summary.mismatched, summary.invalid_phone, summary.failed
        );

        Ok(BatchReport {
            records,
            media_reference,
            summary,
        })
    }
}

/// Order report rows: unconfirmed ("no") first, then by original phone
/// with absent phones last. The sort is stable, so ties keep input order.
pub fn sort_for_report(records: &mut [ReconciliationRecord]) {
    records.sort_by(|a, b| {
        verdict_rank(a.match_verdict)
            .cmp(&verdict_rank(b.match_verdict))
            .then_with(|| compare_phone(a, b))
    });
}

fn verdict_rank(v: MatchVerdict) -> u8 {
    match v {
        MatchVerdict::No => 0,
        MatchVerdict::Yes => 1,
    }
}

/// Absent phones go after every present one.
fn compare_phone(a: &ReconciliationRecord, b: &ReconciliationRecord) -> Ordering {
    match (a.original_phone.as_deref(), b.original_phone.as_deref()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
