//! # wa-dispatch: bulk WhatsApp dispatch through n8n webhooks
//!
//! Core of the `wa-bulk` tool. Sends one message per contact through an
//! n8n workflow that fronts the WhatsApp Cloud API, then reconciles what
//! was sent with what the workflow echoed back.
//!
//! ## Pieces
//!
//! - **Phone** – raw spreadsheet value → digits-only `wa_id` with the `55`
//!   country code.
//! - **Transport** – replayable request values, the reqwest transport and
//!   the injectable sleeper.
//! - **Executor** – bounded retries with exponential backoff and a fixed
//!   429 cooldown, shared by both webhook clients.
//! - **Media** – one multipart upload per run returning a `media_id`;
//!   failure aborts the run.
//! - **Messaging** – one JSON post per contact; never fails, always
//!   returns an outcome.
//! - **Reconcile** – tolerant decoding of bare / enveloped / list-wrapped
//!   responses and the match verdict.
//! - **Batch** – sequential orchestration, inter-request delay, report
//!   ordering.

pub mod error;
pub mod types;
pub mod phone;
pub mod transport;
pub mod executor;
pub mod media;
pub mod messaging;
pub mod reconcile;
pub mod batch;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports
pub use batch::{sort_for_report, BatchReport, BatchRunner, BatchSummary};
pub use error::{DispatchError, DispatchErrorCode, DispatchResult};
pub use transport::{HttpTransport, ReqwestTransport, Sleeper, TokioSleeper};
pub use types::*;
