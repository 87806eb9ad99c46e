//! Per-contact call to the messaging workflow.
//!
//! Unlike the upload, a failed contact never aborts the batch: every
//! path ends in a [`DispatchOutcome`].

use crate::executor::{ExecutionResult, RetryingExecutor};
use crate::transport::{BasicAuth, OutboundRequest};
use crate::types::{DispatchConfig, DispatchOutcome, DispatchRequest};
use log::{debug, warn};

pub const ERR_INVALID_JSON: &str = "response 200 but body is not valid JSON";
pub const ERR_MAX_RETRIES: &str = "max retries exceeded";

/// Posts `{"wa_id", "media_id"?}` to the messaging webhook.
pub struct MessageDispatcher {
    executor: RetryingExecutor,
    url: String,
    auth: BasicAuth,
}

impl MessageDispatcher {
    pub fn new(executor: RetryingExecutor, config: &DispatchConfig) -> Self {
        Self {
            executor,
            url: config.webhook_url.clone(),
            auth: BasicAuth::from_config(config),
        }
    }

    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome {
        let payload = match serde_json::to_value(request) {
            Ok(v) => v,
            Err(e) => {
                return DispatchOutcome {
                    error: Some(format!("could not encode request: {}", e)),
                    ..DispatchOutcome::default()
                }
            }
        };
        let outbound = OutboundRequest::post_json(&self.url, Some(self.auth.clone()), payload);
        let context = format!("wa_id={}", request.wa_id);

        match self.executor.execute(&outbound, &context).await {
            ExecutionResult::Success(success) => {
                debug!("Dispatched {}: {}", context, success.raw_text);
                let error = success.parse_error.as_ref().map(|e| {
                    warn!("Unparseable 200 body [{}]: {}", context, e);
                    ERR_INVALID_JSON.to_string()
                });
                DispatchOutcome {
                    status_http: Some(success.status),
                    json: success.json,
                    raw_text: Some(success.raw_text),
                    error,
                }
            }
            ExecutionResult::Exhausted(exhausted) => DispatchOutcome {
                status_http: None,
                json: None,
                raw_text: exhausted.last_text,
                error: Some(ERR_MAX_RETRIES.to_string()),
            },
        }
    }
}
