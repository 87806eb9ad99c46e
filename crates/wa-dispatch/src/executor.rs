//! Bounded-retry request executor shared by the upload and messaging
//! clients.
//!
//! Per attempt:
//! - transport failure → warn, exponential backoff, retry
//! - `200` → success; the body is parsed as JSON but a parse failure is
//!   reported to the caller rather than retried
//! - `429` → fixed cooldown instead of the backoff, retry
//! - any other status → warn with the body, exponential backoff, retry
//!
//! Every attempt counts against the budget, 429s included. No pause is
//! taken after the final attempt.

use crate::transport::{HttpTransport, OutboundRequest, Sleeper, TransportResponse};
use crate::types::DispatchConfig;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

const HTTP_OK: u16 = 200;
const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Retry budget and pause lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Backoff after attempt `n` (0-based) is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    pub rate_limit_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            rate_limit_cooldown: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_sec),
            ..Self::default()
        }
    }

    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

/// A `200` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSuccess {
    pub status: u16,
    pub json: Option<serde_json::Value>,
    pub raw_text: String,
    /// Set when the body was not valid JSON.
    pub parse_error: Option<String>,
}

impl HttpSuccess {
    fn from_response(resp: TransportResponse) -> Self {
        match serde_json::from_str::<serde_json::Value>(&resp.body) {
            Ok(json) => Self {
                status: resp.status,
                json: Some(json),
                raw_text: resp.body,
                parse_error: None,
            },
            Err(e) => Self {
                status: resp.status,
                json: None,
                raw_text: resp.body,
                parse_error: Some(e.to_string()),
            },
        }
    }
}

/// Every attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    /// Status of the last attempt that got an HTTP answer.
    pub last_status: Option<u16>,
    /// Last body received, or the last transport error text.
    pub last_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success(HttpSuccess),
    Exhausted(RetryExhausted),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }
}

/// Runs one logical request under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryingExecutor {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RetryingExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Sleep through the shared sleeper (also used for the batch delay).
    pub async fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration).await;
    }

    /// Execute `request`; `context` labels log lines (e.g. `wa_id=...`).
    pub async fn execute(&self, request: &OutboundRequest, context: &str) -> ExecutionResult {
        let max = self.policy.max_attempts.max(1);
        let mut last_status = None;
        let mut last_text = None;

        for attempt in 0..max {
            debug!(
                "{} {} [{}] (attempt {}/{})",
                request.method,
                request.url,
                context,
                attempt + 1,
                max
            );
            let is_last = attempt + 1 == max;

            match self.transport.send(request).await {
                Ok(resp) if resp.status == HTTP_OK => {
                    return ExecutionResult::Success(HttpSuccess::from_response(resp));
                }
                Ok(resp) if resp.status == HTTP_TOO_MANY_REQUESTS => {
                    warn!(
                        "Rate limited (429) [{}], waiting {:?}",
                        context, self.policy.rate_limit_cooldown
                    );
                    last_status = Some(resp.status);
                    last_text = Some(resp.body);
                    if !is_last {
                        self.sleeper.sleep(self.policy.rate_limit_cooldown).await;
                    }
                    continue;
                }
                Ok(resp) => {
                    warn!("HTTP {} [{}]: {}", resp.status, context, resp.body);
                    last_status = Some(resp.status);
                    last_text = Some(resp.body);
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed [{}]: {}", attempt + 1, max, context, e);
                    last_text = Some(e.message);
                }
            }

            if !is_last {
                self.sleeper.sleep(self.policy.backoff_delay(attempt)).await;
            }
        }

        warn!("Giving up [{}] after {} attempts", context, max);
        ExecutionResult::Exhausted(RetryExhausted {
            attempts: max,
            last_status,
            last_text,
        })
    }
}
