//! Configuration, request and record types shared by the dispatch pipeline.

use crate::error::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};

/// Marker used by n8n for test-mode webhooks, which only answer a single
/// call after "Listen for test event" and so cannot serve a batch.
pub const TEST_WEBHOOK_MARKER: &str = "webhook-test";

/// Error text recorded for contacts whose phone could not be normalised.
pub const INVALID_PHONE_ERROR: &str = "invalid phone";

// ═══════════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════════

/// Connection settings for the messaging and upload webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Messaging workflow webhook (production URL).
    pub webhook_url: String,
    /// Image upload workflow webhook. Required only when an image is sent.
    #[serde(default)]
    pub upload_url: Option<String>,
    /// Basic-auth user for both webhooks.
    pub username: String,
    /// Basic-auth password for both webhooks.
    pub password: String,
    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_sec: u64,
    /// Attempts per logical request, 429 responses included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed pause after a 429 before the next attempt.
    #[serde(default = "default_cooldown")]
    pub rate_limit_cooldown_sec: u64,
    /// Pause after each contact that issued a request.
    #[serde(default = "default_delay_ms")]
    pub inter_request_delay_ms: u64,
    /// Multipart field the upload workflow reads the binary from.
    #[serde(default = "default_upload_field")]
    pub upload_field: String,
}

fn default_timeout() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_cooldown() -> u64 {
    5
}
fn default_delay_ms() -> u64 {
    500
}
fn default_upload_field() -> String {
    "file".to_string()
}

impl DispatchConfig {
    /// Config with the given endpoint and credentials and default tuning.
    pub fn new(
        webhook_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            upload_url: None,
            username: username.into(),
            password: password.into(),
            timeout_sec: default_timeout(),
            max_retries: default_max_retries(),
            rate_limit_cooldown_sec: default_cooldown(),
            inter_request_delay_ms: default_delay_ms(),
            upload_field: default_upload_field(),
        }
    }

    /// Reject configurations that cannot run a batch.
    ///
    /// `image_configured` tells whether the run will upload an image.
    pub fn validate(&self, image_configured: bool) -> DispatchResult<()> {
        let required = [
            ("webhook URL (URL_N8N)", &self.webhook_url),
            ("username (USUARIO_N8N)", &self.username),
            ("password (SENHA_N8N)", &self.password),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(DispatchError::invalid_config(format!(
                    "{} is not set or empty",
                    name
                )));
            }
        }

        let upload_url = self
            .upload_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        if image_configured && upload_url.is_none() {
            return Err(DispatchError::invalid_config(
                "An image was configured (FOTO) but the upload URL (URL_N8N_IMG_POST) is not set",
            ));
        }

        if let Some(url) = upload_url {
            if url.contains(TEST_WEBHOOK_MARKER) {
                return Err(DispatchError::invalid_config(
                    "Upload URL points at a test webhook; use the production /webhook/ URL and activate the workflow",
                ));
            }
        }
        if self.webhook_url.contains(TEST_WEBHOOK_MARKER) {
            return Err(DispatchError::invalid_config(
                "Messaging URL points at a test webhook; use the production /webhook/ URL and activate the workflow",
            ));
        }

        if self.max_retries == 0 {
            return Err(DispatchError::invalid_config("max_retries must be at least 1"));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Requests & outcomes
// ═══════════════════════════════════════════════════════════════════════

/// One row of the contact sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Phone cell as read; `None` for an empty cell.
    pub raw_phone: Option<String>,
}

impl ContactRecord {
    pub fn new(row: usize, raw_phone: Option<&str>) -> Self {
        Self {
            row,
            raw_phone: raw_phone.map(String::from),
        }
    }
}

/// Opaque token for an image uploaded once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body posted to the messaging workflow for one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub wa_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<MediaReference>,
}

impl DispatchRequest {
    pub fn new(wa_id: impl Into<String>, media_id: Option<MediaReference>) -> Self {
        Self {
            wa_id: wa_id.into(),
            media_id,
        }
    }
}

/// Result of one messaging call. Never an error: remote and transport
/// failures are described by `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// HTTP status of the successful attempt; `None` when every attempt failed.
    pub status_http: Option<u16>,
    /// Parsed body, when it was valid JSON.
    pub json: Option<serde_json::Value>,
    /// Last body text received, or the last transport error.
    pub raw_text: Option<String>,
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.status_http == Some(200) && self.error.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Reconciliation
// ═══════════════════════════════════════════════════════════════════════

/// Identifiers echoed by the messaging workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoFields {
    /// `contacts[0].input`
    pub input: Option<String>,
    /// `contacts[0].wa_id`
    pub wa_id: Option<String>,
    /// `messages[0].id`
    pub message_id: Option<String>,
    /// `messages[0].message_status`
    pub message_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchVerdict {
    Yes,
    No,
}

impl MatchVerdict {
    /// `Yes` only when both echoes are present and equal.
    pub fn from_echo(input: Option<&str>, wa_id: Option<&str>) -> Self {
        match (input, wa_id) {
            (Some(i), Some(w)) if i == w => MatchVerdict::Yes,
            _ => MatchVerdict::No,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchVerdict::Yes => "yes",
            MatchVerdict::No => "no",
        }
    }
}

/// One report row per contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub original_phone: Option<String>,
    pub wa_id_sent: Option<String>,
    pub input_returned: Option<String>,
    pub wa_id_returned: Option<String>,
    #[serde(rename = "match")]
    pub match_verdict: MatchVerdict,
    pub http_status: Option<u16>,
    pub message_status: Option<String>,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl ReconciliationRecord {
    /// Terminal record for a contact the normalizer rejected.
    pub fn invalid_phone(original_phone: Option<&str>) -> Self {
        Self {
            original_phone: original_phone.map(String::from),
            wa_id_sent: None,
            input_returned: None,
            wa_id_returned: None,
            match_verdict: MatchVerdict::No,
            http_status: None,
            message_status: None,
            message_id: None,
            error: Some(INVALID_PHONE_ERROR.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DispatchConfig {
        DispatchConfig::new("https://n8n.example.com/webhook/msg", "bot", "secret")
    }

    #[test]
    fn test_config_defaults_from_json() {
        let json = r#"{"webhookUrl":"https://h/webhook/a","username":"u","password":"p"}"#;
        let config: DispatchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout_sec, 60);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rate_limit_cooldown_sec, 5);
        assert_eq!(config.inter_request_delay_ms, 500);
        assert_eq!(config.upload_field, "file");
        assert!(config.upload_url.is_none());
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate(false).is_ok());
    }

    #[test]
    fn test_validate_missing_credentials() {
        let mut config = valid_config();
        config.password = "  ".into();
        let err = config.validate(false).unwrap_err();
        assert!(err.message.contains("password"));
    }

    #[test]
    fn test_validate_image_without_upload_url() {
        let err = valid_config().validate(true).unwrap_err();
        assert!(err.message.contains("URL_N8N_IMG_POST"));
    }

    #[test]
    fn test_validate_rejects_test_webhooks() {
        let mut config = valid_config();
        config.upload_url = Some("https://n8n.example.com/webhook-test/img".into());
        assert!(config.validate(true).is_err());

        let mut config = valid_config();
        config.webhook_url = "https://n8n.example.com/webhook-test/msg".into();
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_validate_zero_retries() {
        let mut config = valid_config();
        config.max_retries = 0;
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_match_verdict() {
        assert_eq!(
            MatchVerdict::from_echo(Some("5511999998888"), Some("5511999998888")),
            MatchVerdict::Yes
        );
        assert_eq!(MatchVerdict::from_echo(Some("5511999998888"), None), MatchVerdict::No);
        assert_eq!(MatchVerdict::from_echo(None, None), MatchVerdict::No);
        assert_eq!(
            MatchVerdict::from_echo(Some("551199999888"), Some("5511999998888")),
            MatchVerdict::No
        );
    }

    #[test]
    fn test_dispatch_request_omits_missing_media() {
        let body = serde_json::to_value(DispatchRequest::new("5511988887777", None)).unwrap();
        assert_eq!(body, serde_json::json!({ "wa_id": "5511988887777" }));

        let body = serde_json::to_value(DispatchRequest::new(
            "5511988887777",
            Some(MediaReference::new("m-1")),
        ))
        .unwrap();
        assert_eq!(body["media_id"], "m-1");
    }

    #[test]
    fn test_invalid_phone_record() {
        let rec = ReconciliationRecord::invalid_phone(Some("abc"));
        assert_eq!(rec.match_verdict, MatchVerdict::No);
        assert_eq!(rec.error.as_deref(), Some(INVALID_PHONE_ERROR));
        assert!(rec.wa_id_sent.is_none());
        assert!(rec.http_status.is_none());
    }
}
