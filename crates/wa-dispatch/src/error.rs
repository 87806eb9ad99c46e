//! Crate-level error types for bulk dispatch.
//!
//! Only run-fatal conditions are expressed as errors: configuration
//! mistakes and a failed media upload. Per-contact failures are carried
//! as data in [`crate::types::DispatchOutcome`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alias for `Result<T, DispatchError>`.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Uniform error type used across the dispatch crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchError {
    pub code: DispatchErrorCode,
    pub message: String,
    /// Optional detail, usually the remote body or the underlying error.
    pub details: Option<String>,
    /// HTTP status code if originated from a remote call.
    pub http_status: Option<u16>,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref d) = self.details {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {}

/// Categorised error codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchErrorCode {
    // ── Startup ──────────────────────────────────────────
    InvalidConfig,
    MissingColumn,
    FileNotFound,
    Io,
    Csv,
    // ── Remote ───────────────────────────────────────────
    NetworkError,
    MaxRetriesExceeded,
    MissingMediaReference,
    SerializationError,
    // ── Internal ─────────────────────────────────────────
    InternalError,
}

impl DispatchError {
    fn with_code(code: DispatchErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            details: None,
            http_status: None,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::with_code(DispatchErrorCode::InvalidConfig, msg)
    }

    pub fn missing_column(column: &str, available: &[String]) -> Self {
        Self {
            details: Some(format!("available columns: {:?}", available)),
            ..Self::with_code(
                DispatchErrorCode::MissingColumn,
                format!("Column '{}' not found in contact sheet", column),
            )
        }
    }

    pub fn file_not_found(what: &str, path: &std::path::Path) -> Self {
        Self::with_code(
            DispatchErrorCode::FileNotFound,
            format!("{} not found: {}", what, path.display()),
        )
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::with_code(DispatchErrorCode::NetworkError, msg)
    }

    pub fn max_retries_exceeded(what: &str, attempts: u32, last_status: Option<u16>) -> Self {
        Self {
            http_status: last_status,
            ..Self::with_code(
                DispatchErrorCode::MaxRetriesExceeded,
                format!("Max retries exceeded for {} after {} attempts", what, attempts),
            )
        }
    }

    pub fn missing_media_reference(body: &str) -> Self {
        Self {
            details: Some(truncate(body, 500)),
            http_status: Some(200),
            ..Self::with_code(
                DispatchErrorCode::MissingMediaReference,
                "Upload answered 200 without a media_id",
            )
        }
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::with_code(DispatchErrorCode::SerializationError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(DispatchErrorCode::InternalError, msg)
    }

    /// Attach free-form detail to an existing error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(e: std::io::Error) -> Self {
        Self::with_code(DispatchErrorCode::Io, e.to_string())
    }
}

impl From<csv::Error> for DispatchError {
    fn from(e: csv::Error) -> Self {
        Self::with_code(DispatchErrorCode::Csv, e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DispatchError::invalid_config("URL_N8N is not set");
        assert!(err.to_string().contains("URL_N8N is not set"));
        assert!(err.to_string().contains("InvalidConfig"));
    }

    #[test]
    fn test_missing_column_lists_headers() {
        let err = DispatchError::missing_column("Celular", &["Nome".into(), "Fone".into()]);
        assert_eq!(err.code, DispatchErrorCode::MissingColumn);
        let text = err.to_string();
        assert!(text.contains("Celular"));
        assert!(text.contains("Fone"));
    }

    #[test]
    fn test_missing_media_reference_truncates_body() {
        let body = "x".repeat(2000);
        let err = DispatchError::missing_media_reference(&body);
        assert_eq!(err.details.as_ref().map(|d| d.len()), Some(500));
        assert_eq!(err.http_status, Some(200));
    }

    #[test]
    fn test_max_retries_keeps_last_status() {
        let err = DispatchError::max_retries_exceeded("image upload", 3, Some(502));
        assert_eq!(err.code, DispatchErrorCode::MaxRetriesExceeded);
        assert_eq!(err.http_status, Some(502));
        assert!(err.message.contains("3 attempts"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DispatchError = io.into();
        assert_eq!(err.code, DispatchErrorCode::Io);
    }
}
