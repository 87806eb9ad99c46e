//! One-shot image upload through the PostImagem workflow.
//!
//! The workflow's "Upload media" node reads the binary from a multipart
//! field and answers `{"media_id": "..."}`. The returned reference is
//! reused by every message in the run, so any failure here aborts the
//! batch.

use crate::error::{DispatchError, DispatchResult};
use crate::executor::{ExecutionResult, RetryingExecutor};
use crate::phone::guess_mime_type;
use crate::transport::{BasicAuth, OutboundRequest};
use crate::types::{DispatchConfig, MediaReference};
use log::info;
use std::path::Path;

/// Uploads the campaign image and returns its media reference.
pub struct MediaUploader {
    executor: RetryingExecutor,
    url: String,
    field: String,
    auth: BasicAuth,
}

impl MediaUploader {
    /// Fails when the config has no upload URL.
    pub fn new(executor: RetryingExecutor, config: &DispatchConfig) -> DispatchResult<Self> {
        let url = config
            .upload_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| DispatchError::invalid_config("Upload URL (URL_N8N_IMG_POST) is not set"))?;
        Ok(Self {
            executor,
            url: url.to_string(),
            field: config.upload_field.clone(),
            auth: BasicAuth::from_config(config),
        })
    }

    /// Read `path` and upload it.
    pub async fn upload_file(&self, path: &Path) -> DispatchResult<MediaReference> {
        if !path.is_file() {
            return Err(DispatchError::file_not_found("Image", path));
        }
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        info!("Uploading image {} ({} bytes)", path.display(), bytes.len());
        self.upload_bytes(bytes, file_name, guess_mime_type(path)).await
    }

    /// Upload an image already held in memory.
    pub async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> DispatchResult<MediaReference> {
        let request = OutboundRequest::post_file(
            &self.url,
            Some(self.auth.clone()),
            &self.field,
            file_name,
            mime_type,
            bytes,
        );

        match self.executor.execute(&request, "image upload").await {
            ExecutionResult::Success(success) => {
                let json = success.json.ok_or_else(|| {
                    DispatchError::serialization("Upload answered 200 with a non-JSON body")
                        .with_details(success.raw_text.chars().take(500).collect::<String>())
                })?;
                let media_id = media_id_from(&json)
                    .ok_or_else(|| DispatchError::missing_media_reference(&success.raw_text))?;
                info!("media_id obtained: {}", media_id);
                Ok(media_id)
            }
            ExecutionResult::Exhausted(exhausted) => {
                let mut err = DispatchError::max_retries_exceeded(
                    "image upload",
                    exhausted.attempts,
                    exhausted.last_status,
                );
                if let Some(text) = exhausted.last_text {
                    err = err.with_details(text);
                }
                Err(err)
            }
        }
    }
}

fn media_id_from(json: &serde_json::Value) -> Option<MediaReference> {
    match json.get("media_id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(MediaReference::new(s.clone())),
        serde_json::Value::Number(n) => Some(MediaReference::new(n.to_string())),
        _ => None,
    }
}
