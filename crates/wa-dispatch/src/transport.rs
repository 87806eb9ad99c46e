//! HTTP transport seam.
//!
//! Requests are plain values so the executor can replay them on every
//! attempt; [`ReqwestTransport`] turns them into real HTTP calls.

use crate::error::{DispatchError, DispatchResult};
use crate::types::DispatchConfig;
use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart;
use std::time::Duration;

/// Basic-auth credentials attached to a request.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl BasicAuth {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

/// Payload of an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// Single-file multipart form.
    Multipart {
        field: String,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

/// A fully built request, replayable across attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub auth: Option<BasicAuth>,
    pub body: RequestBody,
}

impl OutboundRequest {
    pub fn post_json(url: &str, auth: Option<BasicAuth>, body: serde_json::Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            url: url.to_string(),
            auth,
            body: RequestBody::Json(body),
        }
    }

    pub fn post_file(
        url: &str,
        auth: Option<BasicAuth>,
        field: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            method: reqwest::Method::POST,
            url: url.to_string(),
            auth,
            body: RequestBody::Multipart {
                field: field.to_string(),
                file_name: file_name.to_string(),
                mime_type: mime_type.to_string(),
                bytes,
            },
        }
    }
}

/// Status and body text of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one attempt of a request.
///
/// Any `Err` is treated by the executor as a transport failure
/// (timeout, refused connection, TLS, ...) and retried.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> DispatchResult<TransportResponse>;
}

/// Pauses between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &DispatchConfig) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DispatchError::network(format!("HTTP client init failed: {}", e)))?;
        Ok(Self { client })
    }

    fn build_form(body: &RequestBody) -> DispatchResult<Option<multipart::Form>> {
        let RequestBody::Multipart {
            field,
            file_name,
            mime_type,
            bytes,
        } = body
        else {
            return Ok(None);
        };
        let part = multipart::Part::bytes(bytes.clone())
            .file_name(file_name.clone())
            .mime_str(mime_type)
            .map_err(|e| DispatchError::internal(format!("Bad MIME type: {}", e)))?;
        Ok(Some(multipart::Form::new().part(field.clone(), part)))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> DispatchResult<TransportResponse> {
        debug!("{} {}", request.method, request.url);

        let mut req = self.client.request(request.method.clone(), &request.url);
        if let Some(ref auth) = request.auth {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }
        req = match &request.body {
            RequestBody::Json(value) => req.header(CONTENT_TYPE, "application/json").json(value),
            multipart_body => match Self::build_form(multipart_body)? {
                Some(form) => req.multipart(form),
                None => req,
            },
        };

        let resp = req
            .send()
            .await
            .map_err(|e| DispatchError::network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| DispatchError::network(format!("Reading response body failed: {}", e)))?;
        Ok(TransportResponse { status, body })
    }
}
