//! In-memory transport and sleeper for exercising the pipeline without a
//! network or a clock.

use crate::error::{DispatchError, DispatchResult};
use crate::transport::{HttpTransport, OutboundRequest, Sleeper, TransportResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type Responder = Box<dyn Fn(&OutboundRequest) -> DispatchResult<TransportResponse> + Send + Sync>;

/// Transport that answers from a fixed script or a responder closure and
/// records every request it sees.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<DispatchResult<TransportResponse>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    /// Answer attempts in order; once the script runs dry every further
    /// attempt fails as a transport error.
    pub fn new(steps: Vec<DispatchResult<TransportResponse>>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            responder: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every attempt by calling `f`.
    pub fn responder<F>(f: F) -> Self
    where
        F: Fn(&OutboundRequest) -> DispatchResult<TransportResponse> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(f)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a scripted status/body step.
    pub fn ok(status: u16, body: &str) -> DispatchResult<TransportResponse> {
        Ok(TransportResponse::new(status, body))
    }

    /// Shorthand for a scripted timeout step.
    pub fn timeout() -> DispatchResult<TransportResponse> {
        Err(DispatchError::network("operation timed out"))
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &OutboundRequest) -> DispatchResult<TransportResponse> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        if let Some(ref f) = self.responder {
            return f(request);
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| Err(DispatchError::network("script exhausted")))
    }
}

/// Sleeper that returns immediately and remembers what it was asked.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut s) = self.sleeps.lock() {
            s.push(duration);
        }
    }
}
