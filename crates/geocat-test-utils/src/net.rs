//! Canned network responses for capability fetch tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use geocat_core::{NetworkClient, NetworkError, Progress, ProgressFn};

/// What a [`StaticNetwork`] answers for one URL.
#[derive(Debug, Clone)]
pub enum StaticResponse {
    /// A successful response with this body.
    Body(Bytes),
    /// An HTTP error status.
    Status(u16),
    /// Never resolves; for cancellation tests.
    Hang,
}

/// Network client answering from a URL-keyed response table.
///
/// URLs with no configured response fail with a transport error, so a test
/// asserting "catalog unchanged after a failed fetch" needs no setup at all.
#[derive(Debug, Default)]
pub struct StaticNetwork {
    responses: Mutex<HashMap<String, StaticResponse>>,
    requests: Mutex<Vec<String>>,
}

impl StaticNetwork {
    /// Creates an empty response table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures a successful response body for a URL.
    pub fn respond(&self, url: &str, body: impl Into<Bytes>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StaticResponse::Body(body.into()));
    }

    /// Configures an HTTP error status for a URL.
    pub fn respond_status(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StaticResponse::Status(status));
    }

    /// Makes requests for a URL hang forever.
    pub fn hang(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StaticResponse::Hang);
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkClient for StaticNetwork {
    async fn get(&self, url: &str, progress: Option<ProgressFn>) -> Result<Bytes, NetworkError> {
        self.requests.lock().unwrap().push(url.to_string());
        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(StaticResponse::Body(body)) => {
                if let Some(report) = &progress {
                    report(Progress {
                        received: body.len() as u64,
                        total: Some(body.len() as u64),
                    });
                }
                Ok(body)
            }
            Some(StaticResponse::Status(status)) => Err(NetworkError::Http {
                url: url.to_string(),
                status,
            }),
            Some(StaticResponse::Hang) => std::future::pending().await,
            None => Err(NetworkError::Transport {
                url: url.to_string(),
                message: "no response configured".to_string(),
            }),
        }
    }
}
