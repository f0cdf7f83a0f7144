//! Network contract for capability fetches.
//!
//! Capability fetches are the only asynchronous operations in the catalog.
//! They are genuine futures, never a wait loop pumping the host's event
//! queue: the catalog awaits the fetch and selects against a cancellation
//! token owned by the operation that started it.
//!
//! Timeout and retry policy belong to the implementation. A failed fetch is
//! terminal for that call; the catalog never retries on its own.

use async_trait::async_trait;
use bytes::Bytes;

/// Progress of an in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes received so far.
    pub received: u64,
    /// Total bytes expected, when the server announced one.
    pub total: Option<u64>,
}

impl Progress {
    /// Human-readable progress line.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.total {
            Some(total) => format!("{} of {} bytes downloaded", self.received, total),
            None => format!("{} bytes downloaded", self.received),
        }
    }
}

/// Callback invoked with download progress notifications.
pub type ProgressFn = Box<dyn Fn(Progress) + Send + Sync>;

/// Transport failure reported by the network collaborator.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The request could not be sent or the connection failed.
    #[error("transport error for {url}: {message}")]
    Transport {
        /// The request URL.
        url: String,
        /// Transport-level reason.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("http error {status} for {url}")]
    Http {
        /// The request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The collaborator's own timeout elapsed.
    #[error("timed out fetching {url}")]
    TimedOut {
        /// The request URL.
        url: String,
    },
}

/// Asynchronous GET client the catalog issues capability requests through.
#[async_trait]
pub trait NetworkClient: Send + Sync + 'static {
    /// Fetches the given URL, reporting progress through `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] on transport failure, HTTP error status, or
    /// the implementation's own timeout.
    async fn get(&self, url: &str, progress: Option<ProgressFn>) -> Result<Bytes, NetworkError>;
}
