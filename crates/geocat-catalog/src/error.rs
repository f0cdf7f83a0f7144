//! Error types for catalog operations.

use geocat_core::{NetworkError, StyleError, WriteError};

use crate::capabilities::ParseError;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
///
/// Every failure aborts exactly the operation it occurred in and leaves the
/// catalog in its prior state; none is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A capability fetch failed at the transport level.
    #[error("capability fetch failed: {0}")]
    Fetch(#[from] NetworkError),

    /// A capability document could not be parsed.
    #[error("capability parse failed: {0}")]
    Parse(#[from] ParseError),

    /// The fetch was cancelled before completion.
    #[error("capability fetch for '{title}' was cancelled")]
    Cancelled {
        /// Title of the service whose fetch was cancelled.
        title: String,
    },

    /// An offline artifact could not be produced.
    #[error("offline write failed: {0}")]
    Write(#[from] WriteError),

    /// Style export/import failed during a vector exchange.
    #[error("style transfer failed: {0}")]
    Style(#[from] StyleError),

    /// The host declined to materialize or rearrange a layer.
    #[error("host operation failed: {message}")]
    Host {
        /// Description of what the host declined.
        message: String,
    },

    /// The referenced service or layer is not in the catalog.
    #[error("not found: {what}")]
    NotFound {
        /// Description of what was looked up.
        what: String,
    },

    /// The sidecar document could not be written.
    #[error("persistence error: {message}")]
    Persistence {
        /// Description of the persistence failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CatalogError {
    /// Creates a host-operation error with the given message.
    #[must_use]
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Creates a not-found error for a service title.
    #[must_use]
    pub fn service_not_found(title: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: format!("service '{title}'"),
        }
    }

    /// Creates a not-found error for a layer within a service.
    #[must_use]
    pub fn layer_not_found(service: impl std::fmt::Display, layer: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: format!("layer '{layer}' in service '{service}'"),
        }
    }

    /// Creates a persistence error with the given message.
    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a persistence error with a source cause.
    #[must_use]
    pub fn persistence_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
