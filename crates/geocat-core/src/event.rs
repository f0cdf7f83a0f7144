//! Catalog change notifications.
//!
//! Mutation and notification are deliberately separate: the catalog mutates
//! its tree, then emits a typed event on a broadcast channel. Observers (a
//! UI, a test) subscribe for events and never mutate through the channel.
//! Lagging or absent receivers never block or fail a mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default capacity of the notification channel.
const CHANNEL_CAPACITY: usize = 256;

/// A change that happened to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// A service was added or its layer list replaced by a refresh.
    ServiceUpserted {
        /// Service title.
        title: String,
        /// Number of layers after the upsert.
        layer_count: usize,
    },
    /// A service and all its entries were removed.
    ServiceRemoved {
        /// Service title.
        title: String,
    },
    /// An entry became represented by an active host layer.
    LayerMapped {
        /// Owning service title.
        service: String,
        /// Layer name.
        layer: String,
    },
    /// An entry lost its active host layer.
    LayerUnmapped {
        /// Owning service title.
        service: String,
        /// Layer name.
        layer: String,
    },
    /// An entry was removed from its service.
    LayerRemoved {
        /// Owning service title.
        service: String,
        /// Layer name.
        layer: String,
    },
    /// An entry moved between online and offline rendering.
    StatusChanged {
        /// Owning service title.
        service: String,
        /// Layer name.
        layer: String,
        /// `"online"` or `"offline"`.
        status: String,
    },
    /// An entry's favourite flag was toggled.
    FavouriteChanged {
        /// Owning service title.
        service: String,
        /// Layer name.
        layer: String,
        /// New flag value.
        favourite: bool,
    },
}

/// Envelope pairing an event with its emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// When the change was emitted.
    pub occurred_at: DateTime<Utc>,
    /// The change itself.
    #[serde(flatten)]
    pub event: CatalogEvent,
}

/// Broadcast channel for catalog change notifications.
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventChannel {
    /// Creates a channel with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribes to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Emits an event to all current subscribers.
    ///
    /// A send error only means nobody is listening; that is not a failure.
    pub fn emit(&self, event: CatalogEvent) {
        tracing::debug!(?event, "catalog event");
        let _ = self.tx.send(EventEnvelope {
            occurred_at: Utc::now(),
            event,
        });
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}
