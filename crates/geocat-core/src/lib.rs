//! # geocat-core
//!
//! Core abstractions for the geocat web-service catalog.
//!
//! This crate provides the foundational types and contracts used across all
//! geocat components:
//!
//! - **Host Contracts**: Traits through which the catalog drives the hosting
//!   application (layer materialization, style transfer, legend ordering)
//! - **Network Contract**: Asynchronous capability fetches with progress
//! - **Offline Writer Contract**: Producing cached layer artifacts on disk
//! - **Identifiers**: The opaque host-layer identity the catalog never owns
//! - **Events**: Typed change notifications decoupled from mutation
//! - **Error Types**: Shared error definitions for collaborator failures
//!
//! ## Crate Boundary
//!
//! `geocat-core` is the **only** crate allowed to define the collaborator
//! contracts. The catalog domain in `geocat-catalog` consumes these traits
//! and never reaches past them into a concrete host, network stack, or file
//! format.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod event;
pub mod host;
pub mod id;
pub mod net;
pub mod observability;
pub mod writer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::event::{CatalogEvent, EventChannel};
    pub use crate::host::{
        HostLayerFactory, HostLayerInfo, HostLayerKind, LegendReorder, MapExtent, StyleDocument,
        StyleTransfer,
    };
    pub use crate::id::HostLayerId;
    pub use crate::net::{NetworkClient, NetworkError, Progress};
    pub use crate::writer::{LayerContent, OfflineWriter, RasterExportOptions, WriteError};
}

pub use event::{CatalogEvent, EventChannel};
pub use host::{
    HostLayerFactory, HostLayerInfo, HostLayerKind, LegendReorder, MapExtent, StyleDocument,
    StyleError, StyleTransfer,
};
pub use id::HostLayerId;
pub use net::{NetworkClient, NetworkError, Progress, ProgressFn};
pub use observability::{init_logging, LogFormat};
pub use writer::{LayerContent, OfflineWriter, RasterExportOptions, WriteError};
