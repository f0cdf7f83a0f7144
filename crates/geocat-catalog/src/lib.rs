//! # geocat-catalog
//!
//! Catalog and lifecycle core for remote geospatial web services.
//!
//! This crate implements the catalog domain:
//!
//! - **Service Catalog**: An ordered tree of services and their layers,
//!   the single authoritative copy of all entry state
//! - **Capabilities Parsing**: WMS/WFS capability documents into layer
//!   descriptors
//! - **Lifecycle Control**: The online/offline state machine and the
//!   style-preserving layer exchange against the host
//! - **Identity Resolution**: Re-associating persisted entries with layers
//!   already active in a host session after a restart
//! - **Persistence**: One structured sidecar document per installation
//!
//! ## Ownership
//!
//! The catalog exclusively owns its services and entries. Host layers are
//! referenced through opaque identifiers only; the host owns its layers and
//! may drop them independently, at which point the owning entry falls back
//! to the unmapped state.
//!
//! ## Concurrency
//!
//! All catalog mutation happens on one logical owner; there is no internal
//! locking. Capability fetches are the only asynchronous operations and are
//! cancellable. Observers use the event channel, never concurrent mutation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod capabilities;
pub mod catalog;
pub mod connection;
pub mod endpoints;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod model;
pub mod persist;
pub mod service;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::CacheLayout;
    pub use crate::capabilities::{parse_capabilities, LayerDescriptor, ParseError};
    pub use crate::catalog::{EntryKey, FilterOptions, ServiceCatalog};
    pub use crate::error::{CatalogError, Result};
    pub use crate::lifecycle::{HostBindings, LifecycleController};
    pub use crate::model::{LayerEntry, LayerStatus, Service, ServiceKind};
    pub use crate::persist::PersistenceStore;
    pub use crate::service::CatalogService;
}

pub use cache::CacheLayout;
pub use capabilities::{parse_capabilities, LayerDescriptor, ParseError};
pub use catalog::{EntryKey, FilterOptions, ServiceCatalog};
pub use endpoints::{EndpointRegistry, ServiceEndpoint};
pub use error::{CatalogError, Result};
pub use lifecycle::{HostBindings, LifecycleController};
pub use model::{LayerEntry, LayerStatus, Service, ServiceKind};
pub use persist::PersistenceStore;
pub use service::CatalogService;
