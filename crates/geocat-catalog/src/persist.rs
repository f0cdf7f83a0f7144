//! Catalog persistence.
//!
//! One structured sidecar document per installation holds the full catalog
//! plus the endpoint registry. Saving is atomic (write-then-rename) so a
//! crash never leaves a torn document behind. Loading degrades gracefully:
//! an absent or unreadable document yields an empty catalog, and a single
//! malformed record is skipped rather than failing the load.
//!
//! Host-layer identities are never persisted as trusted state; after a load
//! the caller runs [`crate::catalog::ServiceCatalog::resolve_identities`]
//! against the host's active layers.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::catalog::ServiceCatalog;
use crate::endpoints::EndpointRegistry;
use crate::error::{CatalogError, Result};
use crate::model::{LayerEntry, Service, ServiceKind};

/// Schema version of the sidecar document.
const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct SidecarDocument<'a> {
    version: u32,
    #[serde(skip_serializing_if = "EndpointRegistry::is_empty")]
    endpoints: &'a EndpointRegistry,
    services: &'a [Service],
}

/// Loaded catalog content before identity resolution.
#[derive(Debug, Default)]
pub struct LoadedCatalog {
    /// Services with persisted lifecycle hints, all entries unmapped.
    pub services: Vec<Service>,
    /// The endpoint registry.
    pub endpoints: EndpointRegistry,
}

/// Reads and writes the sidecar document.
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    path: PathBuf,
}

impl PersistenceStore {
    /// Creates a store over the host-determined sidecar path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The sidecar document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the catalog and endpoint registry to the sidecar document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] when the document cannot be
    /// serialized or written.
    pub fn save(&self, catalog: &ServiceCatalog, endpoints: &EndpointRegistry) -> Result<()> {
        let document = SidecarDocument {
            version: DOCUMENT_VERSION,
            endpoints,
            services: catalog.services(),
        };
        let body = serde_json::to_vec_pretty(&document)
            .map_err(|e| CatalogError::persistence_with_source("serializing catalog", e))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CatalogError::persistence_with_source(
                    format!("creating {}", parent.display()),
                    e,
                )
            })?;
        }

        // Write-then-rename keeps the previous document intact on failure.
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, &body).map_err(|e| {
            CatalogError::persistence_with_source(format!("writing {}", temp.display()), e)
        })?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            CatalogError::persistence_with_source(
                format!("renaming into {}", self.path.display()),
                e,
            )
        })?;
        Ok(())
    }

    /// Loads the sidecar document.
    ///
    /// Never fails: an absent, unreadable, or wholly malformed document
    /// yields empty content, and individual malformed records are skipped
    /// with a warning.
    #[must_use]
    pub fn load(&self) -> LoadedCatalog {
        let body = match std::fs::read(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LoadedCatalog::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read sidecar document");
                return LoadedCatalog::default();
            }
        };

        let document: Value = match serde_json::from_slice(&body) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "sidecar document is not valid JSON");
                return LoadedCatalog::default();
            }
        };

        let endpoints = document
            .get("endpoints")
            .cloned()
            .map(serde_json::from_value)
            .and_then(std::result::Result::ok)
            .unwrap_or_default();

        let mut services = Vec::new();
        if let Some(records) = document.get("services").and_then(Value::as_array) {
            for record in records {
                match parse_service_record(record) {
                    Some(service) => services.push(service),
                    None => {
                        warn!(?record, "skipping malformed service record");
                    }
                }
            }
        }

        LoadedCatalog {
            services,
            endpoints,
        }
    }
}

/// Parses one service record, skipping malformed layer records inside it.
fn parse_service_record(record: &Value) -> Option<Service> {
    let title = record.get("title")?.as_str()?;
    let url = record.get("url")?.as_str()?;
    let kind: ServiceKind = serde_json::from_value(record.get("kind")?.clone()).ok()?;

    let mut service = Service::new(title, url, kind);
    if let Some(layers) = record.get("layers").and_then(Value::as_array) {
        for layer in layers {
            match serde_json::from_value::<LayerEntry>(layer.clone()) {
                Ok(entry) if !entry.name.is_empty() && entry.invariants_hold() => {
                    service.layers.push(entry);
                }
                Ok(_) => {
                    warn!(service = title, "skipping layer record violating invariants");
                }
                Err(e) => {
                    warn!(service = title, error = %e, "skipping malformed layer record");
                }
            }
        }
    }
    Some(service)
}
