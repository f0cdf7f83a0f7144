//! The catalog service facade.
//!
//! [`CatalogService`] is the single entry point a host embeds: it owns the
//! catalog, the lifecycle controller, the endpoint registry, and the
//! persistence store, and wires capability fetches through the injected
//! network client. Capability fetches are the only asynchronous operations
//! and each carries a cancellation token; everything else is synchronous
//! mutation on the owner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use geocat_core::{NetworkClient, ProgressFn, RasterExportOptions};
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};

use crate::cache::CacheLayout;
use crate::capabilities::parse_capabilities;
use crate::catalog::{EntryKey, ServiceCatalog};
use crate::connection::capabilities_url;
use crate::endpoints::EndpointRegistry;
use crate::error::{CatalogError, Result};
use crate::lifecycle::{HostBindings, LifecycleController};
use crate::model::{LayerStatus, ServiceKind};
use crate::persist::PersistenceStore;

/// Owns the catalog and every collaborator needed to operate it.
pub struct CatalogService {
    catalog: ServiceCatalog,
    lifecycle: LifecycleController,
    host: HostBindings,
    client: Arc<dyn NetworkClient>,
    store: PersistenceStore,
    endpoints: EndpointRegistry,
    pending: Mutex<HashMap<String, CancellationToken>>,
}

impl CatalogService {
    /// Creates a service over the injected collaborators, starting from an
    /// empty catalog. Call [`CatalogService::load`] to restore persisted
    /// state.
    #[must_use]
    pub fn new(
        host: HostBindings,
        cache: CacheLayout,
        client: Arc<dyn NetworkClient>,
        store: PersistenceStore,
    ) -> Self {
        Self {
            catalog: ServiceCatalog::new(),
            lifecycle: LifecycleController::new(host.clone(), cache),
            host,
            client,
            store,
            endpoints: EndpointRegistry::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// The catalog, for reads and observer subscription.
    #[must_use]
    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// The endpoint registry.
    #[must_use]
    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// The endpoint registry, mutably.
    pub fn endpoints_mut(&mut self) -> &mut EndpointRegistry {
        &mut self.endpoints
    }

    /// Restores the persisted catalog and endpoint registry, then re-links
    /// entries to layers already active in the host session.
    ///
    /// Entries whose persisted state matches nothing in the session start
    /// unmapped; an absent or unreadable document yields an empty catalog.
    pub fn load(&mut self) {
        let loaded = self.store.load();
        self.endpoints = loaded.endpoints;
        self.catalog = ServiceCatalog::from_services(loaded.services);
        let active = self.host.layers.active_layers();
        self.catalog.resolve_identities(&active);
        info!(
            services = self.catalog.services().len(),
            active_layers = active.len(),
            "catalog restored"
        );
    }

    /// Persists the catalog and endpoint registry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] when the sidecar document
    /// cannot be written.
    pub fn save(&self) -> Result<()> {
        self.store.save(&self.catalog, &self.endpoints)
    }

    /// Adds a service: fetches and parses its capabilities, then inserts it
    /// (or replaces a same-titled service's layer list).
    ///
    /// A failed or cancelled fetch leaves the catalog unchanged, including
    /// the prior layer list of a service being refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`], [`CatalogError::Cancelled`], or
    /// [`CatalogError::Parse`].
    pub async fn add_service(
        &mut self,
        title: &str,
        url: &str,
        kind: ServiceKind,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let token = CancellationToken::new();
        self.add_service_with_token(title, url, kind, token, progress)
            .await
    }

    /// [`CatalogService::add_service`] with a caller-held cancellation
    /// token. Cancelling the token aborts the fetch; a fetch already started
    /// for the same title is cancelled first.
    pub async fn add_service_with_token(
        &mut self,
        title: &str,
        url: &str,
        kind: ServiceKind,
        token: CancellationToken,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let span = geocat_core::observability::catalog_span("add_service", title);
        async {
            if let Some(previous) = self
                .lock_pending()
                .insert(title.to_string(), token.clone())
            {
                previous.cancel();
            }

            let request = capabilities_url(url, kind);
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => Err(CatalogError::Cancelled {
                    title: title.to_string(),
                }),
                fetched = self.client.get(&request, progress) => {
                    fetched.map_err(CatalogError::from)
                }
            };
            self.lock_pending().remove(title);

            let body = outcome?;
            let descriptors = parse_capabilities(&body, kind)?;
            self.catalog.upsert_service(title, url, kind, descriptors);
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Re-fetches an existing service's capabilities, replacing its layer
    /// list on success.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown title, or any
    /// [`CatalogService::add_service`] error.
    pub async fn refresh_service(&mut self, title: &str, progress: Option<ProgressFn>) -> Result<()> {
        let (url, kind) = {
            let service = self
                .catalog
                .service(title)
                .ok_or_else(|| CatalogError::service_not_found(title))?;
            (service.url.clone(), service.kind)
        };
        self.add_service(title, &url, kind, progress).await
    }

    /// Cancels a pending capability fetch for a service, if one is running.
    pub fn cancel_fetch(&self, title: &str) {
        if let Some(token) = self.lock_pending().remove(title) {
            token.cancel();
        }
    }

    /// Adds an entry to the map in its current lifecycle state.
    ///
    /// # Errors
    ///
    /// See [`LifecycleController::add_to_map`].
    pub fn add_to_map(&mut self, key: &EntryKey) -> Result<()> {
        self.lifecycle.add_to_map(&mut self.catalog, key)
    }

    /// Removes an entry's host layer from the map.
    ///
    /// # Errors
    ///
    /// See [`LifecycleController::remove_from_map`].
    pub fn remove_from_map(&mut self, key: &EntryKey) -> Result<()> {
        self.lifecycle.remove_from_map(&mut self.catalog, key)
    }

    /// Moves an entry to the offline state.
    ///
    /// # Errors
    ///
    /// See [`LifecycleController::set_offline`].
    pub fn set_offline(
        &mut self,
        key: &EntryKey,
        raster_options: Option<RasterExportOptions>,
    ) -> Result<()> {
        self.lifecycle.set_offline(&mut self.catalog, key, raster_options)
    }

    /// Moves an entry back to the online state.
    ///
    /// # Errors
    ///
    /// See [`LifecycleController::set_online`].
    pub fn set_online(&mut self, key: &EntryKey) -> Result<()> {
        self.lifecycle.set_online(&mut self.catalog, key)
    }

    /// Reloads an entry according to its lifecycle state.
    ///
    /// - no status yet: re-fetches the owning service's capabilities
    /// - online: nothing to do, the live connection is already current
    /// - offline: refreshes the cache artifact from the live service
    ///
    /// # Errors
    ///
    /// Propagates the underlying refresh or transition error.
    pub async fn reload_entry(
        &mut self,
        key: &EntryKey,
        raster_options: Option<RasterExportOptions>,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let status = self
            .catalog
            .entry(key)
            .ok_or_else(|| CatalogError::layer_not_found(&key.service, &key.layer))?
            .status;
        match status {
            None => self.refresh_service(&key.service, progress).await,
            Some(LayerStatus::Online) => Ok(()),
            Some(LayerStatus::Offline) => {
                self.lifecycle
                    .refresh_offline(&mut self.catalog, key, raster_options)
            }
        }
    }

    /// Toggles an entry's favourite flag.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown key.
    pub fn set_favourite(&mut self, key: &EntryKey, favourite: bool) -> Result<()> {
        self.catalog.set_favourite(key, favourite)
    }

    /// Removes one entry, cascading to its host layer and cache artifacts.
    ///
    /// # Errors
    ///
    /// See [`LifecycleController::delete_entry`].
    pub fn delete_entry(&mut self, key: &EntryKey) -> Result<()> {
        self.lifecycle.delete_entry(&mut self.catalog, key)
    }

    /// Removes a service, cancelling any pending fetch for it and cascading
    /// to every entry's host layer and cache artifacts.
    ///
    /// # Errors
    ///
    /// See [`LifecycleController::delete_service`].
    pub fn delete_service(&mut self, title: &str) -> Result<()> {
        self.cancel_fetch(title);
        self.lifecycle.delete_service(&mut self.catalog, title)
    }

    /// Reacts to the host removing layers on its own.
    pub fn sync_host_removed(&mut self, removed: &[geocat_core::HostLayerId]) {
        self.catalog.sync_host_removed(removed);
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        // Nothing panics while holding this lock; recover a poisoned guard
        // rather than propagating the panic.
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
