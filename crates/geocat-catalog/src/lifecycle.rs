//! Layer lifecycle control.
//!
//! Implements the per-entry state machine (`Unmapped`, `MappedOnline`,
//! `MappedOffline`) and the layer-exchange protocol against the host. The
//! controller never holds state of its own: it reads an entry snapshot,
//! performs all fallible collaborator work, and only then commits the new
//! state back into the catalog. A failure anywhere leaves both the entry and
//! the host's layer set exactly as they were.

use std::path::Path;
use std::sync::Arc;

use geocat_core::{
    CatalogEvent, HostLayerFactory, HostLayerId, LayerContent, LegendReorder, OfflineWriter,
    RasterExportOptions, StyleTransfer, WriteError,
};
use tracing::warn;

use crate::cache::CacheLayout;
use crate::catalog::{EntryKey, ServiceCatalog};
use crate::connection::{wfs_feature_url, wms_connection_string};
use crate::error::{CatalogError, Result};
use crate::model::{LayerEntry, ServiceKind};

/// Default raster export size when the caller supplies no options.
const DEFAULT_RASTER_SIZE: u32 = 1024;

/// The host collaborators the lifecycle controller drives.
///
/// Injected explicitly at construction; the catalog core never reaches for
/// ambient host state.
#[derive(Clone)]
pub struct HostBindings {
    /// Layer materialization and session registry.
    pub layers: Arc<dyn HostLayerFactory>,
    /// Style export/import for vector exchanges.
    pub style: Arc<dyn StyleTransfer>,
    /// Presentation-order mutation.
    pub legend: Arc<dyn LegendReorder>,
    /// Offline artifact production.
    pub writer: Arc<dyn OfflineWriter>,
}

/// Drives entries between the unmapped, online, and offline states.
pub struct LifecycleController {
    host: HostBindings,
    cache: CacheLayout,
}

impl LifecycleController {
    /// Creates a controller over the given host bindings and cache layout.
    #[must_use]
    pub fn new(host: HostBindings, cache: CacheLayout) -> Self {
        Self { host, cache }
    }

    /// The cache layout offline artifacts are placed in.
    #[must_use]
    pub fn cache(&self) -> &CacheLayout {
        &self.cache
    }

    /// Adds an entry to the map, materializing a host layer for its current
    /// status. A no-op when the entry is already mapped.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Host`] when the host declines to materialize
    /// the layer; the entry stays unmapped.
    pub fn add_to_map(&self, catalog: &mut ServiceCatalog, key: &EntryKey) -> Result<()> {
        let (kind, snapshot) = entry_snapshot(catalog, key)?;
        if snapshot.is_mapped() {
            return Ok(());
        }

        let id = if let Some(path) = snapshot.offline_path.as_deref().filter(|_| snapshot.is_offline()) {
            self.materialize_cached(kind, path, &snapshot.name)?
        } else {
            self.materialize_online(kind, &snapshot)?
        };

        let (_, entry) = catalog.entry_mut(key)?;
        entry.host_layer = Some(id);
        catalog.events().emit(CatalogEvent::LayerMapped {
            service: key.service.clone(),
            layer: key.layer.clone(),
        });
        Ok(())
    }

    /// Removes an entry's host layer from the map. A no-op when unmapped.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown key.
    pub fn remove_from_map(&self, catalog: &mut ServiceCatalog, key: &EntryKey) -> Result<()> {
        let (_, entry) = catalog.entry_mut(key)?;
        if let Some(id) = entry.host_layer.take() {
            self.host.layers.remove_layers(&[id]);
            catalog.events().emit(CatalogEvent::LayerUnmapped {
                service: key.service.clone(),
                layer: key.layer.clone(),
            });
        }
        Ok(())
    }

    /// Moves an entry to the offline state.
    ///
    /// Writes a cache artifact from the live layer (or a private
    /// materialization when the entry is not mapped), then exchanges the
    /// online host layer for one backed by the artifact. Already-offline
    /// entries are a no-op. On any failure the entry, the host layer set,
    /// and the cache are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Write`] on writer failure or cancellation,
    /// [`CatalogError::Style`] or [`CatalogError::Host`] on a failed
    /// exchange or while the host is mid-render.
    pub fn set_offline(
        &self,
        catalog: &mut ServiceCatalog,
        key: &EntryKey,
        raster_options: Option<RasterExportOptions>,
    ) -> Result<()> {
        let (kind, snapshot) = entry_snapshot(catalog, key)?;
        if snapshot.is_offline() {
            return Ok(());
        }
        self.ensure_host_idle()?;

        let span = geocat_core::observability::lifecycle_span("set_offline", &key.service, &key.layer);
        let _guard = span.enter();

        let content = match &snapshot.host_layer {
            Some(id) => LayerContent::Active(id.clone()),
            None => LayerContent::Source(self.online_source(kind, &snapshot)),
        };
        let cache_id = self.cache.synthetic_id(&snapshot.name);

        let (artifact, new_layer) = match kind {
            ServiceKind::Wfs => {
                let path = self.cache.vector_path(&cache_id);
                self.host
                    .writer
                    .write_vector(&content, &path, "UTF-8", snapshot.first_crs())?;
                let new_layer = match &snapshot.host_layer {
                    Some(old) => {
                        match self.install_replacement(kind, old, &path, &snapshot.name, true) {
                            Ok(new) => Some(new),
                            Err(e) => {
                                self.discard_artifacts(kind, &path);
                                return Err(e);
                            }
                        }
                    }
                    None => None,
                };
                (path, new_layer)
            }
            ServiceKind::Wms => {
                let options = match raster_options {
                    Some(options) => options,
                    None => self.default_raster_options(&snapshot)?,
                };
                let dir = self.cache.raster_dir(&cache_id);
                std::fs::create_dir_all(&dir)
                    .map_err(|e| WriteError::io(&dir, e.to_string()))?;
                if let Err(e) = self.host.writer.write_raster(&content, &dir, &options) {
                    self.discard_artifacts(kind, &self.cache.raster_artifact(&cache_id, options.tiled()));
                    return Err(e.into());
                }
                let artifact = self.cache.raster_artifact(&cache_id, options.tiled());
                let new_layer = match &snapshot.host_layer {
                    Some(old) => {
                        match self.install_replacement(kind, old, &artifact, &snapshot.name, false)
                        {
                            Ok(new) => Some(new),
                            Err(e) => {
                                self.discard_artifacts(kind, &artifact);
                                return Err(e);
                            }
                        }
                    }
                    None => None,
                };
                (artifact, new_layer)
            }
        };

        let (_, entry) = catalog.entry_mut(key)?;
        if let Some(new) = new_layer {
            entry.host_layer = Some(new);
        }
        entry.mark_offline(artifact);
        catalog.events().emit(CatalogEvent::StatusChanged {
            service: key.service.clone(),
            layer: key.layer.clone(),
            status: "offline".to_string(),
        });
        Ok(())
    }

    /// Moves an entry back to the online state.
    ///
    /// Rebuilds the live connection, exchanges it for the cached host layer
    /// when mapped, then deletes the cache artifacts. A no-op unless the
    /// entry is currently offline.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Host`] or [`CatalogError::Style`] when the
    /// exchange fails or the host is mid-render; the entry then stays
    /// offline with its cache intact.
    pub fn set_online(&self, catalog: &mut ServiceCatalog, key: &EntryKey) -> Result<()> {
        let (kind, snapshot) = entry_snapshot(catalog, key)?;
        if !snapshot.is_offline() {
            return Ok(());
        }
        self.ensure_host_idle()?;

        let span = geocat_core::observability::lifecycle_span("set_online", &key.service, &key.layer);
        let _guard = span.enter();

        let new_layer = match &snapshot.host_layer {
            Some(old) => {
                let new = self.materialize_online(kind, &snapshot)?;
                self.exchange(old, &new, kind == ServiceKind::Wfs)?;
                Some(new)
            }
            None => None,
        };

        if let Some(path) = &snapshot.offline_path {
            self.discard_artifacts(kind, path);
        }

        let (_, entry) = catalog.entry_mut(key)?;
        if let Some(new) = new_layer {
            entry.host_layer = Some(new);
        }
        entry.mark_online();
        catalog.events().emit(CatalogEvent::StatusChanged {
            service: key.service.clone(),
            layer: key.layer.clone(),
            status: "online".to_string(),
        });
        Ok(())
    }

    /// Refreshes an offline entry's cache from the live service.
    ///
    /// Runs the online transition followed by a fresh offline write while
    /// host rendering is suspended, so the intermediate online layer never
    /// flickers onto the map. A no-op unless the entry is offline.
    ///
    /// # Errors
    ///
    /// Propagates the first failing transition; rendering is re-enabled
    /// either way.
    pub fn refresh_offline(
        &self,
        catalog: &mut ServiceCatalog,
        key: &EntryKey,
        raster_options: Option<RasterExportOptions>,
    ) -> Result<()> {
        let (_, snapshot) = entry_snapshot(catalog, key)?;
        if !snapshot.is_offline() {
            return Ok(());
        }

        let render_was_enabled = self.host.layers.render_enabled();
        self.host.layers.set_render_enabled(false);
        let result = self
            .set_online(catalog, key)
            .and_then(|()| self.set_offline(catalog, key, raster_options));
        self.host.layers.set_render_enabled(render_was_enabled);
        result
    }

    /// Removes one entry, cascading to its host layer and cache artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown key.
    pub fn delete_entry(&self, catalog: &mut ServiceCatalog, key: &EntryKey) -> Result<()> {
        let (kind, snapshot) = entry_snapshot(catalog, key)?;
        if snapshot.is_mapped() {
            catalog.events().emit(CatalogEvent::LayerUnmapped {
                service: key.service.clone(),
                layer: key.layer.clone(),
            });
        }
        let entry = catalog.remove_entry(key)?;
        self.teardown(kind, entry);
        Ok(())
    }

    /// Removes a service, cascading to every entry's host layer and cache.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown title.
    pub fn delete_service(&self, catalog: &mut ServiceCatalog, title: &str) -> Result<()> {
        let service = catalog
            .remove_service(title)
            .ok_or_else(|| CatalogError::service_not_found(title))?;
        for entry in service.layers {
            self.teardown(service.kind, entry);
        }
        Ok(())
    }

    /// Rejects a transition while the host is in the middle of a render
    /// pass. Exchanging or snapshotting a layer mid-draw reads geometry the
    /// host is still producing.
    fn ensure_host_idle(&self) -> Result<()> {
        if self.host.layers.is_drawing() {
            return Err(CatalogError::host(
                "host is drawing the map; retry when the render finishes",
            ));
        }
        Ok(())
    }

    /// Builds the live connection source for an entry.
    fn online_source(&self, kind: ServiceKind, entry: &LayerEntry) -> String {
        match kind {
            ServiceKind::Wfs => wfs_feature_url(entry),
            ServiceKind::Wms => {
                wms_connection_string(entry, self.host.layers.destination_crs().as_deref())
            }
        }
    }

    fn materialize_online(&self, kind: ServiceKind, entry: &LayerEntry) -> Result<HostLayerId> {
        let source = self.online_source(kind, entry);
        let id = match kind {
            ServiceKind::Wfs => self.host.layers.add_vector_layer(&source, &entry.name, "WFS"),
            ServiceKind::Wms => self.host.layers.add_raster_layer(&source, &entry.name, "wms"),
        };
        id.ok_or_else(|| {
            CatalogError::host(format!(
                "host could not materialize online layer '{}'",
                entry.name
            ))
        })
    }

    fn materialize_cached(&self, kind: ServiceKind, path: &Path, name: &str) -> Result<HostLayerId> {
        let source = path.to_string_lossy();
        let id = match kind {
            ServiceKind::Wfs => self.host.layers.add_vector_layer(&source, name, "ogr"),
            ServiceKind::Wms => self.host.layers.add_raster_layer(&source, name, "gdal"),
        };
        id.ok_or_else(|| {
            CatalogError::host(format!(
                "host could not materialize cached layer '{name}' from {}",
                path.display()
            ))
        })
    }

    /// Materializes a replacement layer from a cache artifact and exchanges
    /// it for the active online layer.
    fn install_replacement(
        &self,
        kind: ServiceKind,
        old: &HostLayerId,
        artifact: &Path,
        name: &str,
        transfer_style: bool,
    ) -> Result<HostLayerId> {
        let new = self.materialize_cached(kind, artifact, name)?;
        self.exchange(old, &new, transfer_style)?;
        Ok(new)
    }

    /// The style-preserving, order-preserving swap.
    ///
    /// 1. Copy the old layer's style onto the new one (vector only).
    /// 2. Insert the new layer immediately after the old one.
    /// 3. Remove the old layer.
    ///
    /// A failure at step 1 or 2 aborts before step 3, so the old layer is
    /// never removed unless its replacement is already installed. The
    /// replacement is then removed again to restore the prior layer set.
    fn exchange(&self, old: &HostLayerId, new: &HostLayerId, transfer_style: bool) -> Result<()> {
        let result = self.try_exchange(old, new, transfer_style);
        if result.is_err() {
            self.host.layers.remove_layers(&[new.clone()]);
        }
        result
    }

    fn try_exchange(&self, old: &HostLayerId, new: &HostLayerId, transfer_style: bool) -> Result<()> {
        if transfer_style {
            let doc = self.host.style.export_style(old)?;
            self.host.style.import_style(new, &doc)?;
        }
        if !self.host.legend.move_after(new, old) {
            return Err(CatalogError::host(format!(
                "could not reposition layer {new} after {old}"
            )));
        }
        self.host.layers.remove_layers(&[old.clone()]);
        Ok(())
    }

    /// Best-effort removal of cache artifacts; never fails the transition.
    fn discard_artifacts(&self, kind: ServiceKind, path: &Path) {
        let outcome = match kind {
            ServiceKind::Wfs => self.cache.delete_vector_artifacts(path),
            ServiceKind::Wms => self.cache.delete_raster_artifacts(path),
        };
        if let Err(e) = outcome {
            warn!(path = %path.display(), error = %e, "could not delete offline artifacts");
        }
    }

    fn teardown(&self, kind: ServiceKind, entry: LayerEntry) {
        if let Some(id) = entry.host_layer {
            self.host.layers.remove_layers(&[id]);
        }
        if let Some(path) = entry.offline_path {
            self.discard_artifacts(kind, &path);
        }
    }

    fn default_raster_options(&self, entry: &LayerEntry) -> Result<RasterExportOptions> {
        let extent = self
            .host
            .layers
            .current_extent()
            .ok_or_else(|| CatalogError::host("no map extent available for raster export"))?;
        let crs = self
            .host
            .layers
            .destination_crs()
            .or_else(|| entry.first_crs().map(str::to_string));
        Ok(RasterExportOptions {
            columns: DEFAULT_RASTER_SIZE,
            rows: DEFAULT_RASTER_SIZE,
            extent,
            crs,
            tile_size: None,
        })
    }
}

/// Clones the addressed entry together with its service kind.
fn entry_snapshot(catalog: &ServiceCatalog, key: &EntryKey) -> Result<(ServiceKind, LayerEntry)> {
    let service = catalog
        .service(&key.service)
        .ok_or_else(|| CatalogError::service_not_found(&key.service))?;
    let entry = service
        .layer(&key.layer)
        .ok_or_else(|| CatalogError::layer_not_found(&key.service, &key.layer))?;
    Ok((service.kind, entry.clone()))
}
