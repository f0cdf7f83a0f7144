//! The in-memory service catalog.
//!
//! An ordered tree of services and their layers, the single authoritative
//! copy of all entry state. All mutation happens on one logical owner;
//! observers subscribe to the event channel and read snapshots, they never
//! mutate concurrently.

use geocat_core::{CatalogEvent, EventChannel, HostLayerId};
use tokio::sync::broadcast;

use crate::capabilities::LayerDescriptor;
use crate::error::{CatalogError, Result};
use crate::model::{LayerEntry, Service, ServiceKind};

/// Addresses one entry by owning service title and layer name.
///
/// Layer names need not be globally unique; the pair is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    /// Owning service title.
    pub service: String,
    /// Layer name within the service.
    pub layer: String,
}

impl EntryKey {
    /// Creates a key.
    #[must_use]
    pub fn new(service: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            layer: layer.into(),
        }
    }
}

/// Options for a filtered read of the catalog.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Keep only entries with the favourite flag set.
    pub only_favourites: bool,
    /// Case-insensitive substring matched against every entry column.
    pub pattern: Option<String>,
}

/// The tree of services and layers.
#[derive(Debug)]
pub struct ServiceCatalog {
    services: Vec<Service>,
    events: EventChannel,
}

impl ServiceCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            events: EventChannel::new(),
        }
    }

    /// Creates a catalog from persisted services.
    #[must_use]
    pub fn from_services(services: Vec<Service>) -> Self {
        Self {
            services,
            events: EventChannel::new(),
        }
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<geocat_core::event::EventEnvelope> {
        self.events.subscribe()
    }

    /// The event channel mutations are announced on.
    #[must_use]
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// All services, in insertion order.
    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Looks up a service by title.
    #[must_use]
    pub fn service(&self, title: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.title == title)
    }

    /// Looks up an entry by key.
    #[must_use]
    pub fn entry(&self, key: &EntryKey) -> Option<&LayerEntry> {
        self.service(&key.service)?.layer(&key.layer)
    }

    /// Looks up an entry mutably, with the owning service's kind.
    ///
    /// Lifecycle transitions go through this; UI-facing observers must use
    /// the read accessors instead.
    pub fn entry_mut(&mut self, key: &EntryKey) -> Result<(ServiceKind, &mut LayerEntry)> {
        let service = self
            .services
            .iter_mut()
            .find(|s| s.title == key.service)
            .ok_or_else(|| CatalogError::service_not_found(&key.service))?;
        let kind = service.kind;
        let entry = service
            .layer_mut(&key.layer)
            .ok_or_else(|| CatalogError::layer_not_found(&key.service, &key.layer))?;
        Ok((kind, entry))
    }

    /// Inserts a service or replaces an existing same-titled service's
    /// layer list (refresh semantics: replaced, never appended).
    ///
    /// The caller guarantees `descriptors` came from a successful fetch and
    /// parse; a failed fetch never reaches this point, so no partial or
    /// stale service is ever left behind.
    pub fn upsert_service(
        &mut self,
        title: &str,
        url: &str,
        kind: ServiceKind,
        descriptors: Vec<LayerDescriptor>,
    ) {
        let layers: Vec<LayerEntry> = descriptors
            .into_iter()
            .map(|descriptor| {
                let mut entry = LayerEntry::new(descriptor.name, url);
                entry.crs = descriptor.crs;
                entry.formats = descriptor.formats;
                entry.styles = descriptor.styles;
                entry
            })
            .collect();
        let layer_count = layers.len();

        if let Some(service) = self.services.iter_mut().find(|s| s.title == title) {
            service.url = url.to_string();
            service.kind = kind;
            service.layers = layers;
        } else {
            let mut service = Service::new(title, url, kind);
            service.layers = layers;
            self.services.push(service);
        }

        self.events.emit(CatalogEvent::ServiceUpserted {
            title: title.to_string(),
            layer_count,
        });
    }

    /// Removes a service, returning it for cascade cleanup.
    ///
    /// The lifecycle controller is responsible for tearing down host layers
    /// and offline artifacts of the returned entries.
    pub fn remove_service(&mut self, title: &str) -> Option<Service> {
        let position = self.services.iter().position(|s| s.title == title)?;
        let service = self.services.remove(position);
        self.events.emit(CatalogEvent::ServiceRemoved {
            title: title.to_string(),
        });
        Some(service)
    }

    /// Removes one entry from its service, returning it for cascade cleanup.
    pub fn remove_entry(&mut self, key: &EntryKey) -> Result<LayerEntry> {
        let service = self
            .services
            .iter_mut()
            .find(|s| s.title == key.service)
            .ok_or_else(|| CatalogError::service_not_found(&key.service))?;
        let position = service
            .layers
            .iter()
            .position(|l| l.name == key.layer)
            .ok_or_else(|| CatalogError::layer_not_found(&key.service, &key.layer))?;
        let entry = service.layers.remove(position);
        self.events.emit(CatalogEvent::LayerRemoved {
            service: key.service.clone(),
            layer: key.layer.clone(),
        });
        Ok(entry)
    }

    /// Toggles an entry's favourite flag.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown key.
    pub fn set_favourite(&mut self, key: &EntryKey, favourite: bool) -> Result<()> {
        let (_, entry) = self.entry_mut(key)?;
        if entry.favourite != favourite {
            entry.favourite = favourite;
            self.events.emit(CatalogEvent::FavouriteChanged {
                service: key.service.clone(),
                layer: key.layer.clone(),
                favourite,
            });
        }
        Ok(())
    }

    /// Reacts to the host removing layers on its own.
    ///
    /// Entries holding one of the removed identifiers fall back to the
    /// unmapped state; the weak reference is never dereferenced once the
    /// host reports it gone.
    pub fn sync_host_removed(&mut self, removed: &[HostLayerId]) {
        let mut unmapped: Vec<(String, String)> = Vec::new();
        for service in &mut self.services {
            for entry in &mut service.layers {
                if let Some(id) = &entry.host_layer {
                    if removed.contains(id) {
                        entry.host_layer = None;
                        unmapped.push((service.title.clone(), entry.name.clone()));
                    }
                }
            }
        }
        for (service, layer) in unmapped {
            self.events.emit(CatalogEvent::LayerUnmapped { service, layer });
        }
    }

    /// Re-links every entry to the host session's active layers.
    ///
    /// Persisted host identifiers are never trusted; after a load this runs
    /// the identity resolver over the host's current layer set and entries
    /// with no match simply start unmapped. Idempotent over an unchanged
    /// host layer set. Runs before observers attach, so it emits no events.
    pub fn resolve_identities(&mut self, active_layers: &[geocat_core::HostLayerInfo]) {
        for service in &mut self.services {
            for entry in &mut service.layers {
                entry.host_layer = crate::identity::resolve(entry, service.kind, active_layers);
            }
        }
    }

    /// Filtered read of the catalog.
    ///
    /// Services are group nodes and always appear; their entries are
    /// filtered by the favourite flag and the pattern.
    #[must_use]
    pub fn filtered(&self, options: &FilterOptions) -> Vec<(&Service, Vec<&LayerEntry>)> {
        let pattern = options.pattern.as_deref().map(str::to_lowercase);
        self.services
            .iter()
            .map(|service| {
                let entries = service
                    .layers
                    .iter()
                    .filter(|entry| {
                        if options.only_favourites && !entry.favourite {
                            return false;
                        }
                        match &pattern {
                            Some(p) if !p.is_empty() => entry_matches(entry, p),
                            _ => true,
                        }
                    })
                    .collect();
                (service, entries)
            })
            .collect()
    }
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_matches(entry: &LayerEntry, lowercase_pattern: &str) -> bool {
    let status = entry.status.map(|s| s.to_string()).unwrap_or_default();
    entry.name.to_lowercase().contains(lowercase_pattern)
        || status.contains(lowercase_pattern)
        || entry
            .crs
            .iter()
            .chain(entry.formats.iter())
            .chain(entry.styles.iter())
            .any(|v| v.to_lowercase().contains(lowercase_pattern))
}
