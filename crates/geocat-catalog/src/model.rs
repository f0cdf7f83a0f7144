//! Data model for services and their layers.
//!
//! The catalog owns every [`Service`] and [`LayerEntry`] exclusively. Host
//! layers are referenced by opaque id only and the reference is recomputed
//! from the host session on load, never trusted from disk.
//!
//! Two invariants hold after every mutation:
//!
//! - `host_layer` is `Some` iff the entry is represented in the map
//!   (map membership *is* the presence of the id, by construction)
//! - `offline_path` is `Some` iff `status` is `Offline`

use std::path::{Path, PathBuf};

use geocat_core::HostLayerId;
use serde::{Deserialize, Serialize};

/// Kind of a remote service endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Web Map Service (raster).
    Wms,
    /// Web Feature Service (vector).
    Wfs,
}

impl ServiceKind {
    /// Protocol name as used in request URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wms => "WMS",
            Self::Wfs => "WFS",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a layer renders from the live service or a local cache.
///
/// Meaningless until the entry is first added to the map, but persisted
/// regardless: after a restart it is the hint the identity resolver matches
/// against ("the last known rendering was online/offline").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStatus {
    /// Rendered directly from the remote service.
    Online,
    /// Rendered from a locally cached copy.
    Offline,
}

impl std::fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// One advertised layer / feature type of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    /// Machine identifier (WMS `Name` / WFS `TypeName`).
    pub name: String,

    /// Base capability URL the layer is requested against. Usually the
    /// owning service's URL but may diverge per layer.
    pub url: String,

    /// Advertised reference systems, in document order. May be empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crs: Vec<String>,

    /// Advertised GetMap formats (WMS only). Omitted when absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,

    /// Advertised style names (WMS only). Omitted when absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,

    /// User-toggled favourite flag, independent of all other state.
    #[serde(default)]
    pub favourite: bool,

    /// Last known rendering status, `None` until first added to the map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LayerStatus>,

    /// Filesystem location of the cached representation; `Some` iff
    /// `status` is `Offline`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_path: Option<PathBuf>,

    /// Weak reference to the active host layer. Never persisted; the
    /// identity resolver recomputes it on load.
    #[serde(skip)]
    pub host_layer: Option<HostLayerId>,
}

impl LayerEntry {
    /// Creates an entry with no lifecycle state.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            crs: Vec::new(),
            formats: Vec::new(),
            styles: Vec::new(),
            favourite: false,
            status: None,
            offline_path: None,
            host_layer: None,
        }
    }

    /// Whether the entry is currently represented by an active host layer.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.host_layer.is_some()
    }

    /// Whether the last known rendering was offline.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.status == Some(LayerStatus::Offline)
    }

    /// First advertised CRS, if any.
    #[must_use]
    pub fn first_crs(&self) -> Option<&str> {
        self.crs.first().map(String::as_str)
    }

    /// Records that the entry now renders from the cached copy at `path`.
    pub fn mark_offline(&mut self, path: PathBuf) {
        self.status = Some(LayerStatus::Offline);
        self.offline_path = Some(path);
    }

    /// Records that the entry now renders from the live service.
    pub fn mark_online(&mut self) {
        self.status = Some(LayerStatus::Online);
        self.offline_path = None;
    }

    /// Validates the data-model invariants. Used by tests after every
    /// transition.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        self.offline_path.is_some() == (self.status == Some(LayerStatus::Offline))
    }
}

/// A named remote endpoint group with its advertised layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// User-visible title, unique within the catalog (the lookup key).
    pub title: String,

    /// Base capability URL.
    pub url: String,

    /// WMS or WFS.
    pub kind: ServiceKind,

    /// Layers in insertion order; insertion order is display order.
    #[serde(default)]
    pub layers: Vec<LayerEntry>,
}

impl Service {
    /// Creates a service with no layers yet.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            kind,
            layers: Vec::new(),
        }
    }

    /// Finds a layer by name.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&LayerEntry> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Finds a layer by name, mutably.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut LayerEntry> {
        self.layers.iter_mut().find(|l| l.name == name)
    }
}

/// Normalizes a filesystem path for identity comparison.
///
/// Exact path equality is the contract for offline matches; this only
/// canonicalizes when the file exists, so a stale record whose cache file
/// was deleted simply never matches.
#[must_use]
pub fn comparable_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_keep_offline_path_invariant() {
        let mut entry = LayerEntry::new("roads", "http://example.org/wfs?");
        assert!(entry.invariants_hold());

        entry.mark_offline(PathBuf::from("/tmp/cache/roads.shp"));
        assert!(entry.is_offline());
        assert!(entry.invariants_hold());

        entry.mark_online();
        assert_eq!(entry.status, Some(LayerStatus::Online));
        assert!(entry.offline_path.is_none());
        assert!(entry.invariants_hold());
    }

    #[test]
    fn empty_optional_lists_are_omitted_from_serialization() {
        let entry = LayerEntry::new("roads", "http://example.org/wfs?");
        let json = serde_json::to_value(&entry).expect("serialize");
        let object = json.as_object().expect("object");
        assert!(!object.contains_key("formats"));
        assert!(!object.contains_key("styles"));
        assert!(!object.contains_key("status"));
        assert!(!object.contains_key("host_layer"));
    }

    #[test]
    fn service_kind_formats_as_protocol_name() {
        assert_eq!(ServiceKind::Wms.to_string(), "WMS");
        assert_eq!(ServiceKind::Wfs.as_str(), "WFS");
    }
}
