//! Host application contracts.
//!
//! The catalog drives the hosting map application exclusively through the
//! traits in this module. Implementations are expected to use interior
//! mutability; all methods take `&self` so a single host session can be
//! shared between the lifecycle controller and the orchestrator.
//!
//! Host calls are synchronous by contract. Operations that read live layer
//! geometry while the host is mid-render should be preceded by
//! [`HostLayerFactory::set_render_enabled`] (the offline refresh path does
//! this to avoid visible intermediate states).

use crate::id::HostLayerId;

/// Kind of a host layer, as far as the catalog cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostLayerKind {
    /// A vector layer (WFS online, or a cached shapefile).
    Vector,
    /// A raster layer (WMS online, or a cached raster file).
    Raster,
}

/// Read view of one layer currently active in the host session.
///
/// This is the material the identity resolver works from: the host's
/// identity model is the connection string, so matching is string-based.
#[derive(Debug, Clone)]
pub struct HostLayerInfo {
    /// Host-assigned identifier.
    pub id: HostLayerId,
    /// The layer's source/connection string.
    pub source: String,
    /// Authority identifier of the layer's CRS, when known.
    pub crs: Option<String>,
    /// Vector or raster.
    pub kind: HostLayerKind,
}

/// A rectangular map extent in the host's destination CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapExtent {
    /// Minimum x coordinate.
    pub x_min: f64,
    /// Minimum y coordinate.
    pub y_min: f64,
    /// Maximum x coordinate.
    pub x_max: f64,
    /// Maximum y coordinate.
    pub y_max: f64,
}

/// Factory and registry for layers in the host session.
pub trait HostLayerFactory: Send + Sync + 'static {
    /// Materializes a vector layer from a source string.
    ///
    /// Returns `None` if the host could not create the layer (bad source,
    /// provider unavailable). The catalog treats `None` as a terminal
    /// failure for the current operation, never as partial state.
    fn add_vector_layer(&self, source: &str, name: &str, provider: &str) -> Option<HostLayerId>;

    /// Materializes a raster layer from a source string.
    fn add_raster_layer(&self, source: &str, name: &str, provider: &str) -> Option<HostLayerId>;

    /// Removes the given layers from the host session.
    ///
    /// Unknown identifiers are ignored (the catalog only ever holds weak
    /// references, so a layer may already be gone).
    fn remove_layers(&self, ids: &[HostLayerId]);

    /// Snapshot of all layers currently active in the host session.
    fn active_layers(&self) -> Vec<HostLayerInfo>;

    /// The host's current destination CRS authority id, if a map is open.
    fn destination_crs(&self) -> Option<String>;

    /// The current visible map extent, if a map is open.
    fn current_extent(&self) -> Option<MapExtent>;

    /// Enables or disables host rendering.
    fn set_render_enabled(&self, enabled: bool);

    /// Whether host rendering is currently enabled.
    fn render_enabled(&self) -> bool;

    /// Whether the host is in the middle of drawing the map.
    fn is_drawing(&self) -> bool;
}

/// An exported layer style.
///
/// Opaque to the catalog: it is produced by [`StyleTransfer::export_style`]
/// and only ever handed back to [`StyleTransfer::import_style`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDocument(String);

impl StyleDocument {
    /// Wraps a host-produced style document.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// Returns the raw document content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Style export/import failure on a vector exchange.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    /// The style could not be read from the source layer.
    #[error("style export failed for layer {id}: {message}")]
    Export {
        /// The layer whose style could not be exported.
        id: HostLayerId,
        /// Host-provided reason.
        message: String,
    },

    /// The style could not be applied to the target layer.
    #[error("style import failed for layer {id}: {message}")]
    Import {
        /// The layer the style could not be applied to.
        id: HostLayerId,
        /// Host-provided reason.
        message: String,
    },

    /// One of the layers involved is no longer present in the host.
    #[error("layer {id} is no longer active in the host")]
    LayerGone {
        /// The missing layer.
        id: HostLayerId,
    },
}

/// Style/symbology transfer between host layers.
///
/// Only vector layers carry transferable symbology in this design; raster
/// exchanges skip the style step entirely.
pub trait StyleTransfer: Send + Sync + 'static {
    /// Exports the style of an active layer.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError`] if the layer is gone or its symbology cannot
    /// be serialized.
    fn export_style(&self, layer: &HostLayerId) -> Result<StyleDocument, StyleError>;

    /// Applies a previously exported style to an active layer.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError`] if the layer is gone or rejects the document.
    fn import_style(&self, layer: &HostLayerId, doc: &StyleDocument) -> Result<(), StyleError>;
}

/// Host-side presentation-order mutation.
pub trait LegendReorder: Send + Sync + 'static {
    /// Moves `layer` immediately after `anchor` in the host's presentation
    /// order.
    ///
    /// Returns `false` when either layer cannot be located; the caller must
    /// treat that as an aborted exchange, never prepend or append instead.
    fn move_after(&self, layer: &HostLayerId, anchor: &HostLayerId) -> bool;
}
