//! In-memory host session with operation recording.
//!
//! One [`MemoryHost`] stands in for all three host contracts at once, the
//! way a real host session does: it keeps an ordered layer list, hands out
//! sequential identifiers, and records every mutation for later assertion.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use geocat_core::{
    HostLayerFactory, HostLayerId, HostLayerInfo, HostLayerKind, LegendReorder, MapExtent,
    StyleDocument, StyleError, StyleTransfer,
};

/// Record of a host operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    /// A layer was materialized.
    AddLayer {
        /// Display name the layer was added under.
        name: String,
        /// Provider key it was materialized with.
        provider: String,
    },
    /// Layers were removed.
    RemoveLayers {
        /// The removed identifiers.
        ids: Vec<HostLayerId>,
    },
    /// Rendering was toggled.
    SetRenderEnabled {
        /// The new state.
        enabled: bool,
    },
}

#[derive(Debug, Clone)]
struct SessionLayer {
    id: HostLayerId,
    source: String,
    crs: Option<String>,
    kind: HostLayerKind,
    style: StyleDocument,
}

/// In-memory host session implementing [`HostLayerFactory`],
/// [`StyleTransfer`], and [`LegendReorder`].
#[derive(Debug)]
pub struct MemoryHost {
    layers: Mutex<Vec<SessionLayer>>,
    ops: Mutex<Vec<HostOp>>,
    next_id: AtomicU64,
    render_enabled: AtomicBool,
    drawing: AtomicBool,
    destination_crs: Mutex<Option<String>>,
    extent: Mutex<Option<MapExtent>>,
    fail_providers: Mutex<HashSet<String>>,
    fail_style_export: AtomicBool,
    fail_style_import: AtomicBool,
    fail_move_after: AtomicBool,
}

impl MemoryHost {
    /// Creates an empty session with rendering enabled and a default extent.
    pub fn new() -> Self {
        Self {
            layers: Mutex::new(Vec::new()),
            ops: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            render_enabled: AtomicBool::new(true),
            drawing: AtomicBool::new(false),
            destination_crs: Mutex::new(Some("EPSG:3857".to_string())),
            extent: Mutex::new(Some(MapExtent {
                x_min: 0.0,
                y_min: 0.0,
                x_max: 100.0,
                y_max: 100.0,
            })),
            fail_providers: Mutex::new(HashSet::new()),
            fail_style_export: AtomicBool::new(false),
            fail_style_import: AtomicBool::new(false),
            fail_move_after: AtomicBool::new(false),
        }
    }

    /// Sets the destination CRS reported to the catalog.
    pub fn set_destination_crs(&self, crs: Option<&str>) {
        *self.destination_crs.lock().unwrap() = crs.map(str::to_string);
    }

    /// Makes every materialization through `provider` fail.
    pub fn fail_provider(&self, provider: &str) {
        self.fail_providers.lock().unwrap().insert(provider.to_string());
    }

    /// Makes the next style exports fail.
    pub fn fail_style_export(&self, fail: bool) {
        self.fail_style_export.store(fail, Ordering::SeqCst);
    }

    /// Makes the next style imports fail.
    pub fn fail_style_import(&self, fail: bool) {
        self.fail_style_import.store(fail, Ordering::SeqCst);
    }

    /// Makes legend reordering report failure.
    pub fn fail_move_after(&self, fail: bool) {
        self.fail_move_after.store(fail, Ordering::SeqCst);
    }

    /// Marks the host as mid-render (or idle again).
    pub fn set_drawing(&self, drawing: bool) {
        self.drawing.store(drawing, Ordering::SeqCst);
    }

    /// Pre-populates a session layer, as a host restoring a project does.
    pub fn insert_session_layer(&self, source: &str, kind: HostLayerKind) -> HostLayerId {
        let id = self.fresh_id();
        self.layers.lock().unwrap().push(SessionLayer {
            id: id.clone(),
            source: source.to_string(),
            crs: None,
            kind,
            style: StyleDocument::new("restored"),
        });
        id
    }

    /// Overwrites a layer's style directly, bypassing [`StyleTransfer`].
    pub fn set_style(&self, id: &HostLayerId, style: StyleDocument) {
        let mut layers = self.layers.lock().unwrap();
        if let Some(layer) = layers.iter_mut().find(|l| &l.id == id) {
            layer.style = style;
        }
    }

    /// The current style of a layer.
    pub fn style_of(&self, id: &HostLayerId) -> Option<StyleDocument> {
        self.layers
            .lock()
            .unwrap()
            .iter()
            .find(|l| &l.id == id)
            .map(|l| l.style.clone())
    }

    /// Whether the session still holds the layer.
    pub fn contains(&self, id: &HostLayerId) -> bool {
        self.layers.lock().unwrap().iter().any(|l| &l.id == id)
    }

    /// Session layer identifiers in presentation order.
    pub fn layer_order(&self) -> Vec<HostLayerId> {
        self.layers.lock().unwrap().iter().map(|l| l.id.clone()).collect()
    }

    /// All recorded operations.
    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.lock().unwrap().clone()
    }

    fn fresh_id(&self) -> HostLayerId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        HostLayerId::new(format!("layer-{n}"))
    }

    fn add_layer(
        &self,
        source: &str,
        name: &str,
        provider: &str,
        kind: HostLayerKind,
    ) -> Option<HostLayerId> {
        if self.fail_providers.lock().unwrap().contains(provider) {
            return None;
        }
        let id = self.fresh_id();
        self.layers.lock().unwrap().push(SessionLayer {
            id: id.clone(),
            source: source.to_string(),
            crs: None,
            kind,
            style: StyleDocument::new(format!("default-style-{name}")),
        });
        self.ops.lock().unwrap().push(HostOp::AddLayer {
            name: name.to_string(),
            provider: provider.to_string(),
        });
        Some(id)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLayerFactory for MemoryHost {
    fn add_vector_layer(&self, source: &str, name: &str, provider: &str) -> Option<HostLayerId> {
        self.add_layer(source, name, provider, HostLayerKind::Vector)
    }

    fn add_raster_layer(&self, source: &str, name: &str, provider: &str) -> Option<HostLayerId> {
        self.add_layer(source, name, provider, HostLayerKind::Raster)
    }

    fn remove_layers(&self, ids: &[HostLayerId]) {
        self.layers.lock().unwrap().retain(|l| !ids.contains(&l.id));
        self.ops.lock().unwrap().push(HostOp::RemoveLayers {
            ids: ids.to_vec(),
        });
    }

    fn active_layers(&self) -> Vec<HostLayerInfo> {
        self.layers
            .lock()
            .unwrap()
            .iter()
            .map(|l| HostLayerInfo {
                id: l.id.clone(),
                source: l.source.clone(),
                crs: l.crs.clone(),
                kind: l.kind,
            })
            .collect()
    }

    fn destination_crs(&self) -> Option<String> {
        self.destination_crs.lock().unwrap().clone()
    }

    fn current_extent(&self) -> Option<MapExtent> {
        *self.extent.lock().unwrap()
    }

    fn set_render_enabled(&self, enabled: bool) {
        self.render_enabled.store(enabled, Ordering::SeqCst);
        self.ops
            .lock()
            .unwrap()
            .push(HostOp::SetRenderEnabled { enabled });
    }

    fn render_enabled(&self) -> bool {
        self.render_enabled.load(Ordering::SeqCst)
    }

    fn is_drawing(&self) -> bool {
        self.drawing.load(Ordering::SeqCst)
    }
}

impl StyleTransfer for MemoryHost {
    fn export_style(&self, layer: &HostLayerId) -> Result<StyleDocument, StyleError> {
        if self.fail_style_export.load(Ordering::SeqCst) {
            return Err(StyleError::Export {
                id: layer.clone(),
                message: "injected export failure".to_string(),
            });
        }
        self.style_of(layer).ok_or_else(|| StyleError::LayerGone {
            id: layer.clone(),
        })
    }

    fn import_style(&self, layer: &HostLayerId, doc: &StyleDocument) -> Result<(), StyleError> {
        if self.fail_style_import.load(Ordering::SeqCst) {
            return Err(StyleError::Import {
                id: layer.clone(),
                message: "injected import failure".to_string(),
            });
        }
        let mut layers = self.layers.lock().unwrap();
        let target = layers
            .iter_mut()
            .find(|l| &l.id == layer)
            .ok_or_else(|| StyleError::LayerGone { id: layer.clone() })?;
        target.style = doc.clone();
        Ok(())
    }
}

impl LegendReorder for MemoryHost {
    fn move_after(&self, layer: &HostLayerId, anchor: &HostLayerId) -> bool {
        if self.fail_move_after.load(Ordering::SeqCst) {
            return false;
        }
        let mut layers = self.layers.lock().unwrap();
        let Some(from) = layers.iter().position(|l| &l.id == layer) else {
            return false;
        };
        if !layers.iter().any(|l| &l.id == anchor) {
            return false;
        }
        let moved = layers.remove(from);
        let anchor_at = layers
            .iter()
            .position(|l| &l.id == anchor)
            .expect("anchor present");
        layers.insert(anchor_at + 1, moved);
        true
    }
}
