//! Identity resolution between persisted entries and active host layers.
//!
//! Host sessions do not keep stable layer identifiers across restarts, and
//! the host's identity model for a layer is its connection string. The only
//! viable reconciliation is therefore string matching against layer sources,
//! intentionally permissive. No match is not an error: the entry simply
//! starts unmapped.

use geocat_core::{HostLayerId, HostLayerInfo};

use crate::connection::encode_layer_name;
use crate::model::{comparable_path, LayerEntry, ServiceKind};

/// Finds the active host layer corresponding to a persisted entry, if any.
///
/// Matching rules, in priority order:
///
/// 1. Last known status offline: a layer whose source path equals the
///    recorded cache path exactly.
/// 2. Online WFS: a layer whose source starts with the recorded URL and
///    contains `TYPENAME=<name>`, case-insensitively.
/// 3. Online WMS: a layer whose source contains the recorded URL and
///    contains `&layers=<percent-encoded name>`, case-insensitively.
#[must_use]
pub fn resolve(
    entry: &LayerEntry,
    kind: ServiceKind,
    active_layers: &[HostLayerInfo],
) -> Option<HostLayerId> {
    if entry.is_offline() {
        let offline_path = comparable_path(entry.offline_path.as_deref()?);
        return active_layers
            .iter()
            .find(|layer| comparable_path(std::path::Path::new(&layer.source)) == offline_path)
            .map(|layer| layer.id.clone());
    }

    match kind {
        ServiceKind::Wfs => {
            let needle = format!("typename={}", entry.name.to_lowercase());
            active_layers
                .iter()
                .find(|layer| {
                    layer.source.starts_with(&entry.url)
                        && layer.source.to_lowercase().contains(&needle)
                })
                .map(|layer| layer.id.clone())
        }
        ServiceKind::Wms => {
            let needle = format!("&layers={}", encode_layer_name(&entry.name)).to_lowercase();
            active_layers
                .iter()
                .find(|layer| {
                    layer.source.contains(&entry.url)
                        && layer.source.to_lowercase().contains(&needle)
                })
                .map(|layer| layer.id.clone())
        }
    }
}
