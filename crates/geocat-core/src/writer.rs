//! Offline writer contract.
//!
//! Caching a layer offline means producing a local artifact from either an
//! already-active host layer or a freshly built connection string. The
//! concrete formats (shapefile for vectors, possibly tiled raster output)
//! are the writer's concern; the catalog only decides paths and drives the
//! lifecycle around the write.

use std::path::Path;

use crate::host::MapExtent;
use crate::id::HostLayerId;

/// What the writer reads the layer content from.
#[derive(Debug, Clone)]
pub enum LayerContent {
    /// An already-active host layer (the write snapshots its live data).
    Active(HostLayerId),
    /// A connection string the writer materializes privately for the
    /// duration of the write. Used when the entry is not in the map.
    Source(String),
}

/// Options for a raster export, standing in for the interactive save-as
/// inputs of the original workflow.
#[derive(Debug, Clone)]
pub struct RasterExportOptions {
    /// Output raster width in pixels.
    pub columns: u32,
    /// Output raster height in pixels.
    pub rows: u32,
    /// Extent to export.
    pub extent: MapExtent,
    /// CRS authority id of the export.
    pub crs: Option<String>,
    /// Tile size as `(max_width, max_height)`; `None` writes one file.
    pub tile_size: Option<(u32, u32)>,
}

impl RasterExportOptions {
    /// Whether the export is tiled.
    #[must_use]
    pub fn tiled(&self) -> bool {
        self.tile_size.is_some()
    }
}

/// Failure producing an offline artifact.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The user cancelled the export before it started writing.
    #[error("offline write cancelled")]
    Cancelled,

    /// The source layer or connection could not be opened.
    #[error("cannot open source for offline write: {message}")]
    SourceUnavailable {
        /// Provider-level reason.
        message: String,
    },

    /// The artifact could not be written (disk, permissions, provider).
    #[error("offline write to {path} failed: {message}")]
    Io {
        /// Target path of the failed write.
        path: String,
        /// Underlying reason.
        message: String,
    },
}

impl WriteError {
    /// Creates an I/O write error for the given path.
    #[must_use]
    pub fn io(path: &Path, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Produces offline artifacts from layer content.
pub trait OfflineWriter: Send + Sync + 'static {
    /// Writes vector content to `path` in the writer's vector format.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the source cannot be read or the artifact
    /// cannot be produced. On error no partial artifact may remain behind.
    fn write_vector(
        &self,
        content: &LayerContent,
        path: &Path,
        encoding: &str,
        crs: Option<&str>,
    ) -> Result<(), WriteError>;

    /// Writes raster content into the directory at `path`.
    ///
    /// With tiling enabled the writer produces tiles plus an index artifact;
    /// without, a single raster file. Either way the caller derives the
    /// resulting layer source path from its own naming scheme.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] on cancellation or any provider/disk failure.
    fn write_raster(
        &self,
        content: &LayerContent,
        path: &Path,
        options: &RasterExportOptions,
    ) -> Result<(), WriteError>;
}
