//! Offline writer fake producing real files on disk.
//!
//! Writing real (placeholder) artifacts lets cache-layout and identity tests
//! run against actual paths instead of mocked filesystems.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use geocat_core::{LayerContent, OfflineWriter, RasterExportOptions, WriteError};

/// Record of a write for test assertions.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// A vector write.
    Vector {
        /// Target shapefile path.
        path: PathBuf,
        /// Requested encoding.
        encoding: String,
        /// Requested CRS.
        crs: Option<String>,
        /// Whether the content came from an active host layer.
        from_active_layer: bool,
    },
    /// A raster write.
    Raster {
        /// Target directory.
        dir: PathBuf,
        /// Whether the export was tiled.
        tiled: bool,
    },
}

/// Offline writer that records writes and creates placeholder artifacts.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    ops: Mutex<Vec<WriteOp>>,
    fail_vector: AtomicBool,
    fail_raster: AtomicBool,
    cancel_next: AtomicBool,
}

impl RecordingWriter {
    /// Creates a writer with no injected failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes vector writes fail.
    pub fn fail_vector(&self, fail: bool) {
        self.fail_vector.store(fail, Ordering::SeqCst);
    }

    /// Makes raster writes fail.
    pub fn fail_raster(&self, fail: bool) {
        self.fail_raster.store(fail, Ordering::SeqCst);
    }

    /// Makes the next write report user cancellation.
    pub fn cancel_next(&self) {
        self.cancel_next.store(true, Ordering::SeqCst);
    }

    /// All recorded writes.
    pub fn ops(&self) -> Vec<WriteOp> {
        self.ops.lock().unwrap().clone()
    }

    fn check_cancelled(&self) -> Result<(), WriteError> {
        if self.cancel_next.swap(false, Ordering::SeqCst) {
            return Err(WriteError::Cancelled);
        }
        Ok(())
    }
}

impl OfflineWriter for RecordingWriter {
    fn write_vector(
        &self,
        content: &LayerContent,
        path: &Path,
        encoding: &str,
        crs: Option<&str>,
    ) -> Result<(), WriteError> {
        self.check_cancelled()?;
        if self.fail_vector.load(Ordering::SeqCst) {
            return Err(WriteError::SourceUnavailable {
                message: "injected vector write failure".to_string(),
            });
        }
        // A shapefile set: main file plus the usual sidecars.
        for extension in ["shp", "shx", "dbf", "prj"] {
            let member = path.with_extension(extension);
            std::fs::write(&member, b"placeholder")
                .map_err(|e| WriteError::io(&member, e.to_string()))?;
        }
        self.ops.lock().unwrap().push(WriteOp::Vector {
            path: path.to_path_buf(),
            encoding: encoding.to_string(),
            crs: crs.map(str::to_string),
            from_active_layer: matches!(content, LayerContent::Active(_)),
        });
        Ok(())
    }

    fn write_raster(
        &self,
        _content: &LayerContent,
        path: &Path,
        options: &RasterExportOptions,
    ) -> Result<(), WriteError> {
        self.check_cancelled()?;
        if self.fail_raster.load(Ordering::SeqCst) {
            return Err(WriteError::SourceUnavailable {
                message: "injected raster write failure".to_string(),
            });
        }
        let stem = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if options.tiled() {
            for tile in ["0_0.tif", "0_1.tif"] {
                let tile_path = path.join(tile);
                std::fs::write(&tile_path, b"tile")
                    .map_err(|e| WriteError::io(&tile_path, e.to_string()))?;
            }
            let index = path.join(format!("{stem}.vrt"));
            std::fs::write(&index, b"<VRTDataset/>")
                .map_err(|e| WriteError::io(&index, e.to_string()))?;
        } else {
            let artifact = path.join(format!("{stem}.tif"));
            std::fs::write(&artifact, b"raster")
                .map_err(|e| WriteError::io(&artifact, e.to_string()))?;
        }
        self.ops.lock().unwrap().push(WriteOp::Raster {
            dir: path.to_path_buf(),
            tiled: options.tiled(),
        });
        Ok(())
    }
}
