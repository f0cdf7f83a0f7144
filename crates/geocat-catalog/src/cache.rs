//! On-disk layout of offline layer caches.
//!
//! Every offline artifact lives under one cache root, keyed by a
//! timestamp-qualified synthetic id, so no two entries ever share a path:
//!
//! ```text
//! {settings_dir}/cachelayers/
//! ├── {id}.shp               # vector cache (plus writer sidecars)
//! └── {id}/                  # raster cache directory
//!     ├── {id}.tif           # untiled output
//!     └── {id}.vrt           # tiled output index
//! ```

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Extensions making up a shapefile sidecar set.
const VECTOR_SIDECAR_EXTENSIONS: &[&str] = &["shp", "shx", "dbf", "prj", "cpg", "qix"];

/// Directory name of the cache below the settings directory.
const CACHE_DIR_NAME: &str = "cachelayers";

/// Path layout for the offline cache of one installation.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Creates the layout under a host-determined settings directory,
    /// creating the cache directory if it is not already there.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created.
    pub fn create(settings_dir: &Path) -> io::Result<Self> {
        let root = settings_dir.join(CACHE_DIR_NAME);
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Produces a fresh synthetic cache id for a layer.
    ///
    /// The timestamp qualifier (millisecond precision) keeps ids unique per
    /// write, so a re-cache never collides with the artifact it replaces.
    #[must_use]
    pub fn synthetic_id(&self, layer_name: &str) -> String {
        let safe_name: String = layer_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{safe_name}{}", Utc::now().format("%Y%m%d%H%M%S%3f"))
    }

    /// Target path of a vector cache artifact.
    #[must_use]
    pub fn vector_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.shp"))
    }

    /// Target directory of a raster cache.
    #[must_use]
    pub fn raster_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Path of the raster layer source inside its cache directory.
    ///
    /// Tiled exports are loaded through their `.vrt` index; untiled exports
    /// through the single `.tif`.
    #[must_use]
    pub fn raster_artifact(&self, id: &str, tiled: bool) -> PathBuf {
        let extension = if tiled { "vrt" } else { "tif" };
        self.raster_dir(id).join(format!("{id}.{extension}"))
    }

    /// Deletes a vector cache artifact and its sidecar files.
    ///
    /// Missing sidecars are fine; a shapefile set does not always carry all
    /// of them.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error removing a file that does exist.
    pub fn delete_vector_artifacts(&self, shp_path: &Path) -> io::Result<()> {
        for extension in VECTOR_SIDECAR_EXTENSIONS {
            let sidecar = shp_path.with_extension(extension);
            match std::fs::remove_file(&sidecar) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Deletes a raster cache directory and its contents.
    ///
    /// `artifact_path` is the recorded layer source inside the directory;
    /// raster caches always live in their own directory, so its parent is
    /// what gets removed. Refuses to remove the cache root itself.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be removed.
    pub fn delete_raster_artifacts(&self, artifact_path: &Path) -> io::Result<()> {
        let Some(dir) = artifact_path.parent() else {
            return Ok(());
        };
        if dir == self.root || !dir.starts_with(&self.root) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a raster cache directory", dir.display()),
            ));
        }
        match std::fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_makes_the_cache_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = CacheLayout::create(dir.path()).expect("create");
        assert!(layout.root().is_dir());
        assert_eq!(layout.root(), dir.path().join("cachelayers"));
    }

    #[test]
    fn synthetic_ids_sanitize_names_and_carry_a_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = CacheLayout::create(dir.path()).expect("create");
        let id = layout.synthetic_id("ns:roads v2");
        assert!(id.starts_with("ns_roads_v2"));
        assert!(id.len() > "ns_roads_v2".len());
    }

    #[test]
    fn vector_deletion_removes_the_sidecar_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = CacheLayout::create(dir.path()).expect("create");
        let shp = layout.vector_path("roads20240101");
        for extension in ["shp", "shx", "dbf"] {
            std::fs::write(shp.with_extension(extension), b"x").expect("write");
        }

        layout.delete_vector_artifacts(&shp).expect("delete");
        assert!(!shp.exists());
        assert!(!shp.with_extension("dbf").exists());
    }

    #[test]
    fn raster_deletion_removes_the_whole_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = CacheLayout::create(dir.path()).expect("create");
        let artifact = layout.raster_artifact("topo20240101", false);
        std::fs::create_dir_all(artifact.parent().expect("parent")).expect("mkdir");
        std::fs::write(&artifact, b"x").expect("write");

        layout.delete_raster_artifacts(&artifact).expect("delete");
        assert!(!layout.raster_dir("topo20240101").exists());
        assert!(layout.root().is_dir());
    }

    #[test]
    fn raster_deletion_refuses_paths_outside_the_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = CacheLayout::create(dir.path()).expect("create");
        let outside = dir.path().join("elsewhere").join("file.tif");
        assert!(layout.delete_raster_artifacts(&outside).is_err());
    }
}
