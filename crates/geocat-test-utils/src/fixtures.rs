//! Pre-built fixtures for catalog tests.
//!
//! Capability documents plus a [`TestHarness`] bundling every collaborator
//! fake with a temporary settings directory.

use std::sync::Arc;

use geocat_catalog::cache::CacheLayout;
use geocat_catalog::lifecycle::{HostBindings, LifecycleController};
use geocat_catalog::persist::PersistenceStore;
use geocat_catalog::service::CatalogService;

use crate::host::MemoryHost;
use crate::net::StaticNetwork;
use crate::writer::RecordingWriter;

/// A WMS 1.3.0 capability document with two layers.
pub fn wms_capabilities() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0">
  <Service><Name>WMS</Name><Title>Test server</Title></Service>
  <Capability>
    <Request>
      <GetMap>
        <Format>image/jpeg</Format>
        <Format>image/png</Format>
      </GetMap>
    </Request>
    <Layer>
      <Name>topography</Name>
      <CRS>EPSG:4326</CRS>
      <CRS>EPSG:3857</CRS>
      <Style><Name>default</Name><Title>Default</Title></Style>
    </Layer>
    <Layer>
      <Name>bathymetry</Name>
      <CRS>EPSG:4326</CRS>
    </Layer>
  </Capability>
</WMS_Capabilities>"#
}

/// A WFS 1.0.0 capability document with two feature types.
pub fn wfs_capabilities() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<WFS_Capabilities version="1.0.0" xmlns="http://www.opengis.net/wfs">
  <FeatureTypeList>
    <FeatureType>
      <Name>roads</Name>
      <Title>Road centrelines</Title>
      <SRS>EPSG:4326</SRS>
    </FeatureType>
    <FeatureType>
      <Name>rivers</Name>
      <SRS>EPSG:2193</SRS>
    </FeatureType>
  </FeatureTypeList>
</WFS_Capabilities>"#
}

/// Collaborator fakes plus a temporary settings directory.
pub struct TestHarness {
    /// The host session fake.
    pub host: Arc<MemoryHost>,
    /// The network fake.
    pub network: Arc<StaticNetwork>,
    /// The offline writer fake.
    pub writer: Arc<RecordingWriter>,
    /// Temporary settings directory; the cache lives below it.
    pub settings: tempfile::TempDir,
}

impl TestHarness {
    /// Creates a fresh harness.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: Arc::new(MemoryHost::new()),
            network: Arc::new(StaticNetwork::new()),
            writer: Arc::new(RecordingWriter::new()),
            settings: tempfile::tempdir().expect("settings dir"),
        }
    }

    /// Host bindings over the harness fakes.
    #[must_use]
    pub fn bindings(&self) -> HostBindings {
        HostBindings {
            layers: self.host.clone(),
            style: self.host.clone(),
            legend: self.host.clone(),
            writer: self.writer.clone(),
        }
    }

    /// A cache layout under the harness settings directory.
    #[must_use]
    pub fn cache(&self) -> CacheLayout {
        CacheLayout::create(self.settings.path()).expect("cache layout")
    }

    /// A lifecycle controller over the harness fakes.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleController {
        LifecycleController::new(self.bindings(), self.cache())
    }

    /// The persistence store under the harness settings directory.
    #[must_use]
    pub fn store(&self) -> PersistenceStore {
        PersistenceStore::new(self.settings.path().join("webdata.json"))
    }

    /// A full catalog service over the harness fakes.
    #[must_use]
    pub fn service(&self) -> CatalogService {
        CatalogService::new(self.bindings(), self.cache(), self.network.clone(), self.store())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
