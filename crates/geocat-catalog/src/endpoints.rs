//! Registry of known service endpoints.
//!
//! Users collect named WMS/WFS endpoints over time and add services to the
//! catalog from this list. The registry is a plain name → endpoint map
//! persisted inside the sidecar document; discovery helpers that populate
//! it from external sources live outside the core.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ServiceKind;

/// One named endpoint a service can be added from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// WMS or WFS.
    pub kind: ServiceKind,
    /// Base capability URL.
    pub url: String,
}

/// Named endpoints, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, ServiceEndpoint>,
}

impl EndpointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an endpoint under a sanitized name.
    ///
    /// Slashes in names would collide with the hierarchic settings keys the
    /// original storage used; they stay illegal and become underscores.
    /// Empty names or URLs are ignored.
    ///
    /// Returns the name the endpoint was stored under, if it was stored.
    pub fn upsert(
        &mut self,
        name: &str,
        kind: ServiceKind,
        url: impl Into<String>,
    ) -> Option<String> {
        let url = url.into();
        if name.is_empty() || url.is_empty() {
            return None;
        }
        let stored_name = name.replace('/', "_");
        self.endpoints
            .insert(stored_name.clone(), ServiceEndpoint { kind, url });
        Some(stored_name)
    }

    /// Removes an endpoint by name.
    pub fn remove(&mut self, name: &str) -> Option<ServiceEndpoint> {
        self.endpoints.remove(name)
    }

    /// Looks up an endpoint by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServiceEndpoint> {
        self.endpoints.get(name)
    }

    /// All endpoints in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServiceEndpoint)> {
        self.endpoints.iter()
    }

    /// Number of endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sanitized_and_replace_existing_entries() {
        let mut registry = EndpointRegistry::new();
        let stored = registry
            .upsert("LINZ/WFS", ServiceKind::Wfs, "http://wfs.example/key1/wfs")
            .expect("stored");
        assert_eq!(stored, "LINZ_WFS");

        registry.upsert("LINZ_WFS", ServiceKind::Wfs, "http://wfs.example/key2/wfs");
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("LINZ_WFS").expect("endpoint").url,
            "http://wfs.example/key2/wfs"
        );
    }

    #[test]
    fn empty_names_and_urls_are_rejected() {
        let mut registry = EndpointRegistry::new();
        assert!(registry.upsert("", ServiceKind::Wms, "http://x.example").is_none());
        assert!(registry.upsert("name", ServiceKind::Wms, "").is_none());
        assert!(registry.is_empty());
    }
}
