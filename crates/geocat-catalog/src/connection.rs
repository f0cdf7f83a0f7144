//! Connection-string construction for live service layers.
//!
//! The catalog owns no wire protocol beyond building the standard
//! `GetCapabilities`/`GetFeature` request URLs and the WMS connection
//! parameter string. Everything else is pass-through to the host's
//! providers.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::model::{LayerEntry, ServiceKind};

/// Everything except unreserved characters gets percent-encoded, matching
/// the encoding the host applies to the `layers` connection parameter.
const LAYER_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a layer name for use in a WMS connection string.
#[must_use]
pub fn encode_layer_name(name: &str) -> String {
    utf8_percent_encode(name, LAYER_NAME_SET).to_string()
}

/// Normalizes a base capability URL so query parameters can be appended.
///
/// Stored service URLs may or may not carry a query part; the result always
/// ends with `?` or `&`.
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    let mut normalized = url.to_string();
    if !normalized.ends_with('?') && !normalized.ends_with('&') {
        if normalized.contains('?') {
            normalized.push('&');
        } else {
            normalized.push('?');
        }
    }
    normalized
}

/// Builds the `GetCapabilities` request URL for a service.
///
/// WFS requests pin `VERSION=1.0.0`; WMS lets the server pick.
#[must_use]
pub fn capabilities_url(base_url: &str, kind: ServiceKind) -> String {
    let mut url = normalize_base_url(base_url);
    url.push_str("REQUEST=GetCapabilities&SERVICE=");
    url.push_str(kind.as_str());
    if kind == ServiceKind::Wfs {
        url.push_str("&VERSION=1.0.0");
    }
    url
}

/// Builds the live `GetFeature` connection URL for a WFS layer.
///
/// Appends `SRSNAME` only when the layer advertises a reference system.
#[must_use]
pub fn wfs_feature_url(entry: &LayerEntry) -> String {
    let mut url = normalize_base_url(&entry.url);
    url.push_str("SERVICE=WFS&VERSION=1.0.0&REQUEST=GetFeature&TYPENAME=");
    url.push_str(&entry.name);
    if let Some(srs) = entry.first_crs() {
        url.push_str("&SRSNAME=");
        url.push_str(srs);
    }
    url
}

/// Builds the WMS connection parameter string for a layer.
///
/// Preferences mirror the interactive workflow this replaces:
///
/// - format: `image/png` when offered, else the first advertised format
/// - crs: the host's destination CRS when the layer offers it, else the
///   first advertised CRS
/// - style: the first advertised style, else empty
///
/// The advertised GetMap/GetFeatureInfo URLs are ignored by default; some
/// servers advertise unreachable internal addresses there.
#[must_use]
pub fn wms_connection_string(entry: &LayerEntry, destination_crs: Option<&str>) -> String {
    let format = if entry.formats.iter().any(|f| f == "image/png") {
        "image/png"
    } else {
        entry.formats.first().map_or("", String::as_str)
    };

    let crs = match destination_crs {
        Some(dest) if entry.crs.iter().any(|c| c == dest) => dest,
        _ => entry.first_crs().unwrap_or(""),
    };

    let style = entry.styles.first().map_or("", String::as_str);

    format!(
        "url={}&IgnoreGetMapUrl=1&IgnoreGetFeatureInfoUrl=1&layers={}&format={}&crs={}&styles={}",
        entry.url,
        encode_layer_name(&entry.name),
        format,
        crs,
        style,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wms_entry() -> LayerEntry {
        let mut entry = LayerEntry::new("topography", "http://example.org/wms?");
        entry.formats = vec!["image/jpeg".into(), "image/png".into()];
        entry.crs = vec!["EPSG:4326".into(), "EPSG:3857".into()];
        entry.styles = vec!["default".into(), "hillshade".into()];
        entry
    }

    #[test]
    fn base_url_normalization_terminates_with_separator() {
        assert_eq!(normalize_base_url("http://a.example/wms"), "http://a.example/wms?");
        assert_eq!(
            normalize_base_url("http://a.example/wms?map=x"),
            "http://a.example/wms?map=x&"
        );
        assert_eq!(normalize_base_url("http://a.example/wms?"), "http://a.example/wms?");
        assert_eq!(
            normalize_base_url("http://a.example/wms?map=x&"),
            "http://a.example/wms?map=x&"
        );
    }

    #[test]
    fn capabilities_url_pins_wfs_version() {
        assert_eq!(
            capabilities_url("http://a.example/ows", ServiceKind::Wfs),
            "http://a.example/ows?REQUEST=GetCapabilities&SERVICE=WFS&VERSION=1.0.0"
        );
        assert_eq!(
            capabilities_url("http://a.example/ows?", ServiceKind::Wms),
            "http://a.example/ows?REQUEST=GetCapabilities&SERVICE=WMS"
        );
    }

    #[test]
    fn wfs_feature_url_carries_typename_and_srsname() {
        let mut entry = LayerEntry::new("roads", "http://example.org/wfs?");
        entry.crs = vec!["EPSG:4326".into()];
        let url = wfs_feature_url(&entry);
        assert!(url.ends_with("TYPENAME=roads&SRSNAME=EPSG:4326"), "{url}");
    }

    #[test]
    fn wfs_feature_url_omits_srsname_without_crs() {
        let entry = LayerEntry::new("roads", "http://example.org/wfs?");
        assert!(wfs_feature_url(&entry).ends_with("TYPENAME=roads"));
    }

    #[test]
    fn wms_connection_prefers_png_and_destination_crs() {
        let source = wms_connection_string(&wms_entry(), Some("EPSG:3857"));
        assert!(source.contains("format=image/png"), "{source}");
        assert!(source.contains("crs=EPSG:3857"), "{source}");
        assert!(source.contains("&layers=topography&"), "{source}");
        assert!(source.contains("styles=default"), "{source}");
    }

    #[test]
    fn wms_connection_falls_back_to_first_advertised_values() {
        let mut entry = wms_entry();
        entry.formats = vec!["image/jpeg".into()];
        let source = wms_connection_string(&entry, Some("EPSG:2193"));
        assert!(source.contains("format=image/jpeg"));
        assert!(source.contains("crs=EPSG:4326"));
    }

    #[test]
    fn layer_names_are_percent_encoded() {
        assert_eq!(encode_layer_name("topo map"), "topo%20map");
        assert_eq!(encode_layer_name("ns:roads"), "ns%3Aroads");
        assert_eq!(encode_layer_name("plain_name-1.0~x"), "plain_name-1.0~x");
    }
}
