//! Capability document parsing.
//!
//! Turns a WMS or WFS `GetCapabilities` response into an ordered list of
//! [`LayerDescriptor`]s. Parsing is a pure function over the document bytes:
//! it never touches the catalog and has no side effects.
//!
//! WMS documents are read without namespace handling (1.1.1 documents carry
//! none, 1.3.0 uses an unprefixed default namespace); the WFS reader resolves
//! the `wfs` namespace explicitly.

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};

use crate::model::ServiceKind;

const WFS_NAMESPACE: &[u8] = b"http://www.opengis.net/wfs";

/// One layer or feature type advertised by a capability document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// WMS `Name` / WFS `TypeName`. Empty when the element advertises none.
    pub name: String,
    /// Reference systems in document order: all `CRS` values first, then
    /// all `SRS` values, duplicates kept.
    pub crs: Vec<String>,
    /// The service-wide `GetMap` format list (WMS only).
    pub formats: Vec<String>,
    /// Advertised style names (WMS only).
    pub styles: Vec<String>,
}

/// Capability parsing failure.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("malformed capability document at line {line}, column {column}: {message}")]
    Malformed {
        /// Parser-provided reason.
        message: String,
        /// 1-based line of the failure.
        line: u64,
        /// 1-based column of the failure.
        column: u64,
    },

    /// The document is well-formed but advertises no layers.
    #[error("capability document advertises no layers")]
    NoLayers,
}

/// Parses a capability document into layer descriptors, in document order.
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] for ill-formed XML (with line/column of
/// the failure) and [`ParseError::NoLayers`] when the document contains no
/// `<Layer>` (WMS) or `wfs:FeatureType` (WFS) elements.
pub fn parse_capabilities(
    document: &[u8],
    kind: ServiceKind,
) -> Result<Vec<LayerDescriptor>, ParseError> {
    match kind {
        ServiceKind::Wms => parse_wms(document),
        ServiceKind::Wfs => parse_wfs(document),
    }
}

/// In-progress WMS layer; `crs` and `srs` stay separate until the end so
/// the 1.3 values precede the 1.1.1 values regardless of interleaving.
#[derive(Default)]
struct WmsLayer {
    name: Option<String>,
    crs: Vec<String>,
    srs: Vec<String>,
    styles: Vec<String>,
}

fn parse_wms(document: &[u8]) -> Result<Vec<LayerDescriptor>, ParseError> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();

    // Stack of open element local names, and the subset that are <Layer>
    // frames (as indices into `layers`). A value element applies to every
    // open layer, which reproduces the descendant-collection semantics of
    // the capability tree: nested layers contribute to their ancestors.
    let mut path: Vec<String> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut layers: Vec<WmsLayer> = Vec::new();
    let mut formats: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(malformed(document, reader.buffer_position(), &e)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "Layer" {
                    open.push(layers.len());
                    layers.push(WmsLayer::default());
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Text(t)) => {
                let chunk = t
                    .unescape()
                    .map_err(|e| malformed(document, reader.buffer_position(), &e))?;
                text.push_str(&chunk);
            }
            Ok(Event::End(_)) => {
                let Some(closed) = path.pop() else { continue };
                let value = text.trim();
                match closed.as_str() {
                    "Format" if path_is(&path, &["Capability", "Request", "GetMap"]) => {
                        if !value.is_empty() {
                            formats.push(value.to_string());
                        }
                    }
                    "Name" if !open.is_empty() && !value.is_empty() => {
                        let style_name = path.last().is_some_and(|p| p == "Style");
                        for &i in &open {
                            let layer = &mut layers[i];
                            if style_name {
                                layer.styles.push(value.to_string());
                            } else if layer.name.is_none() {
                                layer.name = Some(value.to_string());
                            }
                        }
                    }
                    "CRS" if !open.is_empty() && !value.is_empty() => {
                        for &i in &open {
                            layers[i].crs.push(value.to_string());
                        }
                    }
                    "SRS" if !open.is_empty() && !value.is_empty() => {
                        for &i in &open {
                            layers[i].srs.push(value.to_string());
                        }
                    }
                    "Layer" => {
                        open.pop();
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    if layers.is_empty() {
        return Err(ParseError::NoLayers);
    }

    Ok(layers
        .into_iter()
        .map(|mut layer| {
            let mut crs = layer.crs;
            crs.append(&mut layer.srs);
            LayerDescriptor {
                name: layer.name.unwrap_or_default(),
                crs,
                formats: formats.clone(),
                styles: layer.styles,
            }
        })
        .collect())
}

#[derive(Default)]
struct WfsFeature {
    name: Option<String>,
    srs: Option<String>,
}

fn parse_wfs(document: &[u8]) -> Result<Vec<LayerDescriptor>, ParseError> {
    let mut reader = NsReader::from_reader(document);
    let mut buf = Vec::new();

    let mut current: Option<WfsFeature> = None;
    let mut features: Vec<WfsFeature> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Err(e) => return Err(malformed(document, reader.buffer_position(), &e)),
            Ok((_, Event::Eof)) => break,
            Ok((ns, Event::Start(e))) => {
                if in_wfs_namespace(&ns) && e.local_name().as_ref() == b"FeatureType" {
                    current = Some(WfsFeature::default());
                }
                text.clear();
            }
            Ok((_, Event::Text(t))) => {
                let chunk = t
                    .unescape()
                    .map_err(|e| malformed(document, reader.buffer_position(), &e))?;
                text.push_str(&chunk);
            }
            Ok((ns, Event::End(e))) => {
                if in_wfs_namespace(&ns) {
                    let value = text.trim();
                    match e.local_name().as_ref() {
                        b"Name" => {
                            if let Some(feature) = current.as_mut() {
                                if feature.name.is_none() && !value.is_empty() {
                                    feature.name = Some(value.to_string());
                                }
                            }
                        }
                        b"SRS" => {
                            if let Some(feature) = current.as_mut() {
                                if feature.srs.is_none() && !value.is_empty() {
                                    feature.srs = Some(value.to_string());
                                }
                            }
                        }
                        b"FeatureType" => {
                            if let Some(feature) = current.take() {
                                features.push(feature);
                            }
                        }
                        _ => {}
                    }
                }
                text.clear();
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    if features.is_empty() {
        return Err(ParseError::NoLayers);
    }

    Ok(features
        .into_iter()
        .map(|feature| LayerDescriptor {
            name: feature.name.unwrap_or_default(),
            crs: feature.srs.into_iter().collect(),
            formats: Vec::new(),
            styles: Vec::new(),
        })
        .collect())
}

fn in_wfs_namespace(resolution: &ResolveResult<'_>) -> bool {
    matches!(resolution, ResolveResult::Bound(ns) if ns.as_ref() == WFS_NAMESPACE)
}

fn path_is(path: &[String], expected: &[&str]) -> bool {
    path.len() >= expected.len()
        && path
            .iter()
            .rev()
            .zip(expected.iter().rev())
            .all(|(have, want)| have == want)
        // the element chain must hang directly off the document root
        && path.len() == expected.len() + 1
}

fn malformed(document: &[u8], position: usize, error: &dyn std::fmt::Display) -> ParseError {
    let consumed = &document[..position.min(document.len())];
    let line = consumed.iter().filter(|&&b| b == b'\n').count() as u64 + 1;
    let column = consumed
        .iter()
        .rev()
        .take_while(|&&b| b != b'\n')
        .count() as u64
        + 1;
    ParseError::Malformed {
        message: error.to_string(),
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WMS_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
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
      <Style><Name>hillshade</Name></Style>
    </Layer>
    <Layer>
      <Name>bathymetry</Name>
      <SRS>EPSG:4326</SRS>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    const WFS_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WFS_Capabilities version="1.0.0" xmlns="http://www.opengis.net/wfs">
  <FeatureTypeList>
    <FeatureType>
      <Name>roads</Name>
      <Title>Road centrelines</Title>
      <Abstract>All roads</Abstract>
      <SRS>EPSG:4326</SRS>
    </FeatureType>
    <FeatureType>
      <Name>rivers</Name>
      <SRS>EPSG:2193</SRS>
    </FeatureType>
  </FeatureTypeList>
</WFS_Capabilities>"#;

    #[test]
    fn wms_yields_one_descriptor_per_layer_in_document_order() {
        let layers = parse_capabilities(WMS_DOC.as_bytes(), ServiceKind::Wms).expect("parse");
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].name, "topography");
        assert_eq!(layers[1].name, "bathymetry");
    }

    #[test]
    fn wms_formats_are_shared_and_ordered() {
        let layers = parse_capabilities(WMS_DOC.as_bytes(), ServiceKind::Wms).expect("parse");
        for layer in &layers {
            assert_eq!(layer.formats, vec!["image/jpeg", "image/png"]);
        }
    }

    #[test]
    fn wms_collects_crs_before_srs_and_styles_by_name() {
        let layers = parse_capabilities(WMS_DOC.as_bytes(), ServiceKind::Wms).expect("parse");
        assert_eq!(layers[0].crs, vec!["EPSG:4326", "EPSG:3857"]);
        assert_eq!(layers[0].styles, vec!["default", "hillshade"]);
        assert_eq!(layers[1].crs, vec!["EPSG:4326"]);
        assert!(layers[1].styles.is_empty());
    }

    #[test]
    fn wms_nested_layers_each_get_a_descriptor() {
        let doc = r#"<WMS_Capabilities>
          <Capability>
            <Layer>
              <Name>group</Name>
              <CRS>EPSG:4326</CRS>
              <Layer><Name>child</Name><CRS>EPSG:3857</CRS></Layer>
            </Layer>
          </Capability>
        </WMS_Capabilities>"#;
        let layers = parse_capabilities(doc.as_bytes(), ServiceKind::Wms).expect("parse");
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].name, "group");
        // The child's CRS also belongs to the enclosing group layer.
        assert_eq!(layers[0].crs, vec!["EPSG:4326", "EPSG:3857"]);
        assert_eq!(layers[1].name, "child");
        assert_eq!(layers[1].crs, vec!["EPSG:3857"]);
    }

    #[test]
    fn wms_without_layers_is_no_layers() {
        let doc = "<WMS_Capabilities><Capability/></WMS_Capabilities>";
        let err = parse_capabilities(doc.as_bytes(), ServiceKind::Wms).unwrap_err();
        assert!(matches!(err, ParseError::NoLayers));
    }

    #[test]
    fn malformed_document_reports_line_and_column() {
        let doc = "<WMS_Capabilities>\n  <Layer>\n</WMS_Capabilities>";
        let err = parse_capabilities(doc.as_bytes(), ServiceKind::Wms).unwrap_err();
        match err {
            ParseError::Malformed { line, .. } => assert_eq!(line, 3),
            ParseError::NoLayers => panic!("expected malformed error"),
        }
    }

    #[test]
    fn wfs_yields_one_descriptor_per_feature_type() {
        let layers = parse_capabilities(WFS_DOC.as_bytes(), ServiceKind::Wfs).expect("parse");
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].name, "roads");
        assert_eq!(layers[0].crs, vec!["EPSG:4326"]);
        assert!(layers[0].formats.is_empty());
        assert_eq!(layers[1].name, "rivers");
        assert_eq!(layers[1].crs, vec!["EPSG:2193"]);
    }

    #[test]
    fn wfs_requires_the_wfs_namespace() {
        let doc = r"<WFS_Capabilities>
          <FeatureType><Name>roads</Name></FeatureType>
        </WFS_Capabilities>";
        let err = parse_capabilities(doc.as_bytes(), ServiceKind::Wfs).unwrap_err();
        assert!(matches!(err, ParseError::NoLayers));
    }

    #[test]
    fn wfs_with_prefixed_namespace_is_accepted() {
        let doc = r#"<wfs:WFS_Capabilities xmlns:wfs="http://www.opengis.net/wfs">
          <wfs:FeatureTypeList>
            <wfs:FeatureType><wfs:Name>parcels</wfs:Name><wfs:SRS>EPSG:2193</wfs:SRS></wfs:FeatureType>
          </wfs:FeatureTypeList>
        </wfs:WFS_Capabilities>"#;
        let layers = parse_capabilities(doc.as_bytes(), ServiceKind::Wfs).expect("parse");
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "parcels");
    }
}
