//! Directory-backed feature store.
//!
//! A store is a directory of GeoJSON documents; each `*.geojson` (or `*.json`)
//! file is one layer named by its file stem.

use geojson::{Feature, GeoJson};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GraphError;
use crate::geometry::FeatureGeometry;
use crate::{edges_from_line, AttrValue, Attributes, NetworkGraph, LAYER_TAG};

const LAYER_EXTENSIONS: &[&str] = &["geojson", "json"];

#[derive(Debug, Clone)]
pub struct LayerSource {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FeatureStore {
    root: PathBuf,
    layers: Vec<LayerSource>,
}

impl FeatureStore {
    pub fn open(path: &Path) -> Result<Self, GraphError> {
        let open_err = |source| GraphError::Open {
            path: path.to_path_buf(),
            source,
        };
        let entries = fs::read_dir(path).map_err(open_err)?;

        let mut layers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(open_err)?;
            let file = entry.path();
            if !file.is_file() {
                continue;
            }
            let is_layer = file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| LAYER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if !is_layer {
                continue;
            }
            if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                layers.push(LayerSource {
                    name: stem.to_string(),
                    path: file.clone(),
                });
            }
        }
        // One layer per stem; `roads.geojson` beats `roads.json`.
        layers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        layers.dedup_by(|dup, kept| {
            let same = dup.name == kept.name;
            if same {
                tracing::warn!(
                    "layer `{}` also defined by {}; using {}",
                    dup.name,
                    dup.path.display(),
                    kept.path.display()
                );
            }
            same
        });

        Ok(Self {
            root: path.to_path_buf(),
            layers,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layers(&self) -> &[LayerSource] {
        &self.layers
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name == name)
    }
}

impl LayerSource {
    pub fn features(&self) -> Result<Vec<Feature>, GraphError> {
        let parse_err = |message: String| GraphError::Parse {
            layer: self.name.clone(),
            path: self.path.clone(),
            message,
        };
        let content = fs::read_to_string(&self.path).map_err(|e| parse_err(e.to_string()))?;
        let doc: GeoJson = content.parse().map_err(|e| parse_err(format!("{e}")))?;

        Ok(match doc {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(g) => vec![Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        })
    }
}

/// Build the network for layer `layer` of the store at `path`.
///
/// A layer name that matches nothing yields an empty graph.
pub fn read_feature_store(path: &Path, layer: &str) -> Result<NetworkGraph, GraphError> {
    let store = FeatureStore::open(path)?;
    let mut net = NetworkGraph::new();
    let mut matched = false;

    for source in store.layers().iter().filter(|l| l.name == layer) {
        matched = true;
        add_layer(&mut net, source)?;
    }

    if !matched {
        tracing::warn!(
            "layer `{}` not found in {}; returning an empty graph",
            layer,
            path.display()
        );
    }
    Ok(net)
}

/// Like [`read_feature_store`], but a missing layer is an error.
pub fn read_feature_store_strict(path: &Path, layer: &str) -> Result<NetworkGraph, GraphError> {
    let store = FeatureStore::open(path)?;
    if !store.has_layer(layer) {
        return Err(GraphError::LayerNotFound {
            layer: layer.to_string(),
            path: path.to_path_buf(),
        });
    }
    read_feature_store(path, layer)
}

fn add_layer(net: &mut NetworkGraph, source: &LayerSource) -> Result<(), GraphError> {
    let features = source.features()?;
    tracing::info!(
        "reading {} features from layer `{}`",
        features.len(),
        source.name
    );

    for (i, feature) in features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            tracing::debug!("feature {i} in `{}` has no geometry; skipped", source.name);
            continue;
        };

        let mut attributes = Attributes::new();
        if let Some(props) = &feature.properties {
            for (k, v) in props {
                attributes.insert(k.clone(), AttrValue::Field(v.clone()));
            }
        }
        attributes.insert(LAYER_TAG.to_string(), AttrValue::Text(source.name.clone()));

        match FeatureGeometry::from_geojson(geometry)? {
            FeatureGeometry::Point(coord) => {
                net.add_node(coord, attributes);
            }
            lines => {
                for (from, to, edge_attrs) in edges_from_line(&lines, &attributes) {
                    net.add_edge(from, to, edge_attrs);
                }
            }
        }
    }
    Ok(())
}
