//! Geospatial network graph builder
//!
//! Turns one layer of a feature store into a directed multigraph:
//!
//! ```text
//!   Point feature            → node keyed by its (x, y)
//!   LineString feature       → edge first vertex → last vertex
//!   MultiLineString feature  → one edge per part
//! ```
//!
//! Edges between the same ordered node pair never merge; each new one gets
//! the next parallel-edge key (0, 1, 2, ...). Every node and edge carries
//! the source feature's fields plus a `ShpName` tag naming the layer, and
//! edges additionally carry `Wkb`, `Wkt` and `Json` encodings of their line.

pub mod error;
pub mod geometry;
pub mod store;

pub use error::GraphError;
pub use geometry::{Coord, CoordKey, FeatureGeometry, LineGeometry};
pub use store::{read_feature_store, read_feature_store_strict, FeatureStore};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Attribute key tagging every element with its layer name.
pub const LAYER_TAG: &str = "ShpName";

/// A single attribute value on a node or edge.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A field copied from the source feature.
    Field(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl AttrValue {
    /// JSON rendering; bytes become a lowercase hex string.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Field(v) => v.clone(),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02x}")).collect();
                serde_json::Value::String(hex)
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Field(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone)]
pub struct NodeData {
    pub coord: Coord,
    pub attributes: Attributes,
}

#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Parallel-edge index among edges sharing the same ordered endpoints.
    pub key: usize,
    pub attributes: Attributes,
}

/// Directed multigraph whose nodes are identified by exact coordinates.
#[derive(Debug, Default, Clone)]
pub struct NetworkGraph {
    graph: DiGraph<NodeData, EdgeData>,
    index: HashMap<CoordKey, NodeIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    /// Edges whose key is > 0, i.e. the extra copies between an already-linked pair.
    pub parallel_edges: usize,
}

/// Flat, serializable view of one edge.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeListEntry {
    pub from: Coord,
    pub to: Coord,
    pub key: usize,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_index(&self, coord: Coord) -> Option<NodeIndex> {
        self.index.get(&coord.key()).copied()
    }

    pub fn node(&self, coord: Coord) -> Option<&NodeData> {
        self.node_index(coord).map(|ix| &self.graph[ix])
    }

    fn ensure_node(&mut self, coord: Coord) -> NodeIndex {
        let graph = &mut self.graph;
        *self.index.entry(coord.key()).or_insert_with(|| {
            graph.add_node(NodeData {
                coord,
                attributes: Attributes::new(),
            })
        })
    }

    /// Add (or enrich) the node at `coord`.
    pub fn add_node(&mut self, coord: Coord, attributes: Attributes) -> NodeIndex {
        let ix = self.ensure_node(coord);
        self.graph[ix].attributes.extend(attributes);
        ix
    }

    /// Add an edge, creating endpoint nodes as needed. Returns its parallel-edge key.
    pub fn add_edge(&mut self, from: Coord, to: Coord, attributes: Attributes) -> usize {
        let a = self.ensure_node(from);
        let b = self.ensure_node(to);
        let key = self.graph.edges_connecting(a, b).count();
        self.graph.add_edge(a, b, EdgeData { key, attributes });
        key
    }

    /// All edges from `from` to `to`, ordered by key.
    pub fn edges_between(&self, from: Coord, to: Coord) -> Vec<&EdgeData> {
        let (Some(a), Some(b)) = (self.node_index(from), self.node_index(to)) else {
            return Vec::new();
        };
        let mut edges: Vec<&EdgeData> = self
            .graph
            .edges_connecting(a, b)
            .map(|e| e.weight())
            .collect();
        edges.sort_by_key(|e| e.key);
        edges
    }

    pub fn edge(&self, ix: EdgeIndex) -> Option<&EdgeData> {
        self.graph.edge_weight(ix)
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            parallel_edges: self
                .graph
                .edge_weights()
                .filter(|e| e.key > 0)
                .count(),
        }
    }

    pub fn to_edge_list(&self) -> Vec<EdgeListEntry> {
        self.graph
            .edge_references()
            .map(|e| EdgeListEntry {
                from: self.graph[e.source()].coord,
                to: self.graph[e.target()].coord,
                key: e.weight().key,
                attributes: e
                    .weight()
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            })
            .collect()
    }

    /// Borrow the underlying petgraph graph (e.g. for centrality computations).
    pub fn inner(&self) -> &DiGraph<NodeData, EdgeData> {
        &self.graph
    }
}

/// Lazily yield one `(from, to, attributes)` triple per line part of `geometry`.
///
/// Each triple gets a copy of `attributes` plus that part's own encodings.
pub fn edges_from_line<'a>(
    geometry: &'a FeatureGeometry,
    attributes: &'a Attributes,
) -> impl Iterator<Item = (Coord, Coord, Attributes)> + 'a {
    geometry.lines().iter().map(move |line| {
        let mut edge_attrs = attributes.clone();
        edge_attrs.insert("Wkb".to_string(), AttrValue::Bytes(line.to_wkb()));
        edge_attrs.insert("Wkt".to_string(), AttrValue::Text(line.to_wkt()));
        edge_attrs.insert("Json".to_string(), AttrValue::Text(line.to_geojson()));
        (line.first(), line.last(), edge_attrs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn parallel_edges_get_increasing_keys() {
        let mut g = NetworkGraph::new();
        assert_eq!(g.add_edge(c(0.0, 0.0), c(1.0, 1.0), Attributes::new()), 0);
        assert_eq!(g.add_edge(c(0.0, 0.0), c(1.0, 1.0), Attributes::new()), 1);
        // Reverse direction is a different ordered pair.
        assert_eq!(g.add_edge(c(1.0, 1.0), c(0.0, 0.0), Attributes::new()), 0);

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.edges_between(c(0.0, 0.0), c(1.0, 1.0)).len(), 2);
        assert_eq!(g.summary().parallel_edges, 1);
    }

    #[test]
    fn point_attributes_merge_into_existing_node() {
        let mut g = NetworkGraph::new();
        g.add_edge(c(0.0, 0.0), c(1.0, 0.0), Attributes::new());
        let mut attrs = Attributes::new();
        attrs.insert("name".into(), AttrValue::Field("depot".into()));
        g.add_node(c(1.0, 0.0), attrs);

        assert_eq!(g.node_count(), 2);
        let node = g.node(c(1.0, 0.0)).unwrap();
        assert_eq!(node.attributes["name"].as_text(), Some("depot"));
    }

    #[test]
    fn edge_list_renders_wkb_as_hex() {
        let line = LineGeometry::new(vec![c(0.0, 0.0), c(1.0, 0.0)]).unwrap();
        let geometry = FeatureGeometry::Line(line);
        let attrs = Attributes::new();
        let mut g = NetworkGraph::new();
        for (from, to, a) in edges_from_line(&geometry, &attrs) {
            g.add_edge(from, to, a);
        }
        let list = g.to_edge_list();
        assert_eq!(list.len(), 1);
        let wkb = list[0].attributes["Wkb"].as_str().unwrap();
        assert!(wkb.starts_with("0102000000"));
    }
}
