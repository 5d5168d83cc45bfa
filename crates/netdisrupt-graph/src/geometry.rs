//! Supported feature geometries and their edge encodings.
//!
//! Only three shapes make it into the network:
//! - `Point` → a node
//! - `LineString` → one edge from its first to its last vertex
//! - `MultiLineString` → one edge per constituent line
//!
//! Everything else is rejected by [`FeatureGeometry::from_geojson`].

use byteorder::{LittleEndian, WriteBytesExt};
use geojson::{Geometry, Value};
use serde::Serialize;

use crate::error::GraphError;

/// WKB geometry type code for a 2-D line string.
const WKB_LINESTRING: u32 = 2;
/// WKB byte-order marker for little-endian (NDR) encoding.
const WKB_NDR: u8 = 1;

/// A 2-D coordinate. Z/M ordinates of the source are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn from_position(pos: &[f64]) -> Result<Self, GraphError> {
        match pos {
            [x, y, ..] => Ok(Self::new(*x, *y)),
            _ => Err(GraphError::InvalidPosition {
                ordinates: pos.len(),
            }),
        }
    }

    /// Hashable identity of this coordinate (bitwise, with `-0.0 == 0.0`).
    pub fn key(&self) -> CoordKey {
        fn bits(v: f64) -> u64 {
            if v == 0.0 {
                0.0f64.to_bits()
            } else {
                v.to_bits()
            }
        }
        CoordKey(bits(self.x), bits(self.y))
    }
}

/// Exact-match node identity; two coordinates share a node only if every bit agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey(u64, u64);

/// An ordered vertex list with at least two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGeometry {
    points: Vec<Coord>,
}

impl LineGeometry {
    pub fn new(points: Vec<Coord>) -> Result<Self, GraphError> {
        if points.len() < 2 {
            return Err(GraphError::DegenerateLine {
                points: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    pub fn first(&self) -> Coord {
        self.points[0]
    }

    pub fn last(&self) -> Coord {
        self.points[self.points.len() - 1]
    }

    /// Little-endian OGC well-known binary.
    pub fn to_wkb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + self.points.len() * 16);
        // Writes into a Vec<u8> cannot fail.
        let _ = out.write_u8(WKB_NDR);
        let _ = out.write_u32::<LittleEndian>(WKB_LINESTRING);
        let _ = out.write_u32::<LittleEndian>(self.points.len() as u32);
        for p in &self.points {
            let _ = out.write_f64::<LittleEndian>(p.x);
            let _ = out.write_f64::<LittleEndian>(p.y);
        }
        out
    }

    /// OGC well-known text, e.g. `LINESTRING (0 0,1 1)`.
    pub fn to_wkt(&self) -> String {
        let coords: Vec<String> = self
            .points
            .iter()
            .map(|p| format!("{} {}", p.x, p.y))
            .collect();
        format!("LINESTRING ({})", coords.join(","))
    }

    /// GeoJSON geometry object serialized to text.
    pub fn to_geojson(&self) -> String {
        let positions = self.points.iter().map(|p| vec![p.x, p.y]).collect();
        let geometry = Geometry::new(Value::LineString(positions));
        serde_json::to_string(&geometry).unwrap_or_default()
    }
}

/// Tagged geometry of a single feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Point(Coord),
    Line(LineGeometry),
    MultiLine(Vec<LineGeometry>),
}

impl FeatureGeometry {
    pub fn from_geojson(geometry: &Geometry) -> Result<Self, GraphError> {
        match &geometry.value {
            Value::Point(pos) => Ok(Self::Point(Coord::from_position(pos)?)),
            Value::LineString(positions) => Ok(Self::Line(line_from_positions(positions)?)),
            Value::MultiLineString(lines) => {
                let parts = lines
                    .iter()
                    .map(|positions| line_from_positions(positions))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::MultiLine(parts))
            }
            other => Err(GraphError::UnsupportedGeometry {
                kind: geometry_kind(other).to_string(),
            }),
        }
    }

    /// The line parts this geometry decomposes into; empty for a point.
    pub fn lines(&self) -> &[LineGeometry] {
        match self {
            Self::Point(_) => &[],
            Self::Line(line) => std::slice::from_ref(line),
            Self::MultiLine(parts) => parts,
        }
    }
}

fn line_from_positions(positions: &[Vec<f64>]) -> Result<LineGeometry, GraphError> {
    let points = positions
        .iter()
        .map(|pos| Coord::from_position(pos))
        .collect::<Result<Vec<_>, _>>()?;
    LineGeometry::new(points)
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
