//! GeoJSON geometry operands for the geospatial query operators.
//!
//! Geometries serialize to the exact wire form the server expects under
//! `$geometry`, e.g. `{ "type": "Point", "coordinates": [lng, lat] }`.
//! Positions are `[longitude, latitude]` pairs, in that order.

use serde::{ Serialize, Deserialize };

/// A single position: `[longitude, latitude]`.
pub type Position = [f64; 2];

/// A GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position.
    Point {
        /// The position.
        coordinates: Position,
    },
    /// An open chain of two or more positions.
    LineString {
        /// The chain of positions.
        coordinates: Vec<Position>,
    },
    /// One exterior ring followed by any number of interior (hole) rings.
    /// Every ring must be closed: its first and last positions coincide.
    Polygon {
        /// The rings.
        coordinates: Vec<Vec<Position>>,
    },
    /// A set of positions.
    MultiPoint {
        /// The positions.
        coordinates: Vec<Position>,
    },
    /// A set of position chains.
    MultiLineString {
        /// The chains.
        coordinates: Vec<Vec<Position>>,
    },
    /// A set of polygons.
    MultiPolygon {
        /// The polygons, each a list of rings.
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl Geometry {
    /// A point at the given coordinates.
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Geometry::Point { coordinates: [longitude, latitude] }
    }

    /// A line through the given positions.
    pub fn line_string<I: IntoIterator<Item = Position>>(positions: I) -> Self {
        Geometry::LineString { coordinates: positions.into_iter().collect() }
    }

    /// A polygon with a single exterior ring and no holes.
    pub fn polygon<I: IntoIterator<Item = Position>>(exterior: I) -> Self {
        Geometry::Polygon { coordinates: vec![exterior.into_iter().collect()] }
    }
}

#[cfg(test)]
mod tests {
    use super::Geometry;

    #[test]
    fn geometries_serialize_to_geojson() {
        let point = bson::to_bson(&Geometry::point(19.04, 47.50)).ok();
        assert_eq!(point, Some(bson!({
            "type": "Point",
            "coordinates": [19.04, 47.50],
        })));

        let polygon = bson::to_bson(&Geometry::polygon(vec![
            [0.0, 0.0], [3.0, 6.0], [6.0, 1.0], [0.0, 0.0],
        ])).ok();
        assert_eq!(polygon, Some(bson!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [3.0, 6.0], [6.0, 1.0], [0.0, 0.0]]],
        })));
    }
}
