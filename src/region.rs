//! Bounding regions used to subset grids.

use serde::Deserialize;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Ring {ring} has {points} distinct point(s), at least 3 are required")]
    InvalidRing { ring: usize, points: usize },

    #[error("Position {0:?} needs a longitude and a latitude")]
    InvalidPosition(Vec<f64>),

    #[error("Bounds ({min_lon}, {min_lat}) .. ({max_lon}, {max_lat}) are empty")]
    InvalidBounds {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },

    #[error("Failed to parse GeoJSON polygon")]
    GeoJson(#[from] serde_json::Error),
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Axis-aligned lon/lat bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Envelope {
    fn of(points: &[Point]) -> Self {
        points.iter().fold(
            Envelope {
                min_lon: f64::INFINITY,
                min_lat: f64::INFINITY,
                max_lon: f64::NEG_INFINITY,
                max_lat: f64::NEG_INFINITY,
            },
            |env, p| Envelope {
                min_lon: env.min_lon.min(p.lon),
                min_lat: env.min_lat.min(p.lat),
                max_lon: env.max_lon.max(p.lon),
                max_lat: env.max_lat.max(p.lat),
            },
        )
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.lon >= self.min_lon
            && point.lon <= self.max_lon
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }
}

/// Anything that can answer point-containment queries.
pub trait Region: Debug + Send + Sync {
    fn contains(&self, point: &Point) -> bool;

    /// A box enclosing every contained point, when cheaply known. Used to pre-filter
    /// candidates in spatial index queries.
    fn envelope(&self) -> Option<Envelope> {
        None
    }
}

/// A simple polygon with optional holes, in lon/lat degrees.
///
/// Containment is strict: points on the boundary of the exterior ring or of a hole are
/// outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<Point>,
    holes: Vec<Vec<Point>>,
    envelope: Envelope,
}

impl Polygon {
    /// Builds a polygon from rings of `(lon, lat)` points. Rings may be given closed or
    /// open.
    pub fn new(exterior: Vec<Point>, holes: Vec<Vec<Point>>) -> Result<Self, RegionError> {
        let exterior = normalize_ring(exterior, 0)?;
        let holes = holes
            .into_iter()
            .enumerate()
            .map(|(i, ring)| normalize_ring(ring, i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        let envelope = Envelope::of(&exterior);
        Ok(Self {
            exterior,
            holes,
            envelope,
        })
    }

    /// Rectangle between two corners.
    pub fn from_bounds(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> Result<Self, RegionError> {
        if !(min_lon < max_lon && min_lat < max_lat) {
            return Err(RegionError::InvalidBounds {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            });
        }
        Self::new(
            vec![
                Point::new(min_lon, min_lat),
                Point::new(max_lon, min_lat),
                Point::new(max_lon, max_lat),
                Point::new(min_lon, max_lat),
            ],
            Vec::new(),
        )
    }

    /// Parses a GeoJSON `Polygon` geometry, or a `Feature` wrapping one.
    pub fn from_geojson(json: &str) -> Result<Self, RegionError> {
        let geometry: GeoJson = serde_json::from_str(json)?;
        geometry.into_polygon()
    }

    pub fn exterior(&self) -> &[Point] {
        &self.exterior
    }

    pub fn holes(&self) -> &[Vec<Point>] {
        &self.holes
    }
}

impl Region for Polygon {
    fn contains(&self, point: &Point) -> bool {
        if !self.envelope.contains(point) {
            return false;
        }
        let rings = std::iter::once(&self.exterior).chain(&self.holes);
        if rings.clone().any(|ring| on_boundary(ring, point)) {
            return false;
        }
        ring_contains(&self.exterior, point)
            && !self.holes.iter().any(|hole| ring_contains(hole, point))
    }

    fn envelope(&self) -> Option<Envelope> {
        Some(self.envelope)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    Feature { geometry: Box<GeoJson> },
}

impl GeoJson {
    fn into_polygon(self) -> Result<Polygon, RegionError> {
        match self {
            GeoJson::Feature { geometry } => geometry.into_polygon(),
            GeoJson::Polygon { coordinates } => {
                let mut rings = coordinates
                    .into_iter()
                    .map(|ring| ring.into_iter().map(position).collect::<Result<Vec<_>, _>>())
                    .collect::<Result<Vec<_>, _>>()?;
                if rings.is_empty() {
                    return Err(RegionError::InvalidRing { ring: 0, points: 0 });
                }
                let exterior = rings.remove(0);
                Polygon::new(exterior, rings)
            }
        }
    }
}

fn position(coords: Vec<f64>) -> Result<Point, RegionError> {
    match coords.as_slice() {
        [lon, lat, ..] => Ok(Point::new(*lon, *lat)),
        _ => Err(RegionError::InvalidPosition(coords)),
    }
}

fn normalize_ring(mut ring: Vec<Point>, index: usize) -> Result<Vec<Point>, RegionError> {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring.dedup();
    if ring.len() < 3 {
        return Err(RegionError::InvalidRing {
            ring: index,
            points: ring.len(),
        });
    }
    Ok(ring)
}

fn edges(ring: &[Point]) -> impl Iterator<Item = (&Point, &Point)> {
    ring.iter().zip(ring.iter().cycle().skip(1))
}

/// Even-odd rule.
fn ring_contains(ring: &[Point], p: &Point) -> bool {
    let mut inside = false;
    for (a, b) in edges(ring) {
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let crossing = (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if p.lon < crossing {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_boundary(ring: &[Point], p: &Point) -> bool {
    edges(ring).any(|(a, b)| {
        let cross = (b.lon - a.lon) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lon - a.lon);
        let scale = (b.lon - a.lon).abs() + (b.lat - a.lat).abs();
        cross.abs() <= 1e-12 * scale.max(1.0)
            && p.lon >= a.lon.min(b.lon)
            && p.lon <= a.lon.max(b.lon)
            && p.lat >= a.lat.min(b.lat)
            && p.lat <= a.lat.max(b.lat)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_containment_is_strict() {
        let square = Polygon::from_bounds(-100.0, 30.0, -90.0, 40.0).unwrap();
        assert!(square.contains(&Point::new(-95.0, 35.0)));
        assert!(!square.contains(&Point::new(-85.0, 35.0)));
        // edges and corners are not interior
        assert!(!square.contains(&Point::new(-100.0, 35.0)));
        assert!(!square.contains(&Point::new(-95.0, 40.0)));
        assert!(!square.contains(&Point::new(-90.0, 30.0)));
    }

    #[test]
    fn test_hole_excludes_points() {
        let outer = Polygon::from_bounds(0.0, 0.0, 10.0, 10.0).unwrap();
        let with_hole = Polygon::new(
            outer.exterior().to_vec(),
            vec![vec![
                Point::new(4.0, 4.0),
                Point::new(6.0, 4.0),
                Point::new(6.0, 6.0),
                Point::new(4.0, 6.0),
            ]],
        )
        .unwrap();
        assert!(with_hole.contains(&Point::new(2.0, 2.0)));
        assert!(!with_hole.contains(&Point::new(5.0, 5.0)));
        assert!(!with_hole.contains(&Point::new(4.0, 5.0)));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening to the north
        let u = Polygon::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(3.0, 0.0),
                Point::new(3.0, 3.0),
                Point::new(2.0, 3.0),
                Point::new(2.0, 1.0),
                Point::new(1.0, 1.0),
                Point::new(1.0, 3.0),
                Point::new(0.0, 3.0),
            ],
            Vec::new(),
        )
        .unwrap();
        assert!(u.contains(&Point::new(0.5, 2.5)));
        assert!(u.contains(&Point::new(2.5, 2.5)));
        assert!(!u.contains(&Point::new(1.5, 2.5)));
        assert!(u.contains(&Point::new(1.5, 0.5)));
    }

    #[test]
    fn test_geojson_polygon_and_feature() {
        let polygon = Polygon::from_geojson(
            r#"{"type":"Polygon","coordinates":[[[-98,35],[-96,35],[-96,37],[-98,37],[-98,35]]]}"#,
        )
        .unwrap();
        assert_eq!(polygon.exterior().len(), 4);
        assert!(polygon.contains(&Point::new(-97.0, 36.0)));

        let feature = Polygon::from_geojson(
            r#"{"type":"Feature","properties":{"name":"box"},
                "geometry":{"type":"Polygon","coordinates":[[[-98,35,0],[-96,35,0],[-96,37,0]]]}}"#,
        )
        .unwrap();
        assert_eq!(feature.envelope().unwrap().max_lat, 37.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            Polygon::from_geojson(r#"{"type":"Point","coordinates":[1,2]}"#),
            Err(RegionError::GeoJson(_))
        ));
        assert!(matches!(
            Polygon::from_geojson(r#"{"type":"Polygon","coordinates":[[[0,0],[1,1],[0,0]]]}"#),
            Err(RegionError::InvalidRing { ring: 0, points: 2 })
        ));
        assert!(matches!(
            Polygon::from_geojson(r#"{"type":"Polygon","coordinates":[[[0],[1,1],[2,0]]]}"#),
            Err(RegionError::InvalidPosition(_))
        ));
        assert!(matches!(
            Polygon::from_bounds(1.0, 0.0, 1.0, 2.0),
            Err(RegionError::InvalidBounds { .. })
        ));
    }
}
