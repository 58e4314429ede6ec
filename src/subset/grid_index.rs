use crate::dataset::GridArray;
use crate::region::{Point, Region};
use log::debug;
use rstar::{Envelope as _, PointDistance, RTree, RTreeObject, SelectionFunction, AABB};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// One grid cell centre, positioned by `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    position: [f64; 2],
    y: usize,
    x: usize,
}

impl GridPoint {
    pub fn point(&self) -> Point {
        Point::new(self.position[0], self.position[1])
    }

    pub fn index(&self) -> (usize, usize) {
        (self.y, self.x)
    }
}

impl RTreeObject for GridPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for GridPoint {
    /// Squared planar distance in degrees.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d_lon = self.position[0] - point[0];
        let d_lat = self.position[1] - point[1];
        d_lon * d_lon + d_lat * d_lat
    }
}

struct WithinBox(AABB<[f64; 2]>);

impl SelectionFunction<GridPoint> for WithinBox {
    fn should_unpack_parent(&self, envelope: &AABB<[f64; 2]>) -> bool {
        self.0.intersects(envelope)
    }

    fn should_unpack_leaf(&self, leaf: &GridPoint) -> bool {
        self.0.contains_point(&leaf.position)
    }
}

/// R-tree over every finite point of a 2-D lat/lon grid.
#[derive(Debug)]
pub struct GridIndex {
    tree: RTree<GridPoint>,
}

impl GridIndex {
    /// `lat` and `lon` must share the same (`ny`, `nx`) shape.
    pub fn build(lat: &GridArray, lon: &GridArray) -> Self {
        let nx = lat.shape().get(1).copied().unwrap_or(0).max(1);
        let points: Vec<GridPoint> = lat
            .values()
            .iter()
            .zip(lon.values())
            .enumerate()
            .filter(|(_, (la, lo))| la.is_finite() && lo.is_finite())
            .map(|(i, (&la, &lo))| GridPoint {
                position: [lo as f64, la as f64],
                y: i / nx,
                x: i % nx,
            })
            .collect();
        debug!("Building grid index over {} points", points.len());
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Grid indices of every point inside `region`, in no particular order.
    pub fn hits(&self, region: &dyn Region) -> Vec<(usize, usize)> {
        let inside = |p: &&GridPoint| region.contains(&p.point());
        match region.envelope() {
            Some(env) => {
                let query = AABB::from_corners([env.min_lon, env.min_lat], [env.max_lon, env.max_lat]);
                self.tree
                    .locate_with_selection_function(WithinBox(query))
                    .filter(inside)
                    .map(GridPoint::index)
                    .collect()
            }
            None => self.tree.iter().filter(inside).map(GridPoint::index).collect(),
        }
    }

    /// Grid index of the point closest to (`lon`, `lat`) in degree space.
    pub fn nearest(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        self.tree.nearest_neighbor(&[lon, lat]).map(GridPoint::index)
    }
}

/// Identity of a coordinate grid: its shape plus a digest of the exact bits of every
/// latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridFingerprint {
    shape: (usize, usize),
    digest: u64,
}

impl GridFingerprint {
    pub fn of(lat: &GridArray, lon: &GridArray) -> Self {
        let ny = lat.shape().first().copied().unwrap_or(0);
        let nx = lat.shape().get(1).copied().unwrap_or(0);

        let mut hasher = DefaultHasher::new();
        for values in [lat.values(), lon.values()] {
            values.len().hash(&mut hasher);
            for value in values {
                value.to_bits().hash(&mut hasher);
            }
        }
        Self {
            shape: (ny, nx),
            digest: hasher.finish(),
        }
    }
}
