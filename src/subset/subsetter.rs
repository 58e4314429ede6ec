use crate::dataset::{Dataset, GridArray, LAT_NAME, LON_NAME};
use crate::region::{Point, Region};
use crate::subset::error::SubsetError;
use crate::subset::grid_index::{GridFingerprint, GridIndex};
use crate::subset::window::GridWindow;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// How grid points inside a region are found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsetStrategy {
    /// Test every grid point.
    Scan,
    /// Query an R-tree built once per distinct grid.
    #[default]
    Indexed,
}

/// Cuts datasets down to the index window covering a region.
///
/// Both strategies find the same hit set, so they produce identical windows.
#[derive(Debug, Default)]
pub struct GridSubsetter {
    strategy: SubsetStrategy,
    indexes: Mutex<HashMap<GridFingerprint, Arc<GridIndex>>>,
}

impl GridSubsetter {
    pub fn new(strategy: SubsetStrategy) -> Self {
        Self {
            strategy,
            indexes: Mutex::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> SubsetStrategy {
        self.strategy
    }

    /// Number of grid indexes built so far.
    pub fn cached_indexes(&self) -> usize {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn window(&self, dataset: &Dataset, region: &dyn Region) -> Result<GridWindow, SubsetError> {
        let (lat, lon) = coordinate_grids(dataset)?;
        match self.strategy {
            SubsetStrategy::Scan => GridWindow::from_hits(scan(lat, lon, region)),
            SubsetStrategy::Indexed => GridWindow::from_hits(self.index_for(lat, lon).hits(region)),
        }
    }

    /// Slices `dataset` to the window of grid points inside `region`.
    pub fn subset(&self, dataset: &Dataset, region: &dyn Region) -> Result<Dataset, SubsetError> {
        let window = self.window(dataset, region)?;
        debug!(
            "Subsetting to y {:?}, x {:?} using {:?}",
            window.y_range(),
            window.x_range(),
            self.strategy
        );
        window.apply(dataset)
    }

    fn index_for(&self, lat: &GridArray, lon: &GridArray) -> Arc<GridIndex> {
        let fingerprint = GridFingerprint::of(lat, lon);
        let mut indexes = self.indexes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = indexes.get(&fingerprint) {
            debug!("Grid index cache hit");
            return Arc::clone(index);
        }
        let index = Arc::new(GridIndex::build(lat, lon));
        indexes.insert(fingerprint, Arc::clone(&index));
        index
    }
}

fn coordinate_grids(dataset: &Dataset) -> Result<(&GridArray, &GridArray), SubsetError> {
    let lat = dataset.coordinate(LAT_NAME)?;
    let lon = dataset.coordinate(LON_NAME)?;
    if lat.ndim() != 2 || lat.shape() != lon.shape() {
        return Err(SubsetError::CoordinateShape {
            lat: lat.shape().to_vec(),
            lon: lon.shape().to_vec(),
        });
    }
    Ok((lat, lon))
}

fn scan<'a>(
    lat: &'a GridArray,
    lon: &'a GridArray,
    region: &'a dyn Region,
) -> impl Iterator<Item = (usize, usize)> + 'a {
    let nx = lat.shape()[1].max(1);
    lat.values()
        .iter()
        .zip(lon.values())
        .enumerate()
        .filter(move |(_, (la, lo))| region.contains(&Point::new(**lo as f64, **la as f64)))
        .map(move |(i, _)| (i / nx, i % nx))
}
