use crate::dataset::DatasetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubsetError {
    #[error("No grid point falls inside the requested region")]
    EmptyRegion,

    #[error("Latitude grid has shape {lat:?} and longitude grid {lon:?}, expected matching 2-D grids")]
    CoordinateShape { lat: Vec<usize>, lon: Vec<usize> },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
