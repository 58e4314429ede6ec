use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset file '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("Malformed GRIB2 file '{path}': {message}")]
    Malformed { path: PathBuf, message: String },

    // grib errors are flattened to text so the error stays Send + Sync
    #[error("Failed to decode GRIB2 field {index} of '{path}': {message}")]
    Decode {
        path: PathBuf,
        index: usize,
        message: String,
    },

    #[error("Unsupported grid definition template 3.{0}")]
    UnsupportedGrid(u16),

    #[error("Unsupported scanning mode {0:#04x}")]
    UnsupportedScanning(u8),

    #[error("Variable '{0}' not found in dataset")]
    VariableNotFound(String),

    #[error("Coordinate '{0}' not found in dataset")]
    CoordinateNotFound(String),

    #[error("Dimension '{0}' not found in dataset")]
    DimensionNotFound(String),

    #[error("Array got {dims} dimension names for {axes} axes")]
    RankMismatch { dims: usize, axes: usize },

    #[error("Array of shape {shape:?} needs {expected} values, got {found}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("Dimension '{dim}' has length {existing} in the dataset but {found} in '{name}'")]
    DimensionMismatch {
        name: String,
        dim: String,
        existing: usize,
        found: usize,
    },

    #[error("Range {start}..{end} is out of bounds for dimension '{dim}' of length {len}")]
    InvalidRange {
        dim: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Layer {index} is out of bounds for '{name}' with {len} layer(s)")]
    LayerOutOfBounds {
        name: String,
        index: usize,
        len: usize,
    },

    #[error("Variable '{name}' has dimensions {dims:?}, expected two spatial dimensions")]
    NotTwoDimensional { name: String, dims: Vec<String> },

    #[error("Failed to build table from dataset")]
    Frame(#[from] PolarsError),
}
