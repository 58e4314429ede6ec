//! In-memory gridded datasets and the readers that produce them from cached files.

mod array;
mod error;
mod frame;
pub mod grib2;
mod gridded;
mod reader;

pub use array::GridArray;
pub use error::DatasetError;
pub use gridded::Dataset;
pub use reader::DatasetReader;

/// 2-D latitude grid on (`ygrid_0`, `xgrid_0`).
pub const LAT_NAME: &str = "gridlat_0";
/// 2-D longitude grid on (`ygrid_0`, `xgrid_0`).
pub const LON_NAME: &str = "gridlon_0";
pub const Y_DIM: &str = "ygrid_0";
pub const X_DIM: &str = "xgrid_0";
