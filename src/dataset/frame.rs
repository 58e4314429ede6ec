//! Tidy tabular export of a gridded dataset: one row per grid point.

use crate::dataset::error::DatasetError;
use crate::dataset::gridded::Dataset;
use crate::dataset::{LAT_NAME, LON_NAME, X_DIM, Y_DIM};
use log::debug;
use polars::prelude::*;

impl Dataset {
    /// Flattens the dataset into a `DataFrame` with the columns `ygrid_0`, `xgrid_0`,
    /// `gridlat_0`, `gridlon_0` and one column per two-dimensional variable.
    ///
    /// Variables with a leading level axis are skipped; project them to single layers
    /// first.
    pub fn to_frame(&self) -> Result<DataFrame, DatasetError> {
        let lat = self.coordinate(LAT_NAME)?;
        let lon = self.coordinate(LON_NAME)?;
        let ny = self
            .dim_len(Y_DIM)
            .ok_or_else(|| DatasetError::DimensionNotFound(Y_DIM.to_string()))?;
        let nx = self
            .dim_len(X_DIM)
            .ok_or_else(|| DatasetError::DimensionNotFound(X_DIM.to_string()))?;
        let points = ny * nx;

        let ys: Vec<u32> = (0..points).map(|i| (i / nx.max(1)) as u32).collect();
        let xs: Vec<u32> = (0..points).map(|i| (i % nx.max(1)) as u32).collect();

        let mut columns = vec![
            Column::new(Y_DIM.into(), ys),
            Column::new(X_DIM.into(), xs),
            Column::new(LAT_NAME.into(), lat.values()),
            Column::new(LON_NAME.into(), lon.values()),
        ];
        for (name, array) in self.variables() {
            if array.dims() != [Y_DIM, X_DIM] {
                debug!(
                    "Skipping '{}' with dimensions {:?} in tabular export",
                    name,
                    array.dims()
                );
                continue;
            }
            columns.push(Column::new(name.into(), array.values()));
        }

        Ok(DataFrame::new(columns)?)
    }

    pub fn to_lazy_frame(&self) -> Result<LazyFrame, DatasetError> {
        Ok(self.to_frame()?.lazy())
    }
}
