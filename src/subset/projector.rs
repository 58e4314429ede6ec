use crate::dataset::{Dataset, DatasetError, GridArray, LAT_NAME, LON_NAME, X_DIM, Y_DIM};
use crate::product::{Product, VariableRemap};
use log::debug;

/// Narrows a dataset to a set of variables, splitting bundled multi-layer variables
/// according to a product's remap table.
#[derive(Debug, Clone, Copy)]
pub struct VariableProjector {
    remaps: &'static [VariableRemap],
}

impl VariableProjector {
    pub fn new(remaps: &'static [VariableRemap]) -> Self {
        Self { remaps }
    }

    pub fn for_product(product: &dyn Product) -> Self {
        Self::new(product.remaps())
    }

    /// Builds a dataset holding only `names` and the latitude/longitude grids, all on
    /// (`ygrid_0`, `xgrid_0`). Remapped names are replaced by their layer outputs.
    pub fn project(&self, dataset: &Dataset, names: &[String]) -> Result<Dataset, DatasetError> {
        let mut projected = Dataset::new();
        for (key, value) in dataset.attrs() {
            projected = projected.with_attr(key.as_str(), value.as_str());
        }

        for coord in [LAT_NAME, LON_NAME] {
            let array = spatial(coord, dataset.coordinate(coord)?.clone())?;
            projected.insert_coordinate(coord, array)?;
        }

        for name in names {
            let source = dataset.variable(name)?;
            match self.remaps.iter().find(|remap| remap.source == name.as_str()) {
                Some(remap) => {
                    for &(index, target) in remap.layers {
                        debug!("Projecting layer {} of '{}' as '{}'", index, name, target);
                        projected.insert_variable(target, select_layer(name, source, index)?)?;
                    }
                }
                None => projected.insert_variable(name.as_str(), spatial(name, source.clone())?)?,
            }
        }
        Ok(projected)
    }
}

fn spatial(name: &str, array: GridArray) -> Result<GridArray, DatasetError> {
    if array.ndim() != 2 {
        return Err(DatasetError::NotTwoDimensional {
            name: name.to_string(),
            dims: array.dims().to_vec(),
        });
    }
    array.with_dims(vec![Y_DIM, X_DIM])
}

fn select_layer(name: &str, source: &GridArray, index: usize) -> Result<GridArray, DatasetError> {
    match source.ndim() {
        // a single-level field stands in for its only layer
        2 if index == 0 => spatial(name, source.clone()),
        2 => Err(DatasetError::LayerOutOfBounds {
            name: name.to_string(),
            index,
            len: 1,
        }),
        3 => {
            let layer = source
                .layer(index)
                .ok_or_else(|| DatasetError::LayerOutOfBounds {
                    name: name.to_string(),
                    index,
                    len: source.shape()[0],
                })?;
            spatial(name, layer)
        }
        _ => Err(DatasetError::NotTwoDimensional {
            name: name.to_string(),
            dims: source.dims().to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Hrrr, Rrfs};

    const MXUPHL: &str = "MXUPHL_P8_2L103_GLC0_max1h";

    fn plane(offset: f32) -> GridArray {
        GridArray::new(vec![Y_DIM, X_DIM], vec![2, 3], (0..6).map(|i| offset + i as f32).collect())
            .unwrap()
    }

    fn sample() -> Dataset {
        let layers = GridArray::new(
            vec![format!("{MXUPHL}_levels"), Y_DIM.to_string(), X_DIM.to_string()],
            vec![3, 2, 3],
            (0..18).map(|i| (i / 6) as f32 * 100.0).collect(),
        )
        .unwrap();
        Dataset::new()
            .with_attr("source", "hrrr.t00z.wrfnatf01.grib2")
            .with_coordinate(LAT_NAME, plane(30.0))
            .unwrap()
            .with_coordinate(LON_NAME, plane(-100.0))
            .unwrap()
            .with_variable("TMP_P0_L103_GLC0", plane(280.0))
            .unwrap()
            .with_variable("RH_P0_L103_GLC0", plane(50.0))
            .unwrap()
            .with_variable("UGRD_P0_L103_GLC0", plane(5.0))
            .unwrap()
            .with_variable(MXUPHL, layers)
            .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_projection_keeps_exactly_requested_variables() {
        let ds = sample();
        let projected = VariableProjector::for_product(&Rrfs::default())
            .project(&ds, &names(&["TMP_P0_L103_GLC0", "RH_P0_L103_GLC0"]))
            .unwrap();

        let vars: Vec<&str> = projected.variable_names().collect();
        assert_eq!(vars, ["RH_P0_L103_GLC0", "TMP_P0_L103_GLC0"]);
        let coords: Vec<&str> = projected.coordinate_names().collect();
        assert_eq!(coords, [LAT_NAME, LON_NAME]);
        assert_eq!(
            projected.coordinate(LAT_NAME).unwrap().shape(),
            ds.coordinate(LAT_NAME).unwrap().shape()
        );
        assert_eq!(projected.attr("source"), Some("hrrr.t00z.wrfnatf01.grib2"));
    }

    #[test]
    fn test_remap_splits_layers() {
        let projected = VariableProjector::for_product(&Hrrr)
            .project(&sample(), &names(&[MXUPHL, "UGRD_P0_L103_GLC0"]))
            .unwrap();

        let vars: Vec<&str> = projected.variable_names().collect();
        assert_eq!(
            vars,
            [
                "MXUPHL03_P8_2L103_GLC0_max1h",
                "MXUPHL25_P8_2L103_GLC0_max1h",
                "UGRD_P0_L103_GLC0"
            ]
        );
        let layer = projected.variable("MXUPHL25_P8_2L103_GLC0_max1h").unwrap();
        assert_eq!(layer.shape(), &[2, 3]);
        assert!(layer.values().iter().all(|v| *v == 200.0));
        assert_eq!(
            projected.variable("UGRD_P0_L103_GLC0").unwrap().values()[0],
            5.0
        );
    }

    #[test]
    fn test_missing_variable_fails() {
        let err = VariableProjector::for_product(&Hrrr)
            .project(&sample(), &names(&["VIS_P0_L1_GLC0"]))
            .unwrap_err();
        assert!(matches!(err, DatasetError::VariableNotFound(name) if name == "VIS_P0_L1_GLC0"));
    }

    #[test]
    fn test_unmapped_multi_level_variable_is_rejected() {
        let err = VariableProjector::for_product(&Rrfs::default())
            .project(&sample(), &names(&[MXUPHL]))
            .unwrap_err();
        assert!(matches!(err, DatasetError::NotTwoDimensional { .. }));
    }

    #[test]
    fn test_layer_out_of_bounds() {
        const REMAPS: &[VariableRemap] = &[VariableRemap {
            source: "TMP_P0_L103_GLC0",
            layers: &[(1, "TMP2")],
        }];
        let err = VariableProjector::new(REMAPS)
            .project(&sample(), &names(&["TMP_P0_L103_GLC0"]))
            .unwrap_err();
        assert!(matches!(err, DatasetError::LayerOutOfBounds { index: 1, len: 1, .. }));
    }
}
