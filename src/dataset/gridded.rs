use crate::dataset::array::GridArray;
use crate::dataset::error::DatasetError;
use std::collections::BTreeMap;
use std::ops::Range;

/// An opened gridded forecast: named dimensions, coordinate arrays and data variables.
///
/// All arrays sharing a dimension name agree on its length; insertion rejects arrays
/// that would break this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    dims: BTreeMap<String, usize>,
    coords: BTreeMap<String, GridArray>,
    data_vars: BTreeMap<String, GridArray>,
    attrs: BTreeMap<String, String>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_coordinate(
        &mut self,
        name: impl Into<String>,
        array: GridArray,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        self.register_dims(&name, &array)?;
        self.coords.insert(name, array);
        Ok(())
    }

    pub fn insert_variable(
        &mut self,
        name: impl Into<String>,
        array: GridArray,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        self.register_dims(&name, &array)?;
        self.data_vars.insert(name, array);
        Ok(())
    }

    pub fn with_coordinate(
        mut self,
        name: impl Into<String>,
        array: GridArray,
    ) -> Result<Self, DatasetError> {
        self.insert_coordinate(name, array)?;
        Ok(self)
    }

    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        array: GridArray,
    ) -> Result<Self, DatasetError> {
        self.insert_variable(name, array)?;
        Ok(self)
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn dims(&self) -> &BTreeMap<String, usize> {
        &self.dims
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    pub fn variable(&self, name: &str) -> Result<&GridArray, DatasetError> {
        self.data_vars
            .get(name)
            .ok_or_else(|| DatasetError::VariableNotFound(name.to_string()))
    }

    pub fn coordinate(&self, name: &str) -> Result<&GridArray, DatasetError> {
        self.coords
            .get(name)
            .ok_or_else(|| DatasetError::CoordinateNotFound(name.to_string()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.data_vars.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &GridArray)> {
        self.data_vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.data_vars.keys().map(String::as_str)
    }

    pub fn coordinate_names(&self) -> impl Iterator<Item = &str> {
        self.coords.keys().map(String::as_str)
    }

    /// Keeps indices `start..end` of `dim` in every array that has that dimension.
    pub fn select_range(&self, dim: &str, start: usize, end: usize) -> Result<Dataset, DatasetError> {
        let len = self
            .dim_len(dim)
            .ok_or_else(|| DatasetError::DimensionNotFound(dim.to_string()))?;
        if start > end || end > len {
            return Err(DatasetError::InvalidRange {
                dim: dim.to_string(),
                start,
                end,
                len,
            });
        }

        let slice = |arrays: &BTreeMap<String, GridArray>| {
            arrays
                .iter()
                .map(|(name, array)| {
                    let sliced = match array.axis(dim) {
                        Some(axis) => array.slice_axis(axis, start..end),
                        None => array.clone(),
                    };
                    (name.clone(), sliced)
                })
                .collect::<BTreeMap<_, _>>()
        };

        let mut dims = self.dims.clone();
        dims.insert(dim.to_string(), end - start);
        Ok(Dataset {
            dims,
            coords: slice(&self.coords),
            data_vars: slice(&self.data_vars),
            attrs: self.attrs.clone(),
        })
    }

    /// [`Dataset::select_range`] over several dimensions at once.
    pub fn select_ranges(&self, ranges: &[(&str, Range<usize>)]) -> Result<Dataset, DatasetError> {
        let mut selected = self.clone();
        for (dim, range) in ranges {
            selected = selected.select_range(dim, range.start, range.end)?;
        }
        Ok(selected)
    }

    fn register_dims(&mut self, name: &str, array: &GridArray) -> Result<(), DatasetError> {
        for (dim, &found) in array.dims().iter().zip(array.shape()) {
            if let Some(&existing) = self.dims.get(dim) {
                if existing != found {
                    return Err(DatasetError::DimensionMismatch {
                        name: name.to_string(),
                        dim: dim.clone(),
                        existing,
                        found,
                    });
                }
            }
        }
        for (dim, &len) in array.dims().iter().zip(array.shape()) {
            self.dims.insert(dim.clone(), len);
        }
        Ok(())
    }
}
