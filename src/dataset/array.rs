use crate::dataset::error::DatasetError;
use std::ops::Range;

/// A dense, row-major `f32` array with named dimensions.
///
/// Missing GRIB2 values (bitmap holes) are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridArray {
    dims: Vec<String>,
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl GridArray {
    pub fn new<S: Into<String>>(
        dims: Vec<S>,
        shape: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self, DatasetError> {
        if dims.len() != shape.len() {
            return Err(DatasetError::RankMismatch {
                dims: dims.len(),
                axes: shape.len(),
            });
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(DatasetError::ShapeMismatch {
                shape,
                expected,
                found: values.len(),
            });
        }
        Ok(Self {
            dims: dims.into_iter().map(Into::into).collect(),
            shape,
            values,
        })
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Position of the dimension called `dim`, if the array has it.
    pub fn axis(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn get(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, (&idx, &len)) in index.iter().zip(&self.shape).enumerate() {
            if idx >= len {
                return None;
            }
            flat = if i == 0 { idx } else { flat * len + idx };
        }
        self.values.get(flat).copied()
    }

    /// Keeps `range` along `axis`. The caller checks the bounds.
    pub(crate) fn slice_axis(&self, axis: usize, range: Range<usize>) -> GridArray {
        let len = self.shape[axis];
        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let width = range.end - range.start;

        let mut values = Vec::with_capacity(outer * width * inner);
        for o in 0..outer {
            let base = o * len * inner;
            values.extend_from_slice(
                &self.values[base + range.start * inner..base + range.end * inner],
            );
        }

        let mut shape = self.shape.clone();
        shape[axis] = width;
        GridArray {
            dims: self.dims.clone(),
            shape,
            values,
        }
    }

    /// Selects one entry of the leading axis, dropping that axis.
    pub fn layer(&self, index: usize) -> Option<GridArray> {
        let (&len, rest) = self.shape.split_first()?;
        if index >= len {
            return None;
        }
        let inner: usize = rest.iter().product();
        Some(GridArray {
            dims: self.dims[1..].to_vec(),
            shape: rest.to_vec(),
            values: self.values[index * inner..(index + 1) * inner].to_vec(),
        })
    }

    /// Renames the dimensions, keeping the data untouched.
    pub fn with_dims<S: Into<String>>(mut self, dims: Vec<S>) -> Result<Self, DatasetError> {
        if dims.len() != self.shape.len() {
            return Err(DatasetError::RankMismatch {
                dims: dims.len(),
                axes: self.shape.len(),
            });
        }
        self.dims = dims.into_iter().map(Into::into).collect();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> GridArray {
        // 2 layers of a 3 x 4 grid, value = layer * 100 + y * 10 + x
        let mut values = Vec::new();
        for l in 0..2 {
            for y in 0..3 {
                for x in 0..4 {
                    values.push((l * 100 + y * 10 + x) as f32);
                }
            }
        }
        GridArray::new(vec!["lv", "y", "x"], vec![2, 3, 4], values).unwrap()
    }

    #[test]
    fn test_new_validates_shape() {
        let err = GridArray::new(vec!["y", "x"], vec![2, 2], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, DatasetError::ShapeMismatch { expected: 4, found: 3, .. }));

        let err = GridArray::new(vec!["y"], vec![2, 2], vec![0.0; 4]).unwrap_err();
        assert!(matches!(err, DatasetError::RankMismatch { dims: 1, axes: 2 }));
    }

    #[test]
    fn test_get_uses_row_major_order() {
        let array = cube();
        assert_eq!(array.get(&[1, 2, 3]), Some(123.0));
        assert_eq!(array.get(&[0, 1, 0]), Some(10.0));
        assert_eq!(array.get(&[0, 3, 0]), None);
        assert_eq!(array.get(&[0, 0]), None);
    }

    #[test]
    fn test_slice_inner_axis() {
        let array = cube().slice_axis(2, 1..3);
        assert_eq!(array.shape(), &[2, 3, 2]);
        assert_eq!(array.get(&[0, 0, 0]), Some(1.0));
        assert_eq!(array.get(&[1, 2, 1]), Some(122.0));
    }

    #[test]
    fn test_slice_middle_axis_to_empty() {
        let array = cube().slice_axis(1, 2..2);
        assert_eq!(array.shape(), &[2, 0, 4]);
        assert!(array.is_empty());
    }

    #[test]
    fn test_layer_drops_leading_axis() {
        let layer = cube().layer(1).unwrap();
        assert_eq!(layer.dims(), &["y".to_string(), "x".to_string()]);
        assert_eq!(layer.shape(), &[3, 4]);
        assert_eq!(layer.get(&[2, 3]), Some(123.0));
        assert!(cube().layer(2).is_none());
    }
}
