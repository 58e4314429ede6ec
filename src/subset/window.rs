use crate::dataset::{Dataset, X_DIM, Y_DIM};
use crate::subset::error::SubsetError;
use std::ops::Range;

/// Rectangular index range over (`ygrid_0`, `xgrid_0`).
///
/// Built from the minimum and maximum hit indices on each axis. The maximum is used as an
/// exclusive end, so the last hit row and column fall outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub y_min: usize,
    pub y_max: usize,
    pub x_min: usize,
    pub x_max: usize,
}

impl GridWindow {
    pub fn from_hits<I>(hits: I) -> Result<Self, SubsetError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        hits.into_iter()
            .fold(None, |window: Option<GridWindow>, (y, x)| {
                Some(match window {
                    None => GridWindow {
                        y_min: y,
                        y_max: y,
                        x_min: x,
                        x_max: x,
                    },
                    Some(w) => GridWindow {
                        y_min: w.y_min.min(y),
                        y_max: w.y_max.max(y),
                        x_min: w.x_min.min(x),
                        x_max: w.x_max.max(x),
                    },
                })
            })
            .ok_or(SubsetError::EmptyRegion)
    }

    pub fn y_range(&self) -> Range<usize> {
        self.y_min..self.y_max
    }

    pub fn x_range(&self) -> Range<usize> {
        self.x_min..self.x_max
    }

    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset, SubsetError> {
        Ok(dataset.select_ranges(&[(Y_DIM, self.y_range()), (X_DIM, self.x_range())])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_over_unordered_hits() {
        let window = GridWindow::from_hits([(4, 6), (2, 3), (5, 7), (3, 4)]).unwrap();
        assert_eq!(
            window,
            GridWindow {
                y_min: 2,
                y_max: 5,
                x_min: 3,
                x_max: 7
            }
        );
        assert_eq!(window.y_range(), 2..5);
        assert_eq!(window.x_range(), 3..7);
    }

    #[test]
    fn test_no_hits_is_empty_region() {
        let hits: Vec<(usize, usize)> = Vec::new();
        assert!(matches!(
            GridWindow::from_hits(hits),
            Err(SubsetError::EmptyRegion)
        ));
    }
}
