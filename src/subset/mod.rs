//! Post-processing of opened datasets: variable projection and spatial subsetting.

pub mod error;
mod grid_index;
mod projector;
mod subsetter;
mod window;

pub use error::SubsetError;
pub use grid_index::{GridFingerprint, GridIndex, GridPoint};
pub use projector::VariableProjector;
pub use subsetter::{GridSubsetter, SubsetStrategy};
pub use window::GridWindow;
