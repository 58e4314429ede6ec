use crate::dataset::error::DatasetError;
use crate::dataset::gridded::Dataset;
use std::path::Path;

/// Opens a cached model output file as a [`Dataset`].
///
/// Implementations are blocking and get called from `spawn_blocking`.
pub trait DatasetReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Dataset, DatasetError>;

    /// Opens the file but only needs to materialize `variables`. Readers that cannot
    /// skip fields fall back to [`DatasetReader::open`].
    fn open_filtered(&self, path: &Path, variables: &[String]) -> Result<Dataset, DatasetError> {
        let _ = variables;
        self.open(path)
    }
}
