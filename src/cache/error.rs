use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache skeleton at '{path}'")]
    Initialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache directory '{path}' does not exist")]
    PathNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create cache directory '{0}'")]
    BranchCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to list cache directory '{0}'")]
    Listing(PathBuf, #[source] std::io::Error),
}
