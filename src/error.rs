use crate::cache::error::CacheError;
use crate::dataset::DatasetError;
use crate::retrieval::RetrievalError;
use crate::subset::SubsetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to retrieve '{object_name}' as '{file_name}'")]
    Retrieval {
        object_name: String,
        file_name: String,
        #[source]
        source: RetrievalError,
    },

    #[error("Failed to open cached file '{file_name}'")]
    Open {
        file_name: String,
        #[source]
        source: DatasetError,
    },

    #[error("Failed to select variables from '{file_name}'")]
    Projection {
        file_name: String,
        #[source]
        source: DatasetError,
    },

    #[error("Failed to subset '{file_name}' to the requested region")]
    Subset {
        file_name: String,
        #[source]
        source: SubsetError,
    },

    #[error("{0} as forecast hours is not supported")]
    UnsupportedRequest(String),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Failed to set up object store client")]
    StoreSetup(#[source] RetrievalError),

    #[error("Failed to read config file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    ConfigParse(PathBuf, #[source] serde_json::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl FetchError {
    /// The artifact file name the failed request was working on, if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            FetchError::Retrieval { file_name, .. }
            | FetchError::Open { file_name, .. }
            | FetchError::Projection { file_name, .. }
            | FetchError::Subset { file_name, .. } => Some(file_name),
            _ => None,
        }
    }
}
