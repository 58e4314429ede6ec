use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create temporary download file in '{0}'")]
    TempFile(PathBuf, #[source] std::io::Error),

    #[error("Download of {url} failed")]
    DownloadIo {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move downloaded file to '{0}'")]
    Persist(PathBuf, #[source] std::io::Error),

    #[error("Blocking file task failed")]
    TaskJoin(#[from] tokio::task::JoinError),
}
