//! Remote object retrieval: "fetch named object into local path".

pub mod error;
mod http;

pub use error::RetrievalError;
pub use http::HttpObjectStore;

use std::future::Future;
use std::path::Path;

/// Downloads objects from a remote store into the local filesystem.
///
/// Implementations do no naming of their own; the object name and the destination are
/// both decided by the caller.
pub trait ObjectRetriever: Send + Sync {
    /// Stores `object_name` at `destination_dir/file_name` and returns the number of
    /// bytes written. The destination must not be observable in a partial state.
    fn retrieve(
        &self,
        object_name: &str,
        destination_dir: &Path,
        file_name: &str,
    ) -> impl Future<Output = Result<u64, RetrievalError>> + Send;
}
