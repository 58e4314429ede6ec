use crate::error::FetchError;
use std::path::PathBuf;

const CACHE_DIR_NAME: &str = "nwp_fetch_cache";

/// `<system cache dir>/nwp_fetch_cache`, e.g. `~/.cache/nwp_fetch_cache` on Linux.
pub fn default_cache_root() -> Result<PathBuf, FetchError> {
    dirs::cache_dir()
        .map(|p| p.join(CACHE_DIR_NAME))
        .ok_or(FetchError::CacheDirResolution)
}
