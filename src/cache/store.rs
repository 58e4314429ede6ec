use crate::cache::error::CacheError;
use crate::cache::key::{date_segment, hour_segment, CacheKey};
use crate::dataset::{Dataset, DatasetError, DatasetReader};
use chrono::NaiveDate;
use log::{debug, info};
use std::ffi::OsStr;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::fs;

const INIT_HOURS: Range<u32> = 0..24;

/// Local on-disk cache of model output files, laid out as
/// `<cache_root>/<cache_name>/<YYYY-MM-DD>/<HH>/<file_name>`.
///
/// The presence of a file at its resolved path is the only cache-hit signal. Nothing
/// is ever evicted or refreshed.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    seed_dates: Vec<NaiveDate>,
}

impl CacheStore {
    /// Opens the cache named `cache_name` under `cache_root`, creating its skeleton if
    /// the directory does not exist yet.
    ///
    /// `seed_dates` are pre-created with all 24 hour directories when the skeleton is
    /// first built. Any other date is created on demand by [`CacheStore::ensure_branch`].
    pub async fn open(
        cache_root: &Path,
        cache_name: &str,
        mut seed_dates: Vec<NaiveDate>,
    ) -> Result<Self, CacheError> {
        seed_dates.sort_unstable();
        seed_dates.dedup();
        let store = Self {
            root: cache_root.join(cache_name),
            seed_dates,
        };
        store.ensure_ready().await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the cache root and the seeded `(date, hour)` skeleton. A no-op when the
    /// root directory already exists. Nothing is rolled back if creation fails midway.
    pub async fn ensure_ready(&self) -> Result<(), CacheError> {
        match fs::metadata(&self.root).await {
            Ok(metadata) if metadata.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(CacheError::Initialization {
                    path: self.root.clone(),
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "cache path exists but is not a directory",
                    ),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::Initialization {
                    path: self.root.clone(),
                    source: e,
                })
            }
        }

        info!("Creating cache skeleton at {}", self.root.display());
        if let Some(parent) = self.root.parent() {
            create_skeleton_dir(parent, true).await?;
        }
        create_skeleton_dir(&self.root, false).await?;
        for date in &self.seed_dates {
            let date_dir = self.root.join(date_segment(*date));
            create_skeleton_dir(&date_dir, false).await?;
            for hour in INIT_HOURS {
                create_skeleton_dir(&date_dir.join(hour_segment(hour)), false).await?;
            }
        }
        info!(
            "Cache skeleton created with {} seeded date(s)",
            self.seed_dates.len()
        );
        Ok(())
    }

    /// Directory holding the artifacts of one model run. Does not touch the filesystem.
    pub fn resolve_path(&self, date: NaiveDate, hour: u32) -> PathBuf {
        self.root.join(date_segment(date)).join(hour_segment(hour))
    }

    pub fn artifact_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_dir()).join(&key.file_name)
    }

    /// Creates the `(date, hour)` directory if it is missing.
    pub async fn ensure_branch(&self, date: NaiveDate, hour: u32) -> Result<PathBuf, CacheError> {
        let dir = self.resolve_path(date, hour);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::BranchCreation(dir.clone(), e))?;
        Ok(dir)
    }

    /// Checks whether `file_name` is an entry of the `(date, hour)` directory.
    ///
    /// A missing directory is an error ([`CacheError::PathNotFound`]), not a miss.
    pub async fn contains(
        &self,
        date: NaiveDate,
        hour: u32,
        file_name: &str,
    ) -> Result<bool, CacheError> {
        let dir = self.resolve_path(date, hour);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::PathNotFound {
                    path: dir,
                    source: e,
                })
            }
            Err(e) => return Err(CacheError::Listing(dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::Listing(dir.clone(), e))?
        {
            if entry.file_name().as_os_str() == OsStr::new(file_name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn contains_key(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.contains(key.date, key.init_hour, &key.file_name).await
    }

    /// Opens a cached artifact with `reader`. Blocking; reader errors pass through as-is.
    pub fn open_artifact<R: DatasetReader + ?Sized>(
        &self,
        key: &CacheKey,
        reader: &R,
        variables: Option<&[String]>,
    ) -> Result<Dataset, DatasetError> {
        let path = self.artifact_path(key);
        debug!("Opening cached artifact {}", path.display());
        match variables {
            Some(names) => reader.open_filtered(&path, names),
            None => reader.open(&path),
        }
    }
}

async fn create_skeleton_dir(path: &Path, recursive: bool) -> Result<(), CacheError> {
    let result = if recursive {
        fs::create_dir_all(path).await
    } else {
        fs::create_dir(path).await
    };
    result.map_err(|e| CacheError::Initialization {
        path: path.to_path_buf(),
        source: e,
    })
}
