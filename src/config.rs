//! Explicit fetcher configuration, replacing process-wide cache and bucket constants.

use crate::error::FetchError;
use crate::product::Product;
use crate::retrieval::HttpObjectStore;
use crate::subset::SubsetStrategy;
use crate::utils::default_cache_root;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Directory holding all caches.
    pub cache_root: PathBuf,
    /// Cache directory under `cache_root`.
    pub cache_name: String,
    pub bucket: String,
    /// Base URL of the object store. Defaults to the public S3 endpoint of `bucket`.
    pub endpoint: Option<String>,
    /// Whole-request timeout for one download.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Dates whose 24 hour directories are created with the cache skeleton.
    pub seed_dates: Vec<NaiveDate>,
    pub subset_strategy: SubsetStrategy,
}

impl FetchConfig {
    /// Defaults for `product`, cached under the system cache directory.
    pub fn for_product(product: &dyn Product) -> Result<Self, FetchError> {
        Ok(Self::with_cache_root(product, default_cache_root()?))
    }

    pub fn with_cache_root(product: &dyn Product, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            cache_name: product.cache_name().to_string(),
            bucket: product.bucket().to_string(),
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            seed_dates: Vec::new(),
            subset_strategy: SubsetStrategy::default(),
        }
    }

    /// Reads a JSON config file. Missing keys fall back to the defaults of `product`.
    ///
    /// ```json
    /// { "cache_root": "/data/nwp", "timeout_secs": 600, "subset_strategy": "scan" }
    /// ```
    pub async fn from_json_file(path: &Path, product: &dyn Product) -> Result<Self, FetchError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchError::ConfigRead(path.to_path_buf(), e))?;
        let file: ConfigFile = serde_json::from_str(&text)
            .map_err(|e| FetchError::ConfigParse(path.to_path_buf(), e))?;

        let cache_root = match file.cache_root {
            Some(root) => root,
            None => default_cache_root()?,
        };
        let defaults = Self::with_cache_root(product, cache_root);
        Ok(Self {
            cache_name: file.cache_name.unwrap_or(defaults.cache_name),
            bucket: file.bucket.unwrap_or(defaults.bucket),
            endpoint: file.endpoint.or(defaults.endpoint),
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_timeout: file
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            seed_dates: file.seed_dates.unwrap_or(defaults.seed_dates),
            subset_strategy: file.subset_strategy.unwrap_or(defaults.subset_strategy),
            cache_root: defaults.cache_root,
        })
    }

    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| HttpObjectStore::bucket_endpoint(&self.bucket))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root.join(&self.cache_name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    cache_root: Option<PathBuf>,
    cache_name: Option<String>,
    bucket: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    seed_dates: Option<Vec<NaiveDate>>,
    subset_strategy: Option<SubsetStrategy>,
}
