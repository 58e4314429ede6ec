//! The main entry point: fetch forecast files through the local cache and post-process
//! them into datasets.

use crate::cache::key::CacheKey;
use crate::cache::store::CacheStore;
use crate::config::FetchConfig;
use crate::dataset::grib2::Grib2Reader;
use crate::dataset::{Dataset, DatasetReader};
use crate::error::FetchError;
use crate::forecast::{Forecasts, LeadHours};
use crate::product::Product;
use crate::region::Region;
use crate::retrieval::{HttpObjectStore, ObjectRetriever};
use crate::subset::{GridSubsetter, VariableProjector};
use bon::bon;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::mem;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;
use tokio::task;

/// One async lock per cache key with a download in progress.
type InflightLocks = std::sync::Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>;

/// Fetches model output files by initialization time and lead hour.
///
/// Files are looked up in the local cache first and downloaded from the product's bucket
/// on a miss. The cached file is then opened, optionally narrowed to a set of variables
/// and optionally cut down to a region.
///
/// Concurrent requests for the same file within one process share a single download.
///
/// # Examples
///
/// ```rust
/// # use nwp_fetch::{ForecastFetcher, FetchError, Hrrr, Polygon};
/// # use chrono::{TimeZone, Utc};
/// # use std::sync::Arc;
/// # async fn run() -> Result<(), FetchError> {
/// let fetcher = ForecastFetcher::new(Hrrr).await?;
/// let init = Utc.with_ymd_and_hms(2024, 5, 7, 0, 0, 0).unwrap();
///
/// let oklahoma = Polygon::from_bounds(-103.0, 33.6, -94.4, 37.0).unwrap();
/// let dataset = fetcher
///     .fetch_one()
///     .init_time(init)
///     .lead_hour(1)
///     .variables(vec!["MXUPHL_P8_2L103_GLC0_max1h".to_string()])
///     .region(Arc::new(oklahoma))
///     .call()
///     .await?;
/// println!("{:?}", dataset.dims());
/// # Ok(())
/// # }
/// ```
pub struct ForecastFetcher<S = HttpObjectStore, R = Grib2Reader> {
    product: Arc<dyn Product>,
    config: FetchConfig,
    cache: CacheStore,
    store: S,
    reader: Arc<R>,
    projector: VariableProjector,
    subsetter: Arc<GridSubsetter>,
    inflight: InflightLocks,
}

impl ForecastFetcher {
    /// Creates a fetcher for `product` with the default configuration, caching under the
    /// system cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::CacheDirResolution`] if the system cache directory cannot be
    /// determined, and [`FetchError::Cache`] if the cache skeleton cannot be created.
    pub async fn new(product: impl Product + 'static) -> Result<Self, FetchError> {
        let config = FetchConfig::for_product(&product)?;
        Self::with_config(product, config).await
    }

    /// Creates a fetcher downloading over HTTPS as described by `config`.
    pub async fn with_config(
        product: impl Product + 'static,
        config: FetchConfig,
    ) -> Result<Self, FetchError> {
        let store = HttpObjectStore::new(config.endpoint_url(), config.timeout, config.connect_timeout)
            .map_err(FetchError::StoreSetup)?;
        Self::with_parts(Arc::new(product), config, store, Grib2Reader::new()).await
    }
}

impl<S, R> ForecastFetcher<S, R>
where
    S: ObjectRetriever,
    R: DatasetReader + 'static,
{
    /// Creates a fetcher from explicit collaborators.
    pub async fn with_parts(
        product: Arc<dyn Product>,
        config: FetchConfig,
        store: S,
        reader: R,
    ) -> Result<Self, FetchError> {
        let cache = CacheStore::open(
            &config.cache_root,
            &config.cache_name,
            config.seed_dates.clone(),
        )
        .await?;
        Ok(Self {
            projector: VariableProjector::for_product(product.as_ref()),
            subsetter: Arc::new(GridSubsetter::new(config.subset_strategy)),
            product,
            config,
            cache,
            store,
            reader: Arc::new(reader),
            inflight: InflightLocks::default(),
        })
    }

    pub fn product(&self) -> &dyn Product {
        self.product.as_ref()
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn subsetter(&self) -> &GridSubsetter {
        &self.subsetter
    }

    /// Cache key of the output for `lead_hour` of the run started at `init_time`.
    pub fn key_for(&self, init_time: DateTime<Utc>, lead_hour: u32) -> CacheKey {
        CacheKey::for_run(init_time, self.product.local_name(init_time, lead_hour))
    }

    /// Makes sure the file for (`init_time`, `lead_hour`) is cached, without opening it,
    /// and returns its local path.
    pub async fn download(
        &self,
        init_time: DateTime<Utc>,
        lead_hour: u32,
    ) -> Result<PathBuf, FetchError> {
        let key = self.key_for(init_time, lead_hour);
        self.ensure_cached(&key, init_time, lead_hour).await?;
        Ok(self.cache.artifact_path(&key))
    }

    async fn ensure_cached(
        &self,
        key: &CacheKey,
        init_time: DateTime<Utc>,
        lead_hour: u32,
    ) -> Result<(), FetchError> {
        self.cache.ensure_branch(key.date, key.init_hour).await?;
        if self.cache.contains_key(key).await? {
            info!("Cache hit for {}", key);
            return Ok(());
        }

        let registration = InflightGuard::register(&self.inflight, key);
        let _key_guard = registration.lock.lock().await;
        self.populate(key, init_time, lead_hour).await
    }

    async fn populate(
        &self,
        key: &CacheKey,
        init_time: DateTime<Utc>,
        lead_hour: u32,
    ) -> Result<(), FetchError> {
        if self.cache.contains_key(key).await? {
            info!("Cache hit for {} after concurrent download", key);
            return Ok(());
        }

        warn!("Cache miss for {}. Downloading.", key);
        let object_name = self.product.remote_name(init_time, lead_hour);
        let destination = self.cache.resolve_path(key.date, key.init_hour);
        self.store
            .retrieve(&object_name, &destination, &key.file_name)
            .await
            .map_err(|source| FetchError::Retrieval {
                object_name,
                file_name: key.file_name.clone(),
                source,
            })?;
        info!("Cached {}", key);
        Ok(())
    }

    async fn fetch_hour(
        &self,
        init_time: DateTime<Utc>,
        lead_hour: u32,
        region: Option<&Arc<dyn Region>>,
        variables: Option<&[String]>,
    ) -> Result<Dataset, FetchError> {
        let key = self.key_for(init_time, lead_hour);
        self.ensure_cached(&key, init_time, lead_hour).await?;

        let cache = self.cache.clone();
        let reader = Arc::clone(&self.reader);
        let projector = self.projector;
        let subsetter = Arc::clone(&self.subsetter);
        let region = region.cloned();
        let variables = variables.map(<[String]>::to_vec);

        task::spawn_blocking(move || {
            let file_name = key.file_name.clone();
            let dataset = cache
                .open_artifact(&key, reader.as_ref(), variables.as_deref())
                .map_err(|source| FetchError::Open {
                    file_name: file_name.clone(),
                    source,
                })?;

            let dataset = match &variables {
                Some(names) => {
                    projector
                        .project(&dataset, names)
                        .map_err(|source| FetchError::Projection {
                            file_name: file_name.clone(),
                            source,
                        })?
                }
                None => dataset,
            };

            match &region {
                Some(region) => subsetter
                    .subset(&dataset, region.as_ref())
                    .map_err(|source| FetchError::Subset { file_name, source }),
                None => Ok(dataset),
            }
        })
        .await?
    }
}

#[bon]
impl<S, R> ForecastFetcher<S, R>
where
    S: ObjectRetriever,
    R: DatasetReader + 'static,
{
    /// Fetches one lead hour of the run started at `init_time`.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.init_time(DateTime<Utc>)`: **Required.** Start of the model run.
    /// * `.lead_hour(u32)`: **Required.** Forecast hour.
    /// * `.region(Arc<dyn Region>)`: Optional. Cuts the dataset down to the grid window
    ///   covering this region.
    /// * `.variables(Vec<String>)`: Optional. Keeps only these variables (plus the
    ///   latitude/longitude grids), applying the product's remaps.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Retrieval`] if the download fails, [`FetchError::Open`] if the
    /// cached file cannot be read, [`FetchError::Projection`] for unknown variables and
    /// [`FetchError::Subset`] when no grid point lies inside `region`.
    #[builder]
    pub async fn fetch_one(
        &self,
        init_time: DateTime<Utc>,
        lead_hour: u32,
        region: Option<Arc<dyn Region>>,
        variables: Option<Vec<String>>,
    ) -> Result<Dataset, FetchError> {
        self.fetch_hour(init_time, lead_hour, region.as_ref(), variables.as_deref())
            .await
    }

    /// Fetches one or several lead hours of the same run.
    ///
    /// A single lead hour behaves exactly like [`ForecastFetcher::fetch_one`]. A sequence
    /// is fetched in order, and the first failure aborts the whole request.
    ///
    /// ```rust
    /// # use nwp_fetch::{ForecastFetcher, FetchError, Forecasts, Rrfs};
    /// # use chrono::{TimeZone, Utc};
    /// # async fn run() -> Result<(), FetchError> {
    /// let fetcher = ForecastFetcher::new(Rrfs::default()).await?;
    /// let init = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    ///
    /// let forecasts = fetcher
    ///     .fetch_many()
    ///     .init_time(init)
    ///     .lead_hours(vec![1u32, 2, 3])
    ///     .call()
    ///     .await?;
    /// assert_eq!(forecasts.len(), 3);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn fetch_many(
        &self,
        init_time: DateTime<Utc>,
        #[builder(into)] lead_hours: LeadHours,
        region: Option<Arc<dyn Region>>,
        variables: Option<Vec<String>>,
    ) -> Result<Forecasts, FetchError> {
        let region = region.as_ref();
        let variables = variables.as_deref();
        match lead_hours {
            LeadHours::Single(hour) => Ok(Forecasts::Single(
                self.fetch_hour(init_time, hour, region, variables).await?,
            )),
            LeadHours::Many(hours) => {
                let mut datasets = Vec::with_capacity(hours.len());
                for hour in hours {
                    datasets.push(self.fetch_hour(init_time, hour, region, variables).await?);
                }
                Ok(Forecasts::Many(datasets))
            }
        }
    }
}

/// A caller's claim on the per-key lock for one cache key. Dropping it (also when the
/// download future is cancelled) removes the entry once no other caller holds it.
struct InflightGuard<'a> {
    inflight: &'a InflightLocks,
    key: CacheKey,
    lock: Arc<Mutex<()>>,
}

impl<'a> InflightGuard<'a> {
    fn register(inflight: &'a InflightLocks, key: &CacheKey) -> Self {
        let lock = Arc::clone(
            inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key.clone())
                .or_default(),
        );
        Self {
            inflight,
            key: key.clone(),
            lock,
        }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // Release our handle under the map lock so concurrent drops count correctly.
        drop(mem::take(&mut self.lock));
        if inflight
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            inflight.remove(&self.key);
        }
    }
}
