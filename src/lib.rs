mod cache;
mod config;
mod dataset;
mod error;
mod fetcher;
mod forecast;
mod product;
mod region;
mod retrieval;
mod subset;
mod utils;

pub use config::FetchConfig;
pub use error::FetchError;
pub use fetcher::ForecastFetcher;
pub use forecast::{Forecasts, LeadHours};

pub use cache::error::CacheError;
pub use cache::key::CacheKey;
pub use cache::store::CacheStore;

pub use dataset::grib2::inventory::{
    FieldRecord, FixedSurface, GridInfo, InventoryError, ProductInfo, Statistic,
};
pub use dataset::grib2::lambert::LambertConformal;
pub use dataset::grib2::{FieldEntry, Grib2Reader};
pub use dataset::{Dataset, DatasetError, DatasetReader, GridArray, LAT_NAME, LON_NAME, X_DIM, Y_DIM};

pub use product::{Hrrr, Product, Rrfs, RrfsOutput, VariableRemap};
pub use region::{Envelope, Point, Polygon, Region, RegionError};
pub use retrieval::{HttpObjectStore, ObjectRetriever, RetrievalError};
pub use subset::{
    GridFingerprint, GridIndex, GridPoint, GridSubsetter, GridWindow, SubsetError,
    SubsetStrategy, VariableProjector,
};
pub use utils::default_cache_root;
