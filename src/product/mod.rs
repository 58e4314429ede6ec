//! Naming policies for forecast products. Each product knows how its output files are
//! called locally and where they live in the remote object store, and which variables
//! need to be split when projected.

mod hrrr;
mod rrfs;

pub use hrrr::Hrrr;
pub use rrfs::{Rrfs, RrfsOutput};

use chrono::{DateTime, Timelike, Utc};
use std::fmt::Debug;

/// A raw variable whose leading axis bundles several logical fields. Each `(index,
/// name)` pair selects one layer and stores it under `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableRemap {
    pub source: &'static str,
    pub layers: &'static [(usize, &'static str)],
}

/// Local and remote naming rules of one forecast product.
///
/// The two names are deliberately independent: the remote layout embeds the run date and
/// a product-specific directory tree, while the local cache keys by date and hour itself.
pub trait Product: Debug + Send + Sync {
    /// Short identifier, e.g. `hrrr`.
    fn id(&self) -> &'static str;

    /// File name of the output for `lead_hour` of the run started at `init_time`.
    fn local_name(&self, init_time: DateTime<Utc>, lead_hour: u32) -> String;

    /// Object name of the same output in the remote store.
    fn remote_name(&self, init_time: DateTime<Utc>, lead_hour: u32) -> String;

    /// Default cache directory name under the cache root.
    fn cache_name(&self) -> &'static str;

    /// Default object-store bucket.
    fn bucket(&self) -> &'static str;

    fn remaps(&self) -> &'static [VariableRemap] {
        &[]
    }

    fn remap_for(&self, variable: &str) -> Option<&'static VariableRemap> {
        self.remaps().iter().find(|remap| remap.source == variable)
    }
}

pub(crate) fn init_hour(init_time: DateTime<Utc>) -> u32 {
    init_time.hour()
}

pub(crate) fn run_date(init_time: DateTime<Utc>) -> String {
    init_time.format("%Y%m%d").to_string()
}
