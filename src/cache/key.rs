use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies one cached artifact: the run date, the initialization hour and the
/// product-specific file name.
///
/// A key is never stored; it is rebuilt from the request on every fetch. The mapping
/// from key to local path is pure, see [`CacheKey::relative_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub date: NaiveDate,
    pub init_hour: u32,
    pub file_name: String,
}

impl CacheKey {
    pub fn new(date: NaiveDate, init_hour: u32, file_name: impl Into<String>) -> Self {
        Self {
            date,
            init_hour,
            file_name: file_name.into(),
        }
    }

    /// Builds the key for a model run starting at `init_time`.
    pub fn for_run(init_time: DateTime<Utc>, file_name: impl Into<String>) -> Self {
        Self::new(init_time.date_naive(), init_time.hour(), file_name)
    }

    /// `YYYY-MM-DD`, the name of the date directory.
    pub fn date_segment(&self) -> String {
        date_segment(self.date)
    }

    /// Two-digit hour, the name of the hour directory.
    pub fn hour_segment(&self) -> String {
        hour_segment(self.init_hour)
    }

    /// Directory of this key relative to the cache root.
    pub fn relative_dir(&self) -> PathBuf {
        Path::new(&self.date_segment()).join(self.hour_segment())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.date_segment(),
            self.hour_segment(),
            self.file_name
        )
    }
}

pub(crate) fn date_segment(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn hour_segment(hour: u32) -> String {
    format!("{:02}", hour)
}
