use crate::product::{init_hour, run_date, Product};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Which RRFS vertical output the file holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RrfsOutput {
    /// Native model levels.
    #[default]
    Nat,
    /// Pressure levels.
    Prs,
}

impl RrfsOutput {
    fn token(self) -> &'static str {
        match self {
            RrfsOutput::Nat => "nat",
            RrfsOutput::Prs => "prs",
        }
    }
}

/// Rapid Refresh Forecast System (RRFS-A control member), CONUS 3 km.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rrfs {
    output: RrfsOutput,
}

impl Rrfs {
    pub fn new(output: RrfsOutput) -> Self {
        Self { output }
    }

    pub fn output(&self) -> RrfsOutput {
        self.output
    }
}

impl Product for Rrfs {
    fn id(&self) -> &'static str {
        "rrfs"
    }

    fn local_name(&self, init_time: DateTime<Utc>, lead_hour: u32) -> String {
        format!(
            "rrfs.t{:02}z.{}lev.f0{:02}.conus_3km.grib2",
            init_hour(init_time),
            self.output.token(),
            lead_hour
        )
    }

    fn remote_name(&self, init_time: DateTime<Utc>, lead_hour: u32) -> String {
        format!(
            "rrfs_a/rrfs_a.{}/{:02}/control/{}",
            run_date(init_time),
            init_hour(init_time),
            self.local_name(init_time, lead_hour)
        )
    }

    fn cache_name(&self) -> &'static str {
        "store"
    }

    fn bucket(&self) -> &'static str {
        "noaa-rrfs-pds"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_native_level_names() {
        let init = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let rrfs = Rrfs::default();
        assert_eq!(rrfs.local_name(init, 1), "rrfs.t00z.natlev.f001.conus_3km.grib2");
        assert_eq!(
            rrfs.remote_name(init, 12),
            "rrfs_a/rrfs_a.20240201/00/control/rrfs.t00z.natlev.f012.conus_3km.grib2"
        );
        assert!(rrfs.remaps().is_empty());
    }

    #[test]
    fn test_pressure_level_names() {
        let init = Utc.with_ymd_and_hms(2024, 2, 1, 18, 0, 0).unwrap();
        let rrfs = Rrfs::new(RrfsOutput::Prs);
        assert_eq!(
            rrfs.local_name(init, 60),
            "rrfs.t18z.prslev.f060.conus_3km.grib2"
        );
    }
}
