use crate::product::{init_hour, run_date, Product, VariableRemap};
use chrono::{DateTime, Utc};

const REMAPS: &[VariableRemap] = &[
    VariableRemap {
        source: "MXUPHL_P8_2L103_GLC0_max1h",
        layers: &[
            (1, "MXUPHL03_P8_2L103_GLC0_max1h"),
            (2, "MXUPHL25_P8_2L103_GLC0_max1h"),
        ],
    },
    VariableRemap {
        source: "UGRD_P0_L103_GLC0",
        layers: &[(0, "UGRD_P0_L103_GLC0")],
    },
    VariableRemap {
        source: "VGRD_P0_L103_GLC0",
        layers: &[(0, "VGRD_P0_L103_GLC0")],
    },
];

/// High-Resolution Rapid Refresh, CONUS native-level output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hrrr;

impl Product for Hrrr {
    fn id(&self) -> &'static str {
        "hrrr"
    }

    fn local_name(&self, init_time: DateTime<Utc>, lead_hour: u32) -> String {
        format!(
            "hrrr.t{:02}z.wrfnatf{:02}.grib2",
            init_hour(init_time),
            lead_hour
        )
    }

    fn remote_name(&self, init_time: DateTime<Utc>, lead_hour: u32) -> String {
        format!(
            "hrrr.{}/conus/{}",
            run_date(init_time),
            self.local_name(init_time, lead_hour)
        )
    }

    fn cache_name(&self) -> &'static str {
        "hrrr_store"
    }

    fn bucket(&self) -> &'static str {
        "noaa-hrrr-bdp-pds"
    }

    fn remaps(&self) -> &'static [VariableRemap] {
        REMAPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_names_pad_hours() {
        let init = Utc.with_ymd_and_hms(2024, 5, 7, 6, 0, 0).unwrap();
        assert_eq!(Hrrr.local_name(init, 3), "hrrr.t06z.wrfnatf03.grib2");
        assert_eq!(
            Hrrr.remote_name(init, 18),
            "hrrr.20240507/conus/hrrr.t06z.wrfnatf18.grib2"
        );
    }

    #[test]
    fn test_remap_lookup() {
        let remap = Hrrr.remap_for("MXUPHL_P8_2L103_GLC0_max1h").unwrap();
        assert_eq!(remap.layers.len(), 2);
        assert_eq!(remap.layers[1], (2, "MXUPHL25_P8_2L103_GLC0_max1h"));
        assert!(Hrrr.remap_for("TMP_P0_L103_GLC0").is_none());
    }
}
