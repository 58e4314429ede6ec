//! Variable names in the `ABBREV_P{template}_L{surface}_GLC0[_{stat}]` convention,
//! e.g. `TMP_P0_L103_GLC0` or `MXUPHL_P8_2L103_GLC0_max1h`.

use crate::dataset::grib2::inventory::{FixedSurface, GridInfo, ProductInfo, Statistic};

pub fn variable_name(discipline: u8, grid: &GridInfo, product: &ProductInfo) -> String {
    let parameter = match abbreviation(discipline, product.category, product.number) {
        Some(abbrev) => abbrev.to_string(),
        None => format!("VAR_{}_{}_{}", discipline, product.category, product.number),
    };

    let mut name = format!(
        "{}_P{}_{}_{}",
        parameter,
        product.template,
        level_token(&product.first_surface, &product.second_surface),
        grid_token(grid)
    );
    if let Some(statistic) = &product.statistic {
        name.push('_');
        name.push_str(&statistic_token(statistic));
    }
    name
}

/// Short name of a GRIB2 parameter (discipline, category, number).
pub fn abbreviation(discipline: u8, category: u8, number: u8) -> Option<&'static str> {
    let abbrev = match (discipline, category, number) {
        (0, 0, 0) => "TMP",
        (0, 0, 2) => "POT",
        (0, 0, 6) => "DPT",
        (0, 1, 0) => "SPFH",
        (0, 1, 1) => "RH",
        (0, 1, 3) => "PWAT",
        (0, 1, 8) => "APCP",
        (0, 1, 11) => "SNOD",
        (0, 1, 13) => "WEASD",
        (0, 1, 22) => "CLMR",
        (0, 2, 2) => "UGRD",
        (0, 2, 3) => "VGRD",
        (0, 2, 8) => "VVEL",
        (0, 2, 9) => "DZDT",
        (0, 2, 10) => "ABSV",
        (0, 2, 22) => "GUST",
        (0, 2, 220) => "MAXUVV",
        (0, 2, 221) => "MAXDVV",
        (0, 2, 222) => "MAXUW",
        (0, 2, 223) => "MAXVW",
        (0, 3, 0) => "PRES",
        (0, 3, 1) => "PRMSL",
        (0, 3, 5) => "HGT",
        (0, 3, 198) => "MSLMA",
        (0, 6, 1) => "TCDC",
        (0, 7, 6) => "CAPE",
        (0, 7, 7) => "CIN",
        (0, 7, 8) => "HLCY",
        (0, 7, 199) => "MXUPHL",
        (0, 16, 195) => "REFD",
        (0, 16, 196) => "REFC",
        (0, 16, 198) => "MAXREF",
        (0, 19, 0) => "VIS",
        _ => return None,
    };
    Some(abbrev)
}

fn level_token(first: &FixedSurface, second: &FixedSurface) -> String {
    if second.is_missing() {
        format!("L{}", first.kind)
    } else if second.kind == first.kind {
        format!("2L{}", first.kind)
    } else {
        format!("L{}_L{}", first.kind, second.kind)
    }
}

fn grid_token(grid: &GridInfo) -> String {
    match grid {
        GridInfo::Lambert(_) => "GLC0".to_string(),
        GridInfo::Unsupported(0) => "GLL0".to_string(),
        GridInfo::Unsupported(template) => format!("G{template}"),
    }
}

fn statistic_token(statistic: &Statistic) -> String {
    let process = match statistic.process {
        0 => "avg".to_string(),
        1 => "acc".to_string(),
        2 => "max".to_string(),
        3 => "min".to_string(),
        other => format!("stat{other}"),
    };
    let unit = match statistic.time_unit {
        0 => "min",
        1 => "h",
        2 => "d",
        _ => "",
    };
    format!("{}{}{}", process, statistic.length, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::grib2::lambert::LambertConformal;

    fn surface(kind: u8, value: i32) -> FixedSurface {
        FixedSurface {
            kind,
            scale_factor: 0,
            scaled_value: value,
        }
    }

    fn product(category: u8, number: u8, second: FixedSurface) -> ProductInfo {
        ProductInfo {
            template: 0,
            category,
            number,
            first_surface: surface(103, 10),
            second_surface: second,
            statistic: None,
        }
    }

    fn lambert() -> GridInfo {
        GridInfo::Lambert(LambertConformal {
            nx: 1,
            ny: 1,
            la1: 0.0,
            lo1: 0.0,
            lad: 38.5,
            lov: 262.5,
            latin1: 38.5,
            latin2: 38.5,
            dx: 3000.0,
            dy: 3000.0,
            scanning_mode: 0x40,
            earth_radius: 6_371_229.0,
        })
    }

    #[test]
    fn test_instantaneous_single_level() {
        let name = variable_name(0, &lambert(), &product(2, 2, FixedSurface::MISSING));
        assert_eq!(name, "UGRD_P0_L103_GLC0");
    }

    #[test]
    fn test_layer_with_statistic() {
        let mut info = product(7, 199, surface(103, 3000));
        info.template = 8;
        info.statistic = Some(Statistic {
            process: 2,
            time_unit: 1,
            length: 1,
        });
        assert_eq!(
            variable_name(0, &lambert(), &info),
            "MXUPHL_P8_2L103_GLC0_max1h"
        );

        info.statistic = Some(Statistic {
            process: 1,
            time_unit: 0,
            length: 15,
        });
        assert!(variable_name(0, &lambert(), &info).ends_with("_acc15min"));
    }

    #[test]
    fn test_unknown_parameter_falls_back_to_codes() {
        let name = variable_name(10, &GridInfo::Unsupported(0), &product(0, 3, FixedSurface::MISSING));
        assert_eq!(name, "VAR_10_0_3_P0_L103_GLL0");
    }

    #[test]
    fn test_mixed_surface_layer() {
        let name = variable_name(0, &lambert(), &product(0, 0, surface(1, 0)));
        assert_eq!(name, "TMP_P0_L103_L1_GLC0");
    }
}
