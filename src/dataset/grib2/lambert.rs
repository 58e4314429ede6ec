//! Lambert conformal conic grids (GRIB2 grid definition template 3.30).

use crate::dataset::error::DatasetError;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

const SCAN_I_NEGATIVE: u8 = 0x80;
const SCAN_J_POSITIVE: u8 = 0x40;
const SCAN_J_CONSECUTIVE: u8 = 0x20;
const SCAN_BOUSTROPHEDON: u8 = 0x10;

/// Angles are in degrees, distances in metres.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    pub nx: usize,
    pub ny: usize,
    /// Latitude of the first grid point.
    pub la1: f64,
    /// Longitude of the first grid point, as stored (0..360).
    pub lo1: f64,
    /// Latitude where `dx` and `dy` are specified.
    pub lad: f64,
    /// Orientation meridian.
    pub lov: f64,
    pub latin1: f64,
    pub latin2: f64,
    pub dx: f64,
    pub dy: f64,
    pub scanning_mode: u8,
    pub earth_radius: f64,
}

struct Cone {
    n: f64,
    /// `R * F` of the Snyder formulation.
    rf: f64,
    rho_ref: f64,
    lov: f64,
}

impl LambertConformal {
    fn cone(&self) -> Cone {
        let phi1 = self.latin1.to_radians();
        let phi2 = self.latin2.to_radians();
        let n = if (phi1 - phi2).abs() < 1e-10 {
            phi1.sin()
        } else {
            (phi1.cos() / phi2.cos()).ln() / (tan_half(phi2) / tan_half(phi1)).ln()
        };
        let rf = self.earth_radius * phi1.cos() * tan_half(phi1).powf(n) / n;
        let rho_ref = rf / tan_half(self.lad.to_radians()).powf(n);
        Cone {
            n,
            rf,
            rho_ref,
            lov: self.lov.to_radians(),
        }
    }

    fn project(cone: &Cone, lat: f64, lon: f64) -> (f64, f64) {
        let rho = cone.rf / tan_half(lat.to_radians()).powf(cone.n);
        let theta = cone.n * wrap_pi(lon.to_radians() - cone.lov);
        (rho * theta.sin(), cone.rho_ref - rho * theta.cos())
    }

    fn unproject(cone: &Cone, x: f64, y: f64) -> (f64, f64) {
        let dy = cone.rho_ref - y;
        let sign = cone.n.signum();
        let rho = sign * (x * x + dy * dy).sqrt();
        let theta = (sign * x).atan2(sign * dy);
        let lat = 2.0 * (cone.rf / rho).powf(1.0 / cone.n).atan() - FRAC_PI_2;
        let lon = cone.lov + theta / cone.n;
        (lat.to_degrees(), normalize_lon(lon.to_degrees()))
    }

    fn steps(&self) -> Result<(f64, f64), DatasetError> {
        if self.scanning_mode & (SCAN_J_CONSECUTIVE | SCAN_BOUSTROPHEDON) != 0 {
            return Err(DatasetError::UnsupportedScanning(self.scanning_mode));
        }
        let dx = if self.scanning_mode & SCAN_I_NEGATIVE != 0 {
            -self.dx
        } else {
            self.dx
        };
        let dy = if self.scanning_mode & SCAN_J_POSITIVE != 0 {
            self.dy
        } else {
            -self.dy
        };
        Ok((dx, dy))
    }

    /// Latitude and longitude of grid point (`i`, `j`) in scan order. Longitudes are in
    /// [-180, 180).
    pub fn grid_to_geo(&self, i: f64, j: f64) -> Result<(f64, f64), DatasetError> {
        let (dx, dy) = self.steps()?;
        let cone = self.cone();
        let (x0, y0) = Self::project(&cone, self.la1, self.lo1);
        Ok(Self::unproject(&cone, x0 + i * dx, y0 + j * dy))
    }

    /// Fractional grid indices of a geographic point.
    pub fn geo_to_grid(&self, lat: f64, lon: f64) -> Result<(f64, f64), DatasetError> {
        let (dx, dy) = self.steps()?;
        let cone = self.cone();
        let (x0, y0) = Self::project(&cone, self.la1, self.lo1);
        let (x, y) = Self::project(&cone, lat, lon);
        Ok(((x - x0) / dx, (y - y0) / dy))
    }

    /// Row-major (`ny`, `nx`) latitude and longitude arrays in file scan order.
    pub fn latlons(&self) -> Result<(Vec<f32>, Vec<f32>), DatasetError> {
        let (dx, dy) = self.steps()?;
        let cone = self.cone();
        let (x0, y0) = Self::project(&cone, self.la1, self.lo1);

        let points = self.nx * self.ny;
        let mut lats = Vec::with_capacity(points);
        let mut lons = Vec::with_capacity(points);
        for j in 0..self.ny {
            let y = y0 + j as f64 * dy;
            for i in 0..self.nx {
                let (lat, lon) = Self::unproject(&cone, x0 + i as f64 * dx, y);
                lats.push(lat as f32);
                lons.push(lon as f32);
            }
        }
        Ok((lats, lons))
    }
}

fn tan_half(phi: f64) -> f64 {
    (FRAC_PI_4 + phi / 2.0).tan()
}

fn wrap_pi(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
