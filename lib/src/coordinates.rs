//! Spherical and planar coordinate types.
//!
//! All angles are stored in radians. Every spherical type validates its
//! components on construction; the `*_deg` constructors are the ones the
//! configuration and the UI layer use.
use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::SkyError;

/// A point on the projection plane.
pub type PlanePoint = Point2<f64>;

/// Angle helpers.
pub mod angle {
    use std::f64::consts;

    pub const TAU: f64 = consts::TAU;

    pub fn of_deg(deg: f64) -> f64 {
        deg.to_radians()
    }

    pub fn to_deg(rad: f64) -> f64 {
        rad.to_degrees()
    }

    pub fn of_hr(hr: f64) -> f64 {
        hr * TAU / 24.0
    }

    pub fn to_hr(rad: f64) -> f64 {
        rad * 24.0 / TAU
    }

    pub fn of_arcsec(arcsec: f64) -> f64 {
        of_deg(arcsec / 3600.0)
    }

    /// Builds an angle from degrees, arc-minutes and arc-seconds.
    pub fn of_dms(deg: u32, min: u32, sec: f64) -> f64 {
        of_deg(deg as f64 + min as f64 / 60.0 + sec / 3600.0)
    }

    /// Reduces `rad` to `[0, τ)`.
    pub fn normalize_positive(rad: f64) -> f64 {
        rad.rem_euclid(TAU)
    }
}

fn check_closed(value: f64, lo: f64, hi: f64, what: &str) -> Result<f64, SkyError> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(value)
    } else {
        Err(SkyError::invalid(format!("{what} {value} outside [{lo}, {hi}]")))
    }
}

fn check_half_open(value: f64, lo: f64, hi: f64, what: &str) -> Result<f64, SkyError> {
    if value.is_finite() && (lo..hi).contains(&value) {
        Ok(value)
    } else {
        Err(SkyError::invalid(format!("{what} {value} outside [{lo}, {hi})")))
    }
}

/// Geographic position of an observer on Earth.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeographicCoordinates {
    lon: f64,
    lat: f64,
}

impl GeographicCoordinates {
    pub fn of_deg(lon_deg: f64, lat_deg: f64) -> Result<Self, SkyError> {
        let lon_deg = check_half_open(lon_deg, -180.0, 180.0, "longitude")?;
        let lat_deg = check_closed(lat_deg, -90.0, 90.0, "latitude")?;
        Ok(Self {
            lon: angle::of_deg(lon_deg),
            lat: angle::of_deg(lat_deg),
        })
    }

    pub fn is_valid_lon_deg(lon_deg: f64) -> bool {
        lon_deg.is_finite() && (-180.0..180.0).contains(&lon_deg)
    }

    pub fn is_valid_lat_deg(lat_deg: f64) -> bool {
        lat_deg.is_finite() && (-90.0..=90.0).contains(&lat_deg)
    }

    /// Re-checks the ranges; values obtained through deserialization bypass
    /// [`GeographicCoordinates::of_deg`].
    pub fn validate(&self) -> Result<(), SkyError> {
        use std::f64::consts::{FRAC_PI_2, PI};
        check_half_open(self.lon, -PI, PI, "longitude")?;
        check_closed(self.lat, -FRAC_PI_2, FRAC_PI_2, "latitude")?;
        Ok(())
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon_deg(&self) -> f64 {
        angle::to_deg(self.lon)
    }

    pub fn lat_deg(&self) -> f64 {
        angle::to_deg(self.lat)
    }
}

impl fmt::Display for GeographicCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(lon={:.4}°, lat={:.4}°)", self.lon_deg(), self.lat_deg())
    }
}

/// Azimuth/altitude position relative to an observer.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HorizontalCoordinates {
    az: f64,
    alt: f64,
}

impl HorizontalCoordinates {
    pub fn of(az: f64, alt: f64) -> Result<Self, SkyError> {
        let az = check_half_open(az, 0.0, angle::TAU, "azimuth")?;
        let alt = check_closed(
            alt,
            -std::f64::consts::FRAC_PI_2,
            std::f64::consts::FRAC_PI_2,
            "altitude",
        )?;
        Ok(Self { az, alt })
    }

    pub fn of_deg(az_deg: f64, alt_deg: f64) -> Result<Self, SkyError> {
        let az_deg = check_half_open(az_deg, 0.0, 360.0, "azimuth")?;
        let alt_deg = check_closed(alt_deg, -90.0, 90.0, "altitude")?;
        Ok(Self {
            az: angle::of_deg(az_deg),
            alt: angle::of_deg(alt_deg),
        })
    }

    /// Builds coordinates from the output of a trigonometric computation,
    /// reducing the azimuth into range and clamping rounding noise on the
    /// altitude.
    pub(crate) fn normalized(az: f64, alt: f64) -> Self {
        Self {
            az: angle::normalize_positive(az),
            alt: alt.clamp(-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2),
        }
    }

    pub fn az(&self) -> f64 {
        self.az
    }

    pub fn alt(&self) -> f64 {
        self.alt
    }

    pub fn az_deg(&self) -> f64 {
        angle::to_deg(self.az)
    }

    pub fn alt_deg(&self) -> f64 {
        angle::to_deg(self.alt)
    }

    /// Great-circle distance to `that`, in radians.
    pub fn angular_distance_to(&self, that: &HorizontalCoordinates) -> f64 {
        libm::acos(
            (libm::sin(self.alt) * libm::sin(that.alt)
                + libm::cos(self.alt) * libm::cos(that.alt) * libm::cos(self.az - that.az))
            .clamp(-1.0, 1.0),
        )
    }
}

impl fmt::Display for HorizontalCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(az={:.4}°, alt={:.4}°)", self.az_deg(), self.alt_deg())
    }
}

/// Right ascension/declination position.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquatorialCoordinates {
    ra: f64,
    dec: f64,
}

impl EquatorialCoordinates {
    pub fn of(ra: f64, dec: f64) -> Result<Self, SkyError> {
        let ra = check_half_open(ra, 0.0, angle::TAU, "right ascension")?;
        let dec = check_closed(
            dec,
            -std::f64::consts::FRAC_PI_2,
            std::f64::consts::FRAC_PI_2,
            "declination",
        )?;
        Ok(Self { ra, dec })
    }

    pub fn of_deg(ra_deg: f64, dec_deg: f64) -> Result<Self, SkyError> {
        let ra_deg = check_half_open(ra_deg, 0.0, 360.0, "right ascension")?;
        let dec_deg = check_closed(dec_deg, -90.0, 90.0, "declination")?;
        Ok(Self {
            ra: angle::of_deg(ra_deg),
            dec: angle::of_deg(dec_deg),
        })
    }

    pub(crate) fn normalized(ra: f64, dec: f64) -> Self {
        Self {
            ra: angle::normalize_positive(ra),
            dec: dec.clamp(-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2),
        }
    }

    pub fn ra(&self) -> f64 {
        self.ra
    }

    pub fn dec(&self) -> f64 {
        self.dec
    }

    pub fn ra_deg(&self) -> f64 {
        angle::to_deg(self.ra)
    }

    pub fn ra_hr(&self) -> f64 {
        angle::to_hr(self.ra)
    }

    pub fn dec_deg(&self) -> f64 {
        angle::to_deg(self.dec)
    }
}

impl fmt::Display for EquatorialCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(ra={:.4}h, dec={:.4}°)", self.ra_hr(), self.dec_deg())
    }
}

/// Ecliptic longitude/latitude position.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EclipticCoordinates {
    lon: f64,
    lat: f64,
}

impl EclipticCoordinates {
    pub fn of(lon: f64, lat: f64) -> Result<Self, SkyError> {
        let lon = check_half_open(lon, 0.0, angle::TAU, "ecliptic longitude")?;
        let lat = check_closed(
            lat,
            -std::f64::consts::FRAC_PI_2,
            std::f64::consts::FRAC_PI_2,
            "ecliptic latitude",
        )?;
        Ok(Self { lon, lat })
    }

    pub(crate) fn normalized(lon: f64, lat: f64) -> Self {
        Self {
            lon: angle::normalize_positive(lon),
            lat: lat.clamp(-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2),
        }
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon_deg(&self) -> f64 {
        angle::to_deg(self.lon)
    }

    pub fn lat_deg(&self) -> f64 {
        angle::to_deg(self.lat)
    }
}

impl fmt::Display for EclipticCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(λ={:.4}°, β={:.4}°)", self.lon_deg(), self.lat_deg())
    }
}
