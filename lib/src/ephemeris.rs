//! Motion models for the Sun, the Moon and the planets.
//!
//! The sky snapshot only depends on the [`Ephemeris`] trait; [`J2010Ephemeris`]
//! is the default implementation, built from the low-precision mean-element
//! models of Duffett-Smith's "Practical Astronomy with your Calculator" on the
//! J2010 epoch.

use std::f64::consts;

use crate::{
    bodies::{CelestialObject, ObjectKind},
    conversions::EclipticToEquatorial,
    coordinates::{angle, EclipticCoordinates},
    SkyError,
};

const DAYS_PER_TROPICAL_YEAR: f64 = 365.242_191;

/// Source of the solar-system objects at a given instant.
///
/// `days` is the number of days since [`crate::time::Epoch::J2010`].
pub trait Ephemeris {
    fn sun_at(
        &self,
        days: f64,
        conversion: &EclipticToEquatorial,
    ) -> Result<CelestialObject, SkyError>;

    fn moon_at(
        &self,
        days: f64,
        conversion: &EclipticToEquatorial,
    ) -> Result<CelestialObject, SkyError>;

    /// Every planet other than the observer's own, always in the same order.
    fn planets_at(
        &self,
        days: f64,
        conversion: &EclipticToEquatorial,
    ) -> Result<Vec<CelestialObject>, SkyError>;
}

/// Sun, Moon and the eight planets, observed from Earth.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct J2010Ephemeris;

impl Ephemeris for J2010Ephemeris {
    fn sun_at(
        &self,
        days: f64,
        conversion: &EclipticToEquatorial,
    ) -> Result<CelestialObject, SkyError> {
        SunModel::at(days, conversion)
    }

    fn moon_at(
        &self,
        days: f64,
        conversion: &EclipticToEquatorial,
    ) -> Result<CelestialObject, SkyError> {
        MoonModel::at(days, conversion)
    }

    fn planets_at(
        &self,
        days: f64,
        conversion: &EclipticToEquatorial,
    ) -> Result<Vec<CelestialObject>, SkyError> {
        PlanetModel::ALL
            .iter()
            .filter(|&&planet| planet != PlanetModel::HOME)
            .map(|planet| planet.at(days, conversion))
            .collect()
    }
}

/// Mean anomaly and true anomaly of an orbit with the given period (tropical
/// years), longitude at epoch, longitude of perigee and eccentricity.
fn anomalies(
    days: f64,
    period: f64,
    lon_at_epoch: f64,
    lon_at_perigee: f64,
    e: f64,
) -> (f64, f64) {
    let mean =
        consts::TAU / DAYS_PER_TROPICAL_YEAR * days / period + lon_at_epoch - lon_at_perigee;
    let truea = mean + 2.0 * e * libm::sin(mean);
    (mean, truea)
}

pub struct SunModel;

impl SunModel {
    const LON_AT_EPOCH: f64 = 279.557_208;
    const LON_AT_PERIGEE: f64 = 283.112_438;
    const ECCENTRICITY: f64 = 0.016_705;
    const ANGULAR_SIZE_AT_A: f64 = 0.533_128;
    const MAGNITUDE: f64 = -26.7;

    /// Geocentric ecliptic longitude and mean anomaly of the Sun.
    fn lon_and_mean_anomaly(days: f64) -> (f64, f64) {
        let (mean, truea) = anomalies(
            days,
            1.0,
            angle::of_deg(Self::LON_AT_EPOCH),
            angle::of_deg(Self::LON_AT_PERIGEE),
            Self::ECCENTRICITY,
        );
        (truea + angle::of_deg(Self::LON_AT_PERIGEE), mean)
    }

    pub fn at(days: f64, conversion: &EclipticToEquatorial) -> Result<CelestialObject, SkyError> {
        let (lon, mean) = Self::lon_and_mean_anomaly(days);
        let truea = lon - angle::of_deg(Self::LON_AT_PERIGEE);
        let e = Self::ECCENTRICITY;
        let size = angle::of_deg(Self::ANGULAR_SIZE_AT_A)
            * ((1.0 + e * libm::cos(truea)) / (1.0 - e * e));

        let ecliptic_pos = EclipticCoordinates::normalized(lon, 0.0);
        CelestialObject::new(
            "Sun",
            conversion.apply(&ecliptic_pos),
            size,
            Self::MAGNITUDE,
            ObjectKind::Sun {
                ecliptic_pos,
                mean_anomaly: mean,
            },
        )
    }
}

pub struct MoonModel;

impl MoonModel {
    const MEAN_LON: f64 = 91.929_336;
    const LON_AT_PERIGEE: f64 = 130.143_076;
    const LON_ASCENDING_NODE: f64 = 291.682_547;
    const INCLINATION: f64 = 5.145_396;
    const ECCENTRICITY: f64 = 0.054_9;
    const ANGULAR_SIZE_AT_A: f64 = 0.518_1;

    pub fn at(days: f64, conversion: &EclipticToEquatorial) -> Result<CelestialObject, SkyError> {
        let (sun_lon, sun_mean) = SunModel::lon_and_mean_anomaly(days);
        let sin_sun_mean = libm::sin(sun_mean);

        // Orbital longitude
        let l = angle::of_deg(13.176_396_6 * days + Self::MEAN_LON);
        let mean = l - angle::of_deg(0.111_404_1 * days + Self::LON_AT_PERIGEE);
        let evection = angle::of_deg(1.273_9) * libm::sin(2.0 * (l - sun_lon) - mean);
        let annual = angle::of_deg(0.185_8) * sin_sun_mean;
        let a3 = angle::of_deg(0.37) * sin_sun_mean;
        let corrected_mean = mean + evection - annual - a3;
        let centre = angle::of_deg(6.288_6) * libm::sin(corrected_mean);
        let a4 = angle::of_deg(0.214) * libm::sin(2.0 * corrected_mean);
        let l_corr = l + evection + centre - annual + a4;
        let variation = angle::of_deg(0.658_3) * libm::sin(2.0 * (l_corr - sun_lon));
        let true_lon = l_corr + variation;

        // Ecliptic position
        let node = angle::of_deg(Self::LON_ASCENDING_NODE - 0.052_953_9 * days)
            - angle::of_deg(0.16) * sin_sun_mean;
        let i = angle::of_deg(Self::INCLINATION);
        let lon = libm::atan2(
            libm::sin(true_lon - node) * libm::cos(i),
            libm::cos(true_lon - node),
        ) + node;
        let lat = libm::asin(libm::sin(true_lon - node) * libm::sin(i));

        let phase = (1.0 - libm::cos(true_lon - sun_lon)) / 2.0;
        let e = Self::ECCENTRICITY;
        let rho = (1.0 - e * e) / (1.0 + e * libm::cos(corrected_mean + centre));
        let size = angle::of_deg(Self::ANGULAR_SIZE_AT_A) / rho;

        CelestialObject::new(
            "Moon",
            conversion.apply(&EclipticCoordinates::normalized(lon, lat)),
            size,
            0.0,
            ObjectKind::Moon {
                phase: phase.clamp(0.0, 1.0),
            },
        )
    }
}

/// The planets, in registration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlanetModel {
    Mercury,
    Venus,
    Earth,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

/// Mean orbital elements at J2010.
struct Elements {
    name: &'static str,
    /// Tropical period (years)
    period: f64,
    /// Longitude at epoch (deg)
    lon_at_epoch: f64,
    /// Longitude at perihelion (deg)
    lon_at_perigee: f64,
    eccentricity: f64,
    /// Semi-major axis (AU)
    a: f64,
    /// Inclination (deg)
    inclination: f64,
    /// Longitude of the ascending node (deg)
    lon_ascending_node: f64,
    /// Angular size at 1 AU (arcsec)
    angular_size: f64,
    /// Magnitude at 1 AU
    magnitude: f64,
}

impl PlanetModel {
    pub const ALL: [PlanetModel; 8] = [
        PlanetModel::Mercury,
        PlanetModel::Venus,
        PlanetModel::Earth,
        PlanetModel::Mars,
        PlanetModel::Jupiter,
        PlanetModel::Saturn,
        PlanetModel::Uranus,
        PlanetModel::Neptune,
    ];

    /// The planet the observer stands on.
    pub const HOME: PlanetModel = PlanetModel::Earth;

    #[rustfmt::skip]
    fn elements(self) -> Elements {
        let (name, period, lon_at_epoch, lon_at_perigee, eccentricity) = match self {
            PlanetModel::Mercury => ("Mercury", 0.240_85, 75.567_1, 77.612, 0.205_627),
            PlanetModel::Venus => ("Venus", 0.615_207, 272.300_44, 131.54, 0.006_812),
            PlanetModel::Earth => ("Earth", 0.999_996, 99.556_772, 103.205_5, 0.016_671),
            PlanetModel::Mars => ("Mars", 1.880_765, 109.096_46, 336.217, 0.093_348),
            PlanetModel::Jupiter => ("Jupiter", 11.857_911, 337.917_132, 14.663_3, 0.048_907),
            PlanetModel::Saturn => ("Saturn", 29.310_579, 172.398_316, 89.567, 0.053_853),
            PlanetModel::Uranus => ("Uranus", 84.039_492, 356.135_400, 172.884_833, 0.046_321),
            PlanetModel::Neptune => ("Neptune", 165.845_39, 326.895_127, 23.07, 0.010_483),
        };
        let (a, inclination, lon_ascending_node, angular_size, magnitude) = match self {
            PlanetModel::Mercury => (0.387_098, 7.005_1, 48.449, 6.74, -0.42),
            PlanetModel::Venus => (0.723_329, 3.394_7, 76.769, 16.92, -4.40),
            PlanetModel::Earth => (0.999_985, 0.0, 0.0, 0.0, 0.0),
            PlanetModel::Mars => (1.523_689, 1.849_7, 49.632, 9.36, -1.52),
            PlanetModel::Jupiter => (5.202_78, 1.303_5, 100.595, 196.74, -9.40),
            PlanetModel::Saturn => (9.511_34, 2.487_3, 113.752, 165.60, -8.88),
            PlanetModel::Uranus => (19.218_14, 0.773_059, 73.926_961, 65.80, -7.19),
            PlanetModel::Neptune => (30.198_5, 1.767_3, 131.879, 62.20, -6.87),
        };
        Elements {
            name, period, lon_at_epoch, lon_at_perigee, eccentricity,
            a, inclination, lon_ascending_node, angular_size, magnitude,
        }
    }

    pub fn name(self) -> &'static str {
        self.elements().name
    }

    /// Heliocentric ecliptic state: radius (AU), longitude, latitude, and
    /// the longitude projected on the ecliptic plus the projected radius.
    fn heliocentric(&self, days: f64) -> Heliocentric {
        let el = self.elements();
        let e = el.eccentricity;
        let (_, truea) = anomalies(
            days,
            el.period,
            angle::of_deg(el.lon_at_epoch),
            angle::of_deg(el.lon_at_perigee),
            e,
        );
        let r = el.a * (1.0 - e * e) / (1.0 + e * libm::cos(truea));
        let l = truea + angle::of_deg(el.lon_at_perigee);

        let node = angle::of_deg(el.lon_ascending_node);
        let i = angle::of_deg(el.inclination);
        let psi = libm::asin(libm::sin(l - node) * libm::sin(i));
        let lon_ecl =
            libm::atan2(libm::sin(l - node) * libm::cos(i), libm::cos(l - node)) + node;
        Heliocentric {
            r,
            l,
            psi,
            r_ecl: r * libm::cos(psi),
            lon_ecl,
        }
    }

    pub fn at(
        self,
        days: f64,
        conversion: &EclipticToEquatorial,
    ) -> Result<CelestialObject, SkyError> {
        let el = self.elements();
        let planet = self.heliocentric(days);
        let earth = PlanetModel::HOME.heliocentric(days);
        let (big_r, big_l) = (earth.r, earth.l);

        let lon = if el.a < 1.0 {
            consts::PI
                + big_l
                + libm::atan2(
                    planet.r_ecl * libm::sin(big_l - planet.lon_ecl),
                    big_r - planet.r_ecl * libm::cos(big_l - planet.lon_ecl),
                )
        } else {
            planet.lon_ecl
                + libm::atan2(
                    big_r * libm::sin(planet.lon_ecl - big_l),
                    planet.r_ecl - big_r * libm::cos(planet.lon_ecl - big_l),
                )
        };
        let lat = libm::atan(
            planet.r_ecl * libm::tan(planet.psi) * libm::sin(lon - planet.lon_ecl)
                / (big_r * libm::sin(planet.lon_ecl - big_l)),
        );

        let rho = libm::sqrt(
            big_r * big_r + planet.r * planet.r
                - 2.0 * big_r * planet.r * libm::cos(planet.l - big_l) * libm::cos(planet.psi),
        );
        let size = angle::of_arcsec(el.angular_size) / rho;
        let phase = (1.0 + libm::cos(lon - planet.l)) / 2.0;
        let magnitude = el.magnitude + 5.0 * libm::log10(planet.r * rho / libm::sqrt(phase));

        CelestialObject::new(
            el.name,
            conversion.apply(&EclipticCoordinates::normalized(lon, lat)),
            size,
            magnitude,
            ObjectKind::Planet,
        )
    }
}

struct Heliocentric {
    r: f64,
    l: f64,
    psi: f64,
    r_ecl: f64,
    lon_ecl: f64,
}
