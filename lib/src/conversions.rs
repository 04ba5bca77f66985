//! Conversions between the spherical coordinate systems.
use time::OffsetDateTime;

use crate::{
    coordinates::{
        angle, EclipticCoordinates, EquatorialCoordinates, GeographicCoordinates,
        HorizontalCoordinates,
    },
    time::{local_sidereal_time, Epoch},
};

/// Obliquity of the ecliptic at `when`, in radians.
pub fn obliquity(when: OffsetDateTime) -> f64 {
    let t = Epoch::J2000.julian_centuries_until(when);
    // Horner form of 0.00181″T³ − 0.0006″T² − 46.815″T + 23°26′21.45″
    ((angle::of_arcsec(0.00181) * t + angle::of_arcsec(-0.0006)) * t + angle::of_arcsec(-46.815))
        * t
        + angle::of_dms(23, 26, 21.45)
}

/// Ecliptic to equatorial conversion bound to one instant.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EclipticToEquatorial {
    cos_eps: f64,
    sin_eps: f64,
}

impl EclipticToEquatorial {
    pub fn new(when: OffsetDateTime) -> Self {
        let eps = obliquity(when);
        Self {
            cos_eps: libm::cos(eps),
            sin_eps: libm::sin(eps),
        }
    }

    pub fn apply(&self, ecl: &EclipticCoordinates) -> EquatorialCoordinates {
        let (sin_lon, cos_lon) = (libm::sin(ecl.lon()), libm::cos(ecl.lon()));
        let (sin_lat, cos_lat) = (libm::sin(ecl.lat()), libm::cos(ecl.lat()));

        let ra = libm::atan2(
            sin_lon * self.cos_eps - (sin_lat / cos_lat) * self.sin_eps,
            cos_lon,
        );
        let dec = libm::asin(sin_lat * self.cos_eps + cos_lat * self.sin_eps * sin_lon);
        EquatorialCoordinates::normalized(ra, dec)
    }
}

/// Equatorial to horizontal conversion bound to one instant and one observer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EquatorialToHorizontal {
    sidereal: f64,
    cos_lat: f64,
    sin_lat: f64,
}

impl EquatorialToHorizontal {
    pub fn new(when: OffsetDateTime, location: &GeographicCoordinates) -> Self {
        Self {
            sidereal: local_sidereal_time(when, location),
            cos_lat: libm::cos(location.lat()),
            sin_lat: libm::sin(location.lat()),
        }
    }

    pub fn apply(&self, eq: &EquatorialCoordinates) -> HorizontalCoordinates {
        let (az, alt) = self.rotate(self.sidereal - eq.ra(), eq.dec());
        HorizontalCoordinates::normalized(az, alt)
    }

    /// Maps horizontal coordinates back to the equatorial position that
    /// [`EquatorialToHorizontal::apply`] would send there.
    pub fn inverse_apply(&self, hor: &HorizontalCoordinates) -> EquatorialCoordinates {
        let (hour_angle, dec) = self.rotate(hor.az(), hor.alt());
        EquatorialCoordinates::normalized(self.sidereal - hour_angle, dec)
    }

    // The hour-angle/declination ↔ azimuth/altitude rotation is its own
    // inverse for a fixed latitude.
    fn rotate(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (sin_lat, cos_lat) = (libm::sin(lat), libm::cos(lat));
        let sin_out = (sin_lat * self.sin_lat + cos_lat * self.cos_lat * libm::cos(lon))
            .clamp(-1.0, 1.0);
        let lon_out = libm::atan2(
            -cos_lat * self.cos_lat * libm::sin(lon),
            sin_lat - self.sin_lat * sin_out,
        );
        (lon_out, libm::asin(sin_out))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn ecliptic_to_equatorial_known_value() {
        // Duffett-Smith §27.
        let conv = EclipticToEquatorial::new(datetime!(2009-07-06 00:00 UTC));
        let ecl = EclipticCoordinates::of(
            angle::of_dms(139, 41, 10.0),
            angle::of_dms(4, 52, 31.0),
        )
        .unwrap();
        let eq = conv.apply(&ecl);
        assert_relative_eq!(eq.ra_hr(), 9.581_478, epsilon = 1e-4);
        assert_relative_eq!(eq.dec_deg(), 19.535_003, epsilon = 1e-4);
    }

    #[test]
    fn hour_angle_to_horizontal_known_value() {
        // Duffett-Smith §25: H = 5h51m44s, δ = 23°13′10″, φ = 52°.
        let conv = EquatorialToHorizontal {
            sidereal: 0.0,
            cos_lat: libm::cos(angle::of_deg(52.0)),
            sin_lat: libm::sin(angle::of_deg(52.0)),
        };
        let (az, alt) = conv.rotate(
            angle::of_hr(5.0 + 51.0 / 60.0 + 44.0 / 3600.0),
            angle::of_dms(23, 13, 10.0),
        );
        let hor = HorizontalCoordinates::normalized(az, alt);
        assert_relative_eq!(hor.az_deg(), 283.271_027, epsilon = 1e-4);
        assert_relative_eq!(hor.alt_deg(), 19.334_345, epsilon = 1e-4);
    }

    #[test]
    fn horizontal_round_trip() {
        let location = GeographicCoordinates::of_deg(6.57, 46.52).unwrap();
        let conv = EquatorialToHorizontal::new(datetime!(2020-04-17 21:00 +2), &location);
        let eq = EquatorialCoordinates::of_deg(101.287, -16.716).unwrap();
        let back = conv.inverse_apply(&conv.apply(&eq));
        assert_relative_eq!(back.ra_deg(), eq.ra_deg(), epsilon = 1e-9);
        assert_relative_eq!(back.dec_deg(), eq.dec_deg(), epsilon = 1e-9);
    }

    #[test]
    fn obliquity_at_j2000() {
        assert_relative_eq!(
            angle::to_deg(obliquity(datetime!(2000-01-01 12:00 UTC))),
            23.439_291,
            epsilon = 1e-6
        );
    }
}
