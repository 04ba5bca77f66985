//! Stereographic projection of the celestial sphere onto a plane.
use std::fmt;

use nalgebra::Point2;

use crate::coordinates::{HorizontalCoordinates, PlanePoint};

/// Stereographic projection centered on a horizontal position.
///
/// The center maps to the origin; a point at angular distance `c` from it
/// lands at radius `tan(c / 2)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StereographicProjection {
    center: HorizontalCoordinates,
    cos_phi0: f64,
    sin_phi0: f64,
}

impl StereographicProjection {
    pub fn new(center: HorizontalCoordinates) -> Self {
        Self {
            center,
            cos_phi0: libm::cos(center.alt()),
            sin_phi0: libm::sin(center.alt()),
        }
    }

    pub fn center(&self) -> HorizontalCoordinates {
        self.center
    }

    pub fn apply(&self, hor: &HorizontalCoordinates) -> PlanePoint {
        let dlon = hor.az() - self.center.az();
        let (sin_dlon, cos_dlon) = (libm::sin(dlon), libm::cos(dlon));
        let (sin_phi, cos_phi) = (libm::sin(hor.alt()), libm::cos(hor.alt()));

        let d = 1.0 / (1.0 + sin_phi * self.sin_phi0 + cos_phi * self.cos_phi0 * cos_dlon);
        Point2::new(
            d * cos_phi * sin_dlon,
            d * (sin_phi * self.cos_phi0 - cos_phi * self.sin_phi0 * cos_dlon),
        )
    }

    pub fn inverse_apply(&self, xy: &PlanePoint) -> HorizontalCoordinates {
        let rho2 = xy.x * xy.x + xy.y * xy.y;
        if rho2 == 0.0 {
            return self.center;
        }
        let rho = libm::sqrt(rho2);
        let sin_c = 2.0 * rho / (rho2 + 1.0);
        let cos_c = (1.0 - rho2) / (rho2 + 1.0);

        let lon = libm::atan2(
            xy.x * sin_c,
            rho * self.cos_phi0 * cos_c - xy.y * self.sin_phi0 * sin_c,
        ) + self.center.az();
        let lat = libm::asin(
            (cos_c * self.sin_phi0 + xy.y * sin_c * self.cos_phi0 / rho).clamp(-1.0, 1.0),
        );
        HorizontalCoordinates::normalized(lon, lat)
    }

    /// Plane diameter of a disc with angular diameter `rad` centered on the
    /// projection center.
    pub fn apply_to_angle(&self, rad: f64) -> f64 {
        2.0 * libm::tan(rad / 4.0)
    }

    /// Center of the circle that the parallel through `hor` projects to.
    pub fn circle_center_for_parallel(&self, hor: &HorizontalCoordinates) -> PlanePoint {
        Point2::new(
            0.0,
            self.cos_phi0 / (libm::sin(hor.alt()) + self.sin_phi0),
        )
    }

    /// Radius of the circle that the parallel through `hor` projects to.
    ///
    /// The result is infinite when the parallel passes through the
    /// projection's antipode, in which case the parallel maps to a line.
    pub fn circle_radius_for_parallel(&self, hor: &HorizontalCoordinates) -> f64 {
        libm::cos(hor.alt()) / (libm::sin(hor.alt()) + self.sin_phi0)
    }
}

impl fmt::Display for StereographicProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StereographicProjection(center={})", self.center)
    }
}
