//! Projected snapshot of the sky seen by one observer at one instant.
use std::{iter, sync::Arc};

use nalgebra::Point2;
use time::OffsetDateTime;
use tracing::trace;

use crate::{
    bodies::CelestialObject,
    catalogue::{Asterism, StarCatalogue},
    conversions::{EclipticToEquatorial, EquatorialToHorizontal},
    coordinates::{GeographicCoordinates, PlanePoint},
    ephemeris::Ephemeris,
    projection::StereographicProjection,
    time::Epoch,
    SkyError,
};

/// Every tracked object together with its position on the projection plane.
///
/// Planet and star positions are kept in flat `[x0, y0, x1, y1, ...]` arrays
/// whose order matches [`ObservedSky::planets`] and [`ObservedSky::stars`].
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedSky {
    sun: CelestialObject,
    sun_position: PlanePoint,
    moon: CelestialObject,
    moon_position: PlanePoint,
    planets: Vec<CelestialObject>,
    planet_positions: Vec<f64>,
    star_positions: Vec<f64>,
    catalogue: Arc<StarCatalogue>,
}

impl ObservedSky {
    pub fn build(
        when: OffsetDateTime,
        location: &GeographicCoordinates,
        projection: &StereographicProjection,
        catalogue: Arc<StarCatalogue>,
        ephemeris: &dyn Ephemeris,
    ) -> Result<Self, SkyError> {
        location.validate()?;

        let to_horizontal = EquatorialToHorizontal::new(when, location);
        let to_equatorial = EclipticToEquatorial::new(when);
        let days = Epoch::J2010.days_until(when);
        let project = |object: &CelestialObject| {
            projection.apply(&to_horizontal.apply(&object.equatorial_pos()))
        };

        let sun = ephemeris.sun_at(days, &to_equatorial)?;
        let sun_position = project(&sun);
        let moon = ephemeris.moon_at(days, &to_equatorial)?;
        let moon_position = project(&moon);

        let planets = ephemeris.planets_at(days, &to_equatorial)?;
        let planet_positions = flatten(planets.iter().map(project), planets.len());
        let star_positions = flatten(
            catalogue.stars().iter().map(project),
            catalogue.stars().len(),
        );

        trace!(
            %when,
            %location,
            planets = planets.len(),
            stars = catalogue.stars().len(),
            "built observed sky"
        );
        Ok(Self {
            sun,
            sun_position,
            moon,
            moon_position,
            planets,
            planet_positions,
            star_positions,
            catalogue,
        })
    }

    /// Assembles a snapshot from objects whose plane positions are already
    /// known.
    #[cfg(test)]
    pub(crate) fn from_projected(
        sun: (CelestialObject, PlanePoint),
        moon: (CelestialObject, PlanePoint),
        planets: Vec<(CelestialObject, PlanePoint)>,
        catalogue: Arc<StarCatalogue>,
        star_positions: &[PlanePoint],
    ) -> Self {
        assert_eq!(catalogue.stars().len(), star_positions.len());
        let planet_positions = flatten(planets.iter().map(|(_, p)| *p), planets.len());
        Self {
            sun: sun.0,
            sun_position: sun.1,
            moon: moon.0,
            moon_position: moon.1,
            planets: planets.into_iter().map(|(o, _)| o).collect(),
            planet_positions,
            star_positions: flatten(star_positions.iter().copied(), star_positions.len()),
            catalogue,
        }
    }

    pub fn sun(&self) -> &CelestialObject {
        &self.sun
    }

    pub fn sun_position(&self) -> PlanePoint {
        self.sun_position
    }

    pub fn moon(&self) -> &CelestialObject {
        &self.moon
    }

    pub fn moon_position(&self) -> PlanePoint {
        self.moon_position
    }

    pub fn planets(&self) -> &[CelestialObject] {
        &self.planets
    }

    pub fn planet_positions(&self) -> &[f64] {
        &self.planet_positions
    }

    pub fn stars(&self) -> &[CelestialObject] {
        self.catalogue.stars()
    }

    pub fn star_positions(&self) -> &[f64] {
        &self.star_positions
    }

    pub fn asterisms(&self) -> &[Asterism] {
        self.catalogue.asterisms()
    }

    pub fn asterism_indices(&self, asterism: &Asterism) -> Option<&[usize]> {
        self.catalogue.asterism_indices(asterism)
    }

    pub fn catalogue(&self) -> &Arc<StarCatalogue> {
        &self.catalogue
    }

    /// All objects with their positions: Sun, Moon, planets, then stars in
    /// catalogue order.
    pub fn objects(&self) -> impl Iterator<Item = (&CelestialObject, PlanePoint)> + '_ {
        iter::once((&self.sun, self.sun_position))
            .chain(iter::once((&self.moon, self.moon_position)))
            .chain(self.planets.iter().zip(points(&self.planet_positions)))
            .chain(self.stars().iter().zip(points(&self.star_positions)))
    }

    pub fn position_of(&self, object: &CelestialObject) -> Option<PlanePoint> {
        self.objects()
            .find(|(o, _)| std::ptr::eq(*o, object))
            .or_else(|| self.objects().find(|(o, _)| *o == object))
            .map(|(_, p)| p)
    }

    /// The object closest to `point`, if any lies strictly within
    /// `max_distance`. Ties go to the object enumerated first by
    /// [`ObservedSky::objects`].
    pub fn object_closest_to(
        &self,
        point: &PlanePoint,
        max_distance: f64,
    ) -> Option<&CelestialObject> {
        let mut min = max_distance * max_distance;
        let mut closest = None;
        for (object, position) in self.objects() {
            let d2 = nalgebra::distance_squared(&position, point);
            if d2 < min {
                min = d2;
                closest = Some(object);
            }
        }
        closest
    }
}

fn flatten(points: impl Iterator<Item = PlanePoint>, len: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(2 * len);
    for p in points {
        out.push(p.x);
        out.push(p.y);
    }
    out
}

fn points(flat: &[f64]) -> impl Iterator<Item = PlanePoint> + '_ {
    flat.chunks_exact(2).map(|xy| Point2::new(xy[0], xy[1]))
}
