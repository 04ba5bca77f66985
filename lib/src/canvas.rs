//! Observer, time and view state, and the values derived from them.
//!
//! Every input property is a [`Leaf`] carrying a generation counter that is
//! bumped on each write. Derived values are recomputed lazily, when read, and
//! only if one of the generations they were computed from has moved since.
use std::sync::Arc;

use nalgebra::{Affine2, Matrix3, Point2, Vector2};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use tracing::trace;

use crate::{
    bodies::CelestialObject,
    catalogue::StarCatalogue,
    coordinates::{angle, GeographicCoordinates, HorizontalCoordinates, PlanePoint},
    ephemeris::{Ephemeris, J2010Ephemeris},
    projection::StereographicProjection,
    sky::ObservedSky,
    SkyError,
};

/// Picking radius around the pointer, in pixels.
pub const PICKING_RADIUS_PX: f64 = 10.0;

/// A mutable input value with a write counter.
#[derive(Clone, Debug)]
pub struct Leaf<T> {
    value: T,
    generation: u64,
}

impl<T> Leaf<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            generation: 0,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A cached value computed from `N` upstream generations.
#[derive(Clone, Debug)]
struct Derived<T, const N: usize> {
    name: &'static str,
    cached: Option<T>,
    seen: Option<[u64; N]>,
    generation: u64,
}

impl<T: Clone, const N: usize> Derived<T, N> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            cached: None,
            seen: None,
            generation: 0,
        }
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the cached value if `deps` are unchanged, otherwise recomputes.
    /// A failed recomputation leaves the previous value in place.
    fn try_get(
        &mut self,
        deps: [u64; N],
        compute: impl FnOnce() -> Result<T, SkyError>,
    ) -> Result<T, SkyError> {
        if self.seen == Some(deps) {
            if let Some(value) = &self.cached {
                return Ok(value.clone());
            }
        }
        let value = compute()?;
        self.cached = Some(value.clone());
        self.seen = Some(deps);
        self.generation += 1;
        trace!(node = self.name, generation = self.generation, "recomputed");
        Ok(value)
    }

    fn get(&mut self, deps: [u64; N], compute: impl FnOnce() -> T) -> T {
        if self.seen == Some(deps) {
            if let Some(value) = &self.cached {
                return value.clone();
            }
        }
        let value = compute();
        self.cached = Some(value.clone());
        self.seen = Some(deps);
        self.generation += 1;
        trace!(node = self.name, generation = self.generation, "recomputed");
        value
    }
}

/// The simulated instant, split into independently observable parts.
#[derive(Clone, Debug)]
pub struct DateTimeBean {
    date: Leaf<Date>,
    time: Leaf<Time>,
    offset: Leaf<UtcOffset>,
}

impl DateTimeBean {
    pub fn new(when: OffsetDateTime) -> Self {
        Self {
            date: Leaf::new(when.date()),
            time: Leaf::new(when.time()),
            offset: Leaf::new(when.offset()),
        }
    }

    pub fn date(&self) -> Date {
        *self.date.get()
    }

    pub fn time(&self) -> Time {
        *self.time.get()
    }

    pub fn offset(&self) -> UtcOffset {
        *self.offset.get()
    }

    pub fn set_date(&mut self, date: Date) {
        self.date.set(date);
    }

    pub fn set_time(&mut self, time: Time) {
        self.time.set(time);
    }

    pub fn set_offset(&mut self, offset: UtcOffset) {
        self.offset.set(offset);
    }

    pub fn date_time(&self) -> OffsetDateTime {
        PrimitiveDateTime::new(self.date(), self.time()).assume_offset(self.offset())
    }

    /// Writes only the parts of `when` that differ from the current value.
    pub fn set_date_time(&mut self, when: OffsetDateTime) {
        if when.date() != self.date() {
            self.set_date(when.date());
        }
        if when.time() != self.time() {
            self.set_time(when.time());
        }
        if when.offset() != self.offset() {
            self.set_offset(when.offset());
        }
    }

    fn generations(&self) -> [u64; 3] {
        [
            self.date.generation(),
            self.time.generation(),
            self.offset.generation(),
        ]
    }
}

/// Observer position, in degrees.
#[derive(Clone, Debug)]
pub struct ObserverLocationBean {
    lon_deg: Leaf<f64>,
    lat_deg: Leaf<f64>,
}

impl ObserverLocationBean {
    pub fn new(location: GeographicCoordinates) -> Self {
        Self {
            lon_deg: Leaf::new(location.lon_deg()),
            lat_deg: Leaf::new(location.lat_deg()),
        }
    }

    pub fn lon_deg(&self) -> f64 {
        *self.lon_deg.get()
    }

    pub fn lat_deg(&self) -> f64 {
        *self.lat_deg.get()
    }

    pub fn set_lon_deg(&mut self, lon_deg: f64) -> Result<(), SkyError> {
        if !GeographicCoordinates::is_valid_lon_deg(lon_deg) {
            return Err(SkyError::invalid(format!("longitude {lon_deg} out of range")));
        }
        self.lon_deg.set(lon_deg);
        Ok(())
    }

    pub fn set_lat_deg(&mut self, lat_deg: f64) -> Result<(), SkyError> {
        if !GeographicCoordinates::is_valid_lat_deg(lat_deg) {
            return Err(SkyError::invalid(format!("latitude {lat_deg} out of range")));
        }
        self.lat_deg.set(lat_deg);
        Ok(())
    }

    pub fn coordinates(&self) -> Result<GeographicCoordinates, SkyError> {
        GeographicCoordinates::of_deg(self.lon_deg(), self.lat_deg())
    }

    pub fn set_coordinates(&mut self, location: GeographicCoordinates) {
        self.lon_deg.set(location.lon_deg());
        self.lat_deg.set(location.lat_deg());
    }

    fn generations(&self) -> [u64; 2] {
        [self.lon_deg.generation(), self.lat_deg.generation()]
    }
}

/// What the canvas looks at.
#[derive(Clone, Debug)]
pub struct ViewingParametersBean {
    center: Leaf<HorizontalCoordinates>,
    field_of_view_deg: Leaf<f64>,
}

impl ViewingParametersBean {
    pub fn new(center: HorizontalCoordinates, field_of_view_deg: f64) -> Self {
        Self {
            center: Leaf::new(center),
            field_of_view_deg: Leaf::new(field_of_view_deg),
        }
    }

    pub fn center(&self) -> HorizontalCoordinates {
        *self.center.get()
    }

    pub fn set_center(&mut self, center: HorizontalCoordinates) {
        self.center.set(center);
    }

    pub fn field_of_view_deg(&self) -> f64 {
        *self.field_of_view_deg.get()
    }

    /// Not validated here; an unusable value surfaces as a
    /// [`SkyError::Configuration`] from [`SkyCanvasManager::plane_to_canvas`].
    pub fn set_field_of_view_deg(&mut self, field_of_view_deg: f64) {
        self.field_of_view_deg.set(field_of_view_deg);
    }
}

/// Affine map from the projection plane to canvas pixels, with the y axis
/// pointing down.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneToCanvas {
    forward: Affine2<f64>,
    inverse: Affine2<f64>,
}

impl PlaneToCanvas {
    /// Scales so that the field of view spans the canvas width, and centers
    /// the plane origin.
    pub fn new(
        width: f64,
        height: f64,
        projection: &StereographicProjection,
        field_of_view_deg: f64,
    ) -> Result<Self, SkyError> {
        if !(width.is_finite() && height.is_finite() && field_of_view_deg.is_finite()) {
            return Err(SkyError::config(format!(
                "non-finite canvas parameters {width}×{height}, fov {field_of_view_deg}°"
            )));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(SkyError::config(format!("degenerate canvas {width}×{height}")));
        }
        if field_of_view_deg <= 0.0 || field_of_view_deg >= 360.0 {
            return Err(SkyError::config(format!(
                "field of view {field_of_view_deg}° outside (0°, 360°)"
            )));
        }

        let s = width / projection.apply_to_angle(angle::of_deg(field_of_view_deg));
        #[rustfmt::skip]
        let matrix = Matrix3::new(
            s, 0.0, width / 2.0,
            0.0, -s, height / 2.0,
            0.0, 0.0, 1.0,
        );
        let inverse = Affine2::from_matrix_unchecked(matrix)
            .try_inverse()
            .ok_or_else(|| SkyError::config("plane to canvas transform is singular"))?;
        Ok(Self {
            forward: Affine2::from_matrix_unchecked(matrix),
            inverse,
        })
    }

    pub fn apply(&self, plane: &PlanePoint) -> Point2<f64> {
        self.forward.transform_point(plane)
    }

    pub fn inverse_apply(&self, pixel: &Point2<f64>) -> PlanePoint {
        self.inverse.transform_point(pixel)
    }

    /// Length on the plane of a `pixels` long canvas segment.
    pub fn inverse_apply_distance(&self, pixels: f64) -> f64 {
        self.inverse
            .transform_vector(&Vector2::new(pixels, 0.0))
            .norm()
    }
}

/// Owns the observer, time and view inputs and serves every value derived
/// from them, recomputing only what an input change invalidates.
pub struct SkyCanvasManager<E = J2010Ephemeris> {
    date_time: DateTimeBean,
    observer: ObserverLocationBean,
    viewing: ViewingParametersBean,
    canvas_width: Leaf<f64>,
    canvas_height: Leaf<f64>,
    /// Canvas pixel position of the pointer, if it is over the canvas.
    pointer: Leaf<Option<Point2<f64>>>,
    catalogue: Arc<StarCatalogue>,
    ephemeris: E,

    projection: Derived<StereographicProjection, 1>,
    sky: Derived<Arc<ObservedSky>, 6>,
    transform: Derived<PlaneToCanvas, 4>,
    object_under_pointer: Derived<Option<CelestialObject>, 3>,
    pointer_horizontal: Derived<Option<HorizontalCoordinates>, 3>,
    pointer_az_deg: Derived<Option<f64>, 1>,
    pointer_alt_deg: Derived<Option<f64>, 1>,
}

impl<E: Ephemeris> SkyCanvasManager<E> {
    /// The canvas starts out empty; the plane→canvas transform and everything
    /// depending on it fail until [`SkyCanvasManager::set_canvas_size`] is
    /// called.
    pub fn new(
        catalogue: Arc<StarCatalogue>,
        ephemeris: E,
        date_time: DateTimeBean,
        observer: ObserverLocationBean,
        viewing: ViewingParametersBean,
    ) -> Self {
        Self {
            date_time,
            observer,
            viewing,
            canvas_width: Leaf::new(0.0),
            canvas_height: Leaf::new(0.0),
            pointer: Leaf::new(None),
            catalogue,
            ephemeris,
            projection: Derived::new("projection"),
            sky: Derived::new("observed sky"),
            transform: Derived::new("plane to canvas"),
            object_under_pointer: Derived::new("object under pointer"),
            pointer_horizontal: Derived::new("pointer position"),
            pointer_az_deg: Derived::new("pointer azimuth"),
            pointer_alt_deg: Derived::new("pointer altitude"),
        }
    }

    pub fn date_time(&self) -> &DateTimeBean {
        &self.date_time
    }

    pub fn date_time_mut(&mut self) -> &mut DateTimeBean {
        &mut self.date_time
    }

    pub fn observer(&self) -> &ObserverLocationBean {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut ObserverLocationBean {
        &mut self.observer
    }

    pub fn viewing(&self) -> &ViewingParametersBean {
        &self.viewing
    }

    pub fn viewing_mut(&mut self) -> &mut ViewingParametersBean {
        &mut self.viewing
    }

    pub fn catalogue(&self) -> &Arc<StarCatalogue> {
        &self.catalogue
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (*self.canvas_width.get(), *self.canvas_height.get())
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        if width != *self.canvas_width.get() {
            self.canvas_width.set(width);
        }
        if height != *self.canvas_height.get() {
            self.canvas_height.set(height);
        }
    }

    pub fn pointer(&self) -> Option<Point2<f64>> {
        *self.pointer.get()
    }

    pub fn set_pointer(&mut self, pointer: Option<Point2<f64>>) {
        self.pointer.set(pointer);
    }

    pub fn projection(&mut self) -> StereographicProjection {
        let center = &self.viewing.center;
        self.projection.get([center.generation()], || {
            StereographicProjection::new(*center.get())
        })
    }

    pub fn observed_sky(&mut self) -> Result<Arc<ObservedSky>, SkyError> {
        let projection = self.projection();
        let [date, time, offset] = self.date_time.generations();
        let [lon, lat] = self.observer.generations();
        let deps = [date, time, offset, lon, lat, self.projection.generation()];

        let (date_time, observer) = (&self.date_time, &self.observer);
        let (catalogue, ephemeris) = (&self.catalogue, &self.ephemeris);
        self.sky.try_get(deps, || {
            ObservedSky::build(
                date_time.date_time(),
                &observer.coordinates()?,
                &projection,
                Arc::clone(catalogue),
                ephemeris,
            )
            .map(Arc::new)
        })
    }

    pub fn plane_to_canvas(&mut self) -> Result<PlaneToCanvas, SkyError> {
        let projection = self.projection();
        let deps = [
            self.canvas_width.generation(),
            self.canvas_height.generation(),
            self.viewing.field_of_view_deg.generation(),
            self.projection.generation(),
        ];
        let (width, height) = self.canvas_size();
        let fov = self.viewing.field_of_view_deg();
        self.transform
            .try_get(deps, || PlaneToCanvas::new(width, height, &projection, fov))
    }

    /// Object nearest the pointer, within [`PICKING_RADIUS_PX`].
    pub fn object_under_pointer(&mut self) -> Result<Option<CelestialObject>, SkyError> {
        let sky = self.observed_sky()?;
        let transform = self.plane_to_canvas()?;
        let deps = [
            self.sky.generation(),
            self.pointer.generation(),
            self.transform.generation(),
        ];
        let pointer = self.pointer();
        self.object_under_pointer.try_get(deps, || {
            Ok(pointer.and_then(|pixel| {
                sky.object_closest_to(
                    &transform.inverse_apply(&pixel),
                    transform.inverse_apply_distance(PICKING_RADIUS_PX),
                )
                .cloned()
            }))
        })
    }

    /// Sky position under the pointer.
    pub fn pointer_horizontal(&mut self) -> Result<Option<HorizontalCoordinates>, SkyError> {
        let projection = self.projection();
        let transform = self.plane_to_canvas()?;
        let deps = [
            self.transform.generation(),
            self.projection.generation(),
            self.pointer.generation(),
        ];
        let pointer = self.pointer();
        self.pointer_horizontal.try_get(deps, || {
            Ok(pointer.map(|pixel| projection.inverse_apply(&transform.inverse_apply(&pixel))))
        })
    }

    pub fn pointer_az_deg(&mut self) -> Result<Option<f64>, SkyError> {
        let hor = self.pointer_horizontal()?;
        let deps = [self.pointer_horizontal.generation()];
        Ok(self
            .pointer_az_deg
            .get(deps, || hor.map(|h| h.az_deg())))
    }

    pub fn pointer_alt_deg(&mut self) -> Result<Option<f64>, SkyError> {
        let hor = self.pointer_horizontal()?;
        let deps = [self.pointer_horizontal.generation()];
        Ok(self
            .pointer_alt_deg
            .get(deps, || hor.map(|h| h.alt_deg())))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use time::{macros::datetime, Duration};

    use super::*;
    use crate::catalogue::StarCatalogueBuilder;

    fn manager() -> SkyCanvasManager {
        let mut builder = StarCatalogueBuilder::new();
        builder.add_star(
            CelestialObject::star(
                32349,
                "Sirius",
                crate::coordinates::EquatorialCoordinates::of_deg(101.2872, -16.7161).unwrap(),
                -1.46,
                0.0,
            )
            .unwrap(),
        );
        let mut manager = SkyCanvasManager::new(
            Arc::new(builder.build().unwrap()),
            J2010Ephemeris,
            DateTimeBean::new(datetime!(2020-04-17 21:00 +2)),
            ObserverLocationBean::new(GeographicCoordinates::of_deg(6.57, 46.52).unwrap()),
            ViewingParametersBean::new(
                HorizontalCoordinates::of_deg(180.000_000_000_001, 15.0).unwrap(),
                100.0,
            ),
        );
        manager.set_canvas_size(800.0, 600.0);
        manager
    }

    #[test]
    fn reads_are_cached() {
        let mut m = manager();
        let a = m.observed_sky().unwrap();
        let b = m.observed_sky().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(m.sky.generation(), 1);
    }

    #[test]
    fn fov_change_does_not_rebuild_sky() {
        let mut m = manager();
        m.observed_sky().unwrap();
        m.plane_to_canvas().unwrap();

        m.viewing_mut().set_field_of_view_deg(60.0);
        m.observed_sky().unwrap();
        m.plane_to_canvas().unwrap();
        assert_eq!(m.sky.generation(), 1);
        assert_eq!(m.transform.generation(), 2);
    }

    #[test]
    fn time_change_does_not_rebuild_projection() {
        let mut m = manager();
        let before = m.observed_sky().unwrap();
        let t = m.date_time().date_time();
        m.date_time_mut().set_date_time(t + Duration::hours(1));
        let after = m.observed_sky().unwrap();
        assert_eq!(m.projection.generation(), 1);
        assert_eq!(m.sky.generation(), 2);
        assert_ne!(before.sun_position(), after.sun_position());
    }

    #[test]
    fn center_change_rebuilds_projection_and_sky() {
        let mut m = manager();
        m.observed_sky().unwrap();
        m.viewing_mut()
            .set_center(HorizontalCoordinates::of_deg(90.0, 30.0).unwrap());
        m.observed_sky().unwrap();
        assert_eq!(m.projection.generation(), 2);
        assert_eq!(m.sky.generation(), 2);
    }

    #[test]
    fn transform_centers_the_plane() {
        let mut m = manager();
        let t = m.plane_to_canvas().unwrap();
        let origin = t.apply(&PlanePoint::origin());
        assert_relative_eq!(origin.x, 400.0);
        assert_relative_eq!(origin.y, 300.0);

        // The field of view spans the whole width.
        let half_fov = m.projection().apply_to_angle(angle::of_deg(100.0)) / 2.0;
        assert_relative_eq!(t.apply(&Point2::new(half_fov, 0.0)).x, 800.0, epsilon = 1e-9);
        assert!(t.apply(&Point2::new(0.0, 0.1)).y < 300.0);

        let back = t.inverse_apply(&Point2::new(123.0, 456.0));
        assert_relative_eq!(t.apply(&back).x, 123.0, epsilon = 1e-9);
        assert_relative_eq!(t.apply(&back).y, 456.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_canvas_keeps_last_transform() {
        let mut m = manager();
        let good = m.plane_to_canvas().unwrap();

        m.set_canvas_size(0.0, 600.0);
        assert!(matches!(m.plane_to_canvas(), Err(SkyError::Configuration(_))));
        assert_eq!(m.transform.cached.as_ref(), Some(&good));

        m.set_canvas_size(800.0, 600.0);
        m.viewing_mut().set_field_of_view_deg(360.0);
        assert!(m.plane_to_canvas().is_err());
        m.viewing_mut().set_field_of_view_deg(f64::NAN);
        assert!(m.plane_to_canvas().is_err());

        m.viewing_mut().set_field_of_view_deg(100.0);
        assert_eq!(m.plane_to_canvas().unwrap(), good);
    }

    #[test]
    fn observer_change_rebuilds_sky_only() {
        let mut m = manager();
        let before = m.observed_sky().unwrap();
        m.plane_to_canvas().unwrap();

        m.observer_mut().set_lat_deg(-30.0).unwrap();
        let after = m.observed_sky().unwrap();
        m.plane_to_canvas().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(m.sky.generation(), 2);
        assert_eq!(m.projection.generation(), 1);
        assert_eq!(m.transform.generation(), 1);
        assert_ne!(before.sun_position(), after.sun_position());
    }

    #[test]
    fn transform_tracks_the_projection() {
        let mut m = manager();
        m.plane_to_canvas().unwrap();
        m.plane_to_canvas().unwrap();
        assert_eq!(m.transform.generation(), 1);

        m.viewing_mut()
            .set_center(HorizontalCoordinates::of_deg(90.0, 30.0).unwrap());
        m.plane_to_canvas().unwrap();
        assert_eq!(m.projection.generation(), 2);
        assert_eq!(m.transform.generation(), 2);
    }

    #[test]
    fn invalid_location_is_rejected_by_bean() {
        let mut m = manager();
        assert!(m.observer_mut().set_lat_deg(91.0).is_err());
        assert!(m.observer_mut().set_lon_deg(180.0).is_err());
        assert_relative_eq!(m.observer().lat_deg(), 46.52);
    }

    #[test]
    fn pointer_picks_the_sun() {
        let mut m = manager();
        let sky = m.observed_sky().unwrap();
        let transform = m.plane_to_canvas().unwrap();
        let pixel = transform.apply(&sky.sun_position());

        assert_eq!(m.object_under_pointer().unwrap(), None);
        m.set_pointer(Some(pixel));
        let picked = m.object_under_pointer().unwrap();
        assert_eq!(picked.as_ref().map(CelestialObject::name), Some("Sun"));

        m.set_pointer(Some(pixel + Vector2::new(0.0, PICKING_RADIUS_PX + 1.0)));
        let picked = m.object_under_pointer().unwrap();
        assert_ne!(picked.as_ref().map(CelestialObject::name), Some("Sun"));
    }

    #[test]
    fn pointer_horizontal_position() {
        let mut m = manager();
        assert_eq!(m.pointer_az_deg().unwrap(), None);

        m.set_pointer(Some(Point2::new(400.0, 300.0)));
        assert_relative_eq!(m.pointer_az_deg().unwrap().unwrap(), 180.0, epsilon = 1e-9);
        assert_relative_eq!(m.pointer_alt_deg().unwrap().unwrap(), 15.0, epsilon = 1e-9);

        // Above the center of the canvas is higher in the sky.
        m.set_pointer(Some(Point2::new(400.0, 100.0)));
        assert!(m.pointer_alt_deg().unwrap().unwrap() > 15.0);
        assert_eq!(m.sky.generation(), 0);
    }

    #[test]
    fn date_time_bean_writes_changed_parts_only() {
        let mut bean = DateTimeBean::new(datetime!(2020-04-17 21:00 +2));
        bean.set_date_time(datetime!(2020-04-17 22:30 +2));
        assert_eq!(bean.generations(), [0, 1, 0]);
        assert_eq!(bean.date_time(), datetime!(2020-04-17 22:30 +2));
    }
}
