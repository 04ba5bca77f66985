//! Astronomical epochs and sidereal time.
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{macros::datetime, Duration, OffsetDateTime, UtcOffset};

use crate::coordinates::{angle, GeographicCoordinates};

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Reference instants used by the motion models.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Epoch {
    /// 2000-01-01 12:00 UTC.
    J2000,
    /// 2010-01-01 00:00 UTC minus one day, i.e. 2009-12-31 00:00 UTC.
    J2010,
}

impl Epoch {
    pub fn instant(self) -> OffsetDateTime {
        match self {
            Epoch::J2000 => datetime!(2000-01-01 12:00 UTC),
            Epoch::J2010 => datetime!(2009-12-31 00:00 UTC),
        }
    }

    /// Number of (fractional) days from this epoch to `when`.
    pub fn days_until(self, when: OffsetDateTime) -> f64 {
        (when - self.instant()).as_seconds_f64() / SECONDS_PER_DAY
    }

    /// Number of (fractional) Julian centuries from this epoch to `when`.
    pub fn julian_centuries_until(self, when: OffsetDateTime) -> f64 {
        self.days_until(when) / DAYS_PER_JULIAN_CENTURY
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Epoch::J2000 => write!(f, "J2000"),
            Epoch::J2010 => write!(f, "J2010"),
        }
    }
}

/// Greenwich sidereal time at `when`, in radians normalized to `[0, τ)`.
pub fn greenwich_sidereal_time(when: OffsetDateTime) -> f64 {
    let utc = when.to_offset(UtcOffset::UTC);
    let day_start = utc.replace_time(time::Time::MIDNIGHT);

    let t = Epoch::J2000.julian_centuries_until(day_start);
    let hours = (utc - day_start).as_seconds_f64() / 3600.0;

    let s0 = 0.000_025_862 * t * t + 2400.051_336 * t + 6.697_374_558;
    let s1 = 1.002_737_909 * hours;
    angle::normalize_positive(angle::of_hr(s0 + s1))
}

/// Local sidereal time at `when` for an observer at `location`, in radians
/// normalized to `[0, τ)`.
pub fn local_sidereal_time(when: OffsetDateTime, location: &GeographicCoordinates) -> f64 {
    angle::normalize_positive(greenwich_sidereal_time(when) + location.lon())
}

/// Builds a duration from a signed nanosecond count, or `None` if the whole
/// seconds do not fit a [`Duration`].
pub fn duration_from_nanos(nanos: i128) -> Option<Duration> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok()?;
    let subsec = i32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok()?;
    Some(Duration::new(secs, subsec))
}
