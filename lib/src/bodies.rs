//! Definitions of observable celestial objects.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    coordinates::{EclipticCoordinates, EquatorialCoordinates},
    SkyError,
};

/// Variant-specific data of a [`CelestialObject`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Sun {
        ecliptic_pos: EclipticCoordinates,
        /// Mean anomaly (rad)
        mean_anomaly: f64,
    },
    Moon {
        /// Illuminated fraction, in `[0, 1]`
        phase: f64,
    },
    Planet,
    Star {
        /// Hipparcos catalogue number
        hipparcos_id: i32,
        /// B−V color index
        color_index: f64,
    },
}

/// A body visible from the observer, at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialObject {
    name: Arc<str>,
    equatorial_pos: EquatorialCoordinates,
    /// Angular diameter (rad)
    angular_size: f64,
    /// Apparent magnitude
    magnitude: f64,
    kind: ObjectKind,
}

impl CelestialObject {
    pub fn new(
        name: impl Into<Arc<str>>,
        equatorial_pos: EquatorialCoordinates,
        angular_size: f64,
        magnitude: f64,
        kind: ObjectKind,
    ) -> Result<Self, SkyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SkyError::invalid("celestial object name is empty"));
        }
        if !(angular_size >= 0.0 && angular_size.is_finite()) {
            return Err(SkyError::invalid(format!(
                "angular size of {name} is {angular_size}"
            )));
        }
        match kind {
            ObjectKind::Moon { phase } if !(0.0..=1.0).contains(&phase) => {
                return Err(SkyError::invalid(format!("moon phase {phase} outside [0, 1]")));
            }
            ObjectKind::Star { color_index, .. } if !(-0.5..=5.5).contains(&color_index) => {
                return Err(SkyError::invalid(format!(
                    "color index of {name} is {color_index}"
                )));
            }
            _ => {}
        }
        Ok(Self {
            name,
            equatorial_pos,
            angular_size,
            magnitude,
            kind,
        })
    }

    /// Shorthand for a star, which has no angular size.
    pub fn star(
        hipparcos_id: i32,
        name: impl Into<Arc<str>>,
        equatorial_pos: EquatorialCoordinates,
        magnitude: f64,
        color_index: f64,
    ) -> Result<Self, SkyError> {
        Self::new(
            name,
            equatorial_pos,
            0.0,
            magnitude,
            ObjectKind::Star {
                hipparcos_id,
                color_index,
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn equatorial_pos(&self) -> EquatorialCoordinates {
        self.equatorial_pos
    }

    pub fn angular_size(&self) -> f64 {
        self.angular_size
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn hipparcos_id(&self) -> Option<i32> {
        match self.kind {
            ObjectKind::Star { hipparcos_id, .. } => Some(hipparcos_id),
            _ => None,
        }
    }

    /// Approximate color temperature of a star (K), from its B−V index.
    pub fn color_temperature(&self) -> Option<f64> {
        match self.kind {
            ObjectKind::Star { color_index, .. } => {
                let c = 0.92 * color_index;
                Some(4600.0 * (1.0 / (c + 1.7) + 1.0 / (c + 0.62)))
            }
            _ => None,
        }
    }

    /// Short description shown to the user.
    pub fn info(&self) -> String {
        match self.kind {
            ObjectKind::Moon { phase } => format!("{} ({:.1}%)", self.name, phase * 100.0),
            ObjectKind::Sun { .. } | ObjectKind::Planet | ObjectKind::Star { .. } => {
                self.name.to_string()
            }
        }
    }
}

impl fmt::Display for CelestialObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info())
    }
}
