use std::path::{Path, PathBuf};

use color_eyre::eyre::{self, eyre, OptionExt, WrapErr};
use serde::{Deserialize, Serialize};
use skyview::{
    animation::NamedTimeAccelerator,
    coordinates::{GeographicCoordinates, HorizontalCoordinates},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::i18n_args;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub observer: ObserverConfig,
    pub view: ViewConfig,
    pub canvas: CanvasConfig,
    /// RON star catalogue. Relative paths are resolved against the directory
    /// of the configuration file.
    pub catalogue: Option<PathBuf>,
    /// RFC 3339 instant to start from; the current time if absent.
    pub start: Option<String>,
    pub accelerator: NamedTimeAccelerator,
    pub frames: u32,
    pub frame_rate: u32,
    /// Pointer position in canvas pixels.
    pub pointer: Option<[f64; 2]>,
    pub cities: Vec<City>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            observer: ObserverConfig::default(),
            view: ViewConfig::default(),
            canvas: CanvasConfig::default(),
            catalogue: None,
            start: None,
            accelerator: NamedTimeAccelerator::Times300,
            frames: 120,
            frame_rate: 60,
            pointer: None,
            cities: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Takes precedence over the coordinates when set.
    pub city: Option<String>,
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            city: None,
            lon_deg: 6.57,
            lat_deg: 46.52,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub center_az_deg: f64,
    pub center_alt_deg: f64,
    pub field_of_view_deg: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center_az_deg: 180.000_000_000_001,
            center_alt_deg: 15.0,
            field_of_view_deg: 100.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl Config {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("could not read {}", path.display()))?;
        let mut config: Config =
            toml::from_str(&text).wrap_err_with(|| format!("malformed {}", path.display()))?;
        if let (Some(catalogue), Some(dir)) = (&config.catalogue, path.parent()) {
            config.catalogue = Some(dir.join(catalogue));
        }
        Ok(config)
    }

    pub fn observer_location(&self) -> eyre::Result<GeographicCoordinates> {
        let (lon_deg, lat_deg) = match &self.observer.city {
            Some(name) => {
                let city = self
                    .cities
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(name))
                    .ok_or_eyre(i18n_args!("error-unknown-city", "city", name.as_str()))?;
                (city.lon_deg, city.lat_deg)
            }
            None => (self.observer.lon_deg, self.observer.lat_deg),
        };
        Ok(GeographicCoordinates::of_deg(lon_deg, lat_deg)?)
    }

    pub fn view_center(&self) -> eyre::Result<HorizontalCoordinates> {
        Ok(HorizontalCoordinates::of_deg(
            self.view.center_az_deg,
            self.view.center_alt_deg,
        )?)
    }

    pub fn start_instant(&self) -> eyre::Result<OffsetDateTime> {
        match &self.start {
            Some(s) => OffsetDateTime::parse(s, &Rfc3339)
                .map_err(|e| eyre!("invalid start instant {s:?}: {e}")),
            None => Ok(OffsetDateTime::now_utc()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.accelerator, NamedTimeAccelerator::Times300);
        let location = config.observer_location().unwrap();
        assert!((location.lon_deg() - 6.57).abs() < 1e-9);
        assert!((config.view_center().unwrap().alt_deg() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn observer_from_city() {
        let config: Config = toml::from_str(
            r#"
            accelerator = "sidereal-day"

            [observer]
            city = "zurich"

            [[cities]]
            name = "Zurich"
            country = "Switzerland"
            lon_deg = 8.5476
            lat_deg = 47.3763
            "#,
        )
        .unwrap();
        assert_eq!(config.accelerator, NamedTimeAccelerator::SiderealDay);
        let location = config.observer_location().unwrap();
        assert!((location.lat_deg() - 47.3763).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_observer() {
        let config: Config = toml::from_str("[observer]\nlat_deg = 95.0").unwrap();
        assert!(config.observer_location().is_err());
    }
}
