//! The star catalogue and its asterisms.
use std::{collections::HashMap, io::Read, sync::Arc};

use color_eyre::eyre::{self, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{bodies::CelestialObject, coordinates::EquatorialCoordinates, SkyError};

/// A named group of stars, listed by Hipparcos number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asterism {
    pub name: Arc<str>,
    pub stars: Arc<[i32]>,
}

/// Read-only collection of stars and asterisms.
///
/// The position of a star in [`StarCatalogue::stars`] is its index; asterism
/// index lists refer to those positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StarCatalogue {
    stars: Vec<CelestialObject>,
    asterisms: Vec<Asterism>,
    indices: Vec<Arc<[usize]>>,
}

impl StarCatalogue {
    pub fn new(stars: Vec<CelestialObject>, asterisms: Vec<Asterism>) -> Result<Self, SkyError> {
        let mut by_hip = HashMap::with_capacity(stars.len());
        for (i, star) in stars.iter().enumerate() {
            let hip = star.hipparcos_id().ok_or_else(|| {
                SkyError::invalid(format!("{} is not a star", star.name()))
            })?;
            by_hip.entry(hip).or_insert(i);
        }

        let indices = asterisms
            .iter()
            .map(|asterism| {
                asterism
                    .stars
                    .iter()
                    .map(|hip| {
                        by_hip.get(hip).copied().ok_or_else(|| {
                            SkyError::invalid(format!(
                                "asterism {} references unknown star HIP {hip}",
                                asterism.name
                            ))
                        })
                    })
                    .collect::<Result<Arc<[usize]>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        trace!(stars = stars.len(), asterisms = asterisms.len(), "built star catalogue");
        Ok(Self {
            stars,
            asterisms,
            indices,
        })
    }

    pub fn stars(&self) -> &[CelestialObject] {
        &self.stars
    }

    pub fn asterisms(&self) -> &[Asterism] {
        &self.asterisms
    }

    /// Catalogue indices of the stars of `asterism`, in asterism order, or
    /// `None` if the asterism is not part of this catalogue.
    pub fn asterism_indices(&self, asterism: &Asterism) -> Option<&[usize]> {
        self.asterisms
            .iter()
            .position(|a| a == asterism)
            .map(|i| &*self.indices[i])
    }
}

/// Accumulates stars and asterisms from one or more sources.
#[derive(Debug, Default)]
pub struct StarCatalogueBuilder {
    stars: Vec<CelestialObject>,
    asterisms: Vec<Asterism>,
}

impl StarCatalogueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_star(&mut self, star: CelestialObject) -> &mut Self {
        self.stars.push(star);
        self
    }

    pub fn add_asterism(&mut self, asterism: Asterism) -> &mut Self {
        self.asterisms.push(asterism);
        self
    }

    pub fn stars(&self) -> &[CelestialObject] {
        &self.stars
    }

    pub fn asterisms(&self) -> &[Asterism] {
        &self.asterisms
    }

    pub fn load_from<R: Read>(
        &mut self,
        mut input: R,
        loader: &impl CatalogueLoader,
    ) -> eyre::Result<&mut Self> {
        loader.load(&mut input, self)?;
        Ok(self)
    }

    pub fn build(self) -> Result<StarCatalogue, SkyError> {
        StarCatalogue::new(self.stars, self.asterisms)
    }
}

/// Parses a catalogue source into a builder.
pub trait CatalogueLoader {
    fn load(&self, input: &mut dyn Read, builder: &mut StarCatalogueBuilder) -> eyre::Result<()>;
}

/// On-disk description of a catalogue.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogueDocument {
    #[serde(default)]
    pub stars: Vec<StarRecord>,
    #[serde(default)]
    pub asterisms: Vec<Asterism>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StarRecord {
    pub hip: i32,
    #[serde(default)]
    pub name: Option<String>,
    pub ra_deg: f64,
    pub dec_deg: f64,
    #[serde(default)]
    pub magnitude: f64,
    #[serde(default)]
    pub color_index: f64,
}

impl StarRecord {
    pub fn into_star(self) -> Result<CelestialObject, SkyError> {
        let name = self.name.filter(|n| !n.is_empty());
        CelestialObject::star(
            self.hip,
            name.as_deref().unwrap_or("?"),
            EquatorialCoordinates::of_deg(self.ra_deg, self.dec_deg)?,
            self.magnitude,
            self.color_index,
        )
    }
}

/// Loads a [`CatalogueDocument`] written in RON.
#[derive(Copy, Clone, Debug, Default)]
pub struct RonCatalogueLoader;

impl CatalogueLoader for RonCatalogueLoader {
    fn load(&self, input: &mut dyn Read, builder: &mut StarCatalogueBuilder) -> eyre::Result<()> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        let doc: CatalogueDocument =
            ron::from_str(&text).wrap_err("malformed catalogue document")?;

        for record in doc.stars {
            let hip = record.hip;
            let star = record
                .into_star()
                .wrap_err_with(|| format!("invalid star HIP {hip}"))?;
            builder.add_star(star);
        }
        for asterism in doc.asterisms {
            builder.add_asterism(asterism);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORION: &str = r#"(
        stars: [
            (hip: 27989, name: Some("Betelgeuse"), ra_deg: 88.7929, dec_deg: 7.4071,
                magnitude: 0.45, color_index: 1.5),
            (hip: 24436, name: Some("Rigel"), ra_deg: 78.6345, dec_deg: -8.2016,
                magnitude: 0.18, color_index: -0.03),
            (hip: 25336, ra_deg: 81.2828, dec_deg: 6.3497, magnitude: 1.64, color_index: -0.22),
        ],
        asterisms: [
            (name: "Orion", stars: [24436, 27989, 25336]),
        ],
    )"#;

    fn orion() -> StarCatalogue {
        let mut builder = StarCatalogueBuilder::new();
        builder
            .load_from(ORION.as_bytes(), &RonCatalogueLoader)
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn loads_in_catalogue_order() {
        let cat = orion();
        let names = cat.stars().iter().map(CelestialObject::name).collect::<Vec<_>>();
        assert_eq!(names, ["Betelgeuse", "Rigel", "?"]);
    }

    #[test]
    fn asterism_indices_follow_asterism_order() {
        let cat = orion();
        let orion = cat.asterisms()[0].clone();
        assert_eq!(cat.asterism_indices(&orion), Some(&[1, 0, 2][..]));
        let unknown = Asterism {
            name: "Nope".into(),
            stars: Arc::from([24436]),
        };
        assert_eq!(cat.asterism_indices(&unknown), None);
    }

    #[test]
    fn rejects_dangling_asterism() {
        let mut builder = StarCatalogueBuilder::new();
        builder.add_asterism(Asterism {
            name: "Ghost".into(),
            stars: Arc::from([1, 2]),
        });
        assert!(matches!(builder.build(), Err(SkyError::InvalidInput(_))));
    }

    #[test]
    fn rejects_malformed_document() {
        let mut builder = StarCatalogueBuilder::new();
        let err = builder
            .load_from("(stars: [(hip: 1)])".as_bytes(), &RonCatalogueLoader)
            .unwrap_err();
        assert!(format!("{err:#}").contains("malformed catalogue document"));
    }
}
