#![warn(clippy::unwrap_used, clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::doc_markdown
)]
use std::{path::PathBuf, sync::Arc};

use color_eyre::eyre::{self, WrapErr};
use config::Config;
use itertools::Itertools;
use nalgebra::Point2;
use skyview::{
    animation::TimeAnimator,
    bodies::CelestialObject,
    canvas::{DateTimeBean, ObserverLocationBean, SkyCanvasManager, ViewingParametersBean},
    catalogue::{RonCatalogueLoader, StarCatalogue, StarCatalogueBuilder},
    ephemeris::J2010Ephemeris,
};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use unic_langid::LanguageIdentifier;

mod config;

fluent_templates::static_loader! {
    static LOCALES = {
        locales: "src/locales",
        fallback_language: "en-US",
    };
}

const US_ENGLISH: LanguageIdentifier = unic_langid::langid!("en-US");

#[macro_export]
macro_rules! i18n {
    ($v:expr) => {{
        use ::fluent_templates::Loader;
        $crate::LOCALES.lookup(&$crate::US_ENGLISH, $v)
    }};
}

#[macro_export]
macro_rules! i18n_args {
    ($v:expr, $($arg:expr, $val:expr),*) => {{
        use ::fluent_templates::Loader;
        let mut args = ::std::collections::HashMap::new();
        $(
            args.insert(::std::string::String::from($arg), ::fluent::FluentValue::from($val));
        )*
        $crate::LOCALES.lookup_with_args(&$crate::US_ENGLISH, $v, &args)
    }};
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("{}", i18n_args!("log-config-loaded", "path", path.display().to_string()));
            Config::load(&path)?
        }
        None => {
            info!("{}", i18n!("log-default-config"));
            Config::default()
        }
    };

    let catalogue = Arc::new(load_catalogue(&config)?);
    let mut manager = SkyCanvasManager::new(
        catalogue,
        J2010Ephemeris,
        DateTimeBean::new(config.start_instant()?),
        ObserverLocationBean::new(config.observer_location()?),
        ViewingParametersBean::new(config.view_center()?, config.view.field_of_view_deg),
    );
    manager.set_canvas_size(config.canvas.width, config.canvas.height);
    manager.set_pointer(config.pointer.map(|[x, y]| Point2::new(x, y)));

    let sky = manager.observed_sky()?;
    info!(
        "{}",
        i18n_args!(
            "log-planets",
            "planets",
            sky.planets().iter().map(CelestialObject::name).join(", ")
        )
    );

    let mut animator = TimeAnimator::new(config.accelerator.accelerator())?;
    info!(
        "{}",
        i18n_args!("log-animation-start", "accelerator", config.accelerator.name())
    );
    animator.start(manager.date_time());

    let frame_rate = config.frame_rate.max(1);
    let frame_nanos = 1_000_000_000 / i64::from(frame_rate);
    for frame in 0..=i64::from(config.frames) {
        animator.tick(frame * frame_nanos, manager.date_time_mut())?;
        let report = report_frame(&mut manager);
        match report {
            Ok(lines) if frame % i64::from(frame_rate) == 0 => {
                for line in lines {
                    info!("{line}");
                }
            }
            Ok(lines) => debug!("{}", lines.join(" | ")),
            Err(e) => error!("{:#}", e),
        }
    }
    animator.stop();

    info!("{}", i18n_args!("log-done", "frames", config.frames));
    Ok(())
}

fn load_catalogue(config: &Config) -> eyre::Result<StarCatalogue> {
    let mut builder = StarCatalogueBuilder::new();
    match &config.catalogue {
        Some(path) => {
            let file = std::fs::File::open(path)
                .wrap_err_with(|| format!("could not open {}", path.display()))?;
            builder.load_from(std::io::BufReader::new(file), &RonCatalogueLoader)?;
        }
        None => info!("{}", i18n!("log-no-catalogue")),
    }
    let catalogue = builder.build()?;
    info!(
        "{}",
        i18n_args!(
            "log-catalogue-loaded",
            "stars",
            catalogue.stars().len(),
            "asterisms",
            catalogue.asterisms().len()
        )
    );
    Ok(catalogue)
}

/// The info bar lines for the current frame.
fn report_frame(manager: &mut SkyCanvasManager) -> eyre::Result<Vec<String>> {
    let date = manager.date_time().date_time();
    let mut lines = vec![i18n_args!("frame-date", "date", date.to_string())];

    lines.push(match manager.object_under_pointer()? {
        Some(object) => i18n_args!("pointer-object", "object", object.info()),
        None => i18n!("pointer-nothing"),
    });

    lines.push(
        match (manager.pointer_az_deg()?, manager.pointer_alt_deg()?) {
            (Some(az), Some(alt)) => i18n_args!(
                "pointer-position",
                "az",
                format!("{az:.2}"),
                "alt",
                format!("{alt:.2}")
            ),
            _ => i18n!("pointer-outside"),
        },
    );
    Ok(lines)
}
