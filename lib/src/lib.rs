#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::doc_markdown
)]
pub mod animation;
pub mod bodies;
pub mod canvas;
pub mod catalogue;
pub mod conversions;
pub mod coordinates;
pub mod ephemeris;
pub mod error;
pub mod projection;
pub mod sky;
pub mod time;

pub use error::SkyError;
