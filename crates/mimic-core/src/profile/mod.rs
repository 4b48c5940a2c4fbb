//! Persona profile: facets, defaults and normalization.

pub mod model;
mod normalize;

pub use model::*;
pub use normalize::{clamp_score, facet_from_value};
