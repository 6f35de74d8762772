//! Modifiers wrap another model and adjust some of its outputs.
//!
//! A modifier forwards `init` and `update` to the model it wraps, then builds
//! its own outputs from the wrapped model's current outputs. Stacking
//! modifiers applies them from the innermost outwards: wrapping a model in
//! `delta_mass_flux` and then in `frac_mass_flux` scales the offset flux.

mod anomaly;
mod cache;
mod scalar;

pub use anomaly::{Anomaly, SHELF_BASE_MASS_FLUX_ANOMALY, SHELF_BASE_TEMPERATURE_ANOMALY};
pub use cache::Cache;
pub use scalar::{ModifierKind, ScalarModifier};
