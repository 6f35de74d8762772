//! Ocean boundary conditions for ice-sheet models.
//!
//! A base model (`constant`, `pik`, `given`, `th`) computes shelf-base
//! temperature, shelf-base mass flux, sea level and melange back pressure.
//! Modifiers wrap a model and adjust one or more of its outputs from forcing
//! data. [`OceanFactory`] builds such a chain from a description like
//! `"given,delta_T,frac_mass_flux"`.

pub use oceanbc_components::models::{ConstantOcean, GivenOcean, GivenThOcean, PikOcean};
pub use oceanbc_components::modifiers::{Anomaly, Cache, ModifierKind, ScalarModifier};
pub use oceanbc_components::OceanFactory;
pub use oceanbc_core::config::OceanConfig;
pub use oceanbc_core::dataset::{Dataset, ForcingReader};
pub use oceanbc_core::errors::{OceanError, OceanResult};
pub use oceanbc_core::field::{Ghosts, ScalarField};
pub use oceanbc_core::grid::{Grid, GridParameters, ICE_THICKNESS};
pub use oceanbc_core::model::{MaxTimestep, OceanModel, OceanOutputs};

#[cfg(feature = "python")]
mod python;
