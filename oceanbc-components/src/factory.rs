//! Build a model chain from a comma-separated description such as
//! `"given,delta_T,frac_mass_flux"`.
//!
//! The first name is the base model; the remaining names are modifiers applied
//! from left to right, so the leftmost modifier wraps the base model directly
//! and the rightmost one is the outermost object handed to the driver.

use crate::models::{ConstantOcean, GivenOcean, GivenThOcean, PikOcean};
use crate::modifiers::{Anomaly, Cache, ModifierKind, ScalarModifier};
use oceanbc_core::config::OceanConfig;
use oceanbc_core::errors::{OceanError, OceanResult};
use oceanbc_core::grid::Grid;
use oceanbc_core::model::OceanModel;
use std::sync::Arc;
use tracing::info;

pub const BASE_MODELS: [&str; 5] = ["constant", "pik", "given", "th", "given_th"];
pub const MODIFIERS: [&str; 7] = [
    "delta_T",
    "delta_SL",
    "delta_mass_flux",
    "frac_MBP",
    "frac_mass_flux",
    "anomaly",
    "cache",
];

#[derive(Debug, Clone)]
pub struct OceanFactory {
    grid: Arc<Grid>,
    config: Arc<OceanConfig>,
}

impl OceanFactory {
    pub fn new(grid: Arc<Grid>, config: Arc<OceanConfig>) -> Self {
        Self { grid, config }
    }

    /// Create the base model called `name`.
    pub fn base(&self, name: &str) -> OceanResult<Box<dyn OceanModel>> {
        let (grid, config) = (self.grid.clone(), self.config.clone());
        let model: Box<dyn OceanModel> = match name {
            "constant" => Box::new(ConstantOcean::new(grid, config)),
            "pik" => Box::new(PikOcean::new(grid, config)),
            "given" => Box::new(GivenOcean::new(grid, config)),
            "th" | "given_th" => Box::new(GivenThOcean::new(grid, config)),
            _ => {
                return Err(OceanError::InvalidConfiguration(format!(
                    "unknown ocean model '{name}' (expected one of {})",
                    BASE_MODELS.join(", ")
                )))
            }
        };
        Ok(model)
    }

    /// Wrap `input` in the modifier called `name`.
    pub fn wrap(&self, name: &str, input: Box<dyn OceanModel>) -> OceanResult<Box<dyn OceanModel>> {
        if let Some(kind) = ModifierKind::from_name(name) {
            return Ok(Box::new(ScalarModifier::new(kind, input, &self.config)));
        }
        match name {
            "anomaly" => Ok(Box::new(Anomaly::new(self.grid.clone(), input, &self.config))),
            "cache" => Ok(Box::new(Cache::new(input, &self.config)?)),
            _ => Err(OceanError::InvalidConfiguration(format!(
                "unknown ocean modifier '{name}' (expected one of {})",
                MODIFIERS.join(", ")
            ))),
        }
    }

    /// Build the chain described by `description`.
    pub fn create(&self, description: &str) -> OceanResult<Box<dyn OceanModel>> {
        let mut names = description.split(',').map(str::trim);
        let base = names
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| OceanError::InvalidConfiguration("empty ocean model description".to_string()))?;

        let mut model = self.base(base)?;
        for name in names {
            model = self.wrap(name, model)?;
        }
        info!(description, "created ocean model chain");
        Ok(model)
    }
}
