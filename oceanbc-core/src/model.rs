//! The contract shared by ocean models and the modifiers that wrap them.
//!
//! Every model reports four boundary conditions for the ice sheet:
//!
//! | Quantity | Units | Accessor |
//! |----------|-------|----------|
//! | shelf base temperature | K | [`OceanModel::shelf_base_temperature`] |
//! | shelf base mass flux (positive = melting) | kg m-2 s-1 | [`OceanModel::shelf_base_mass_flux`] |
//! | sea level elevation | m | [`OceanModel::sea_level_elevation`] |
//! | melange back-pressure fraction | 1 | [`OceanModel::melange_back_pressure_fraction`] |
//!
//! A model goes through `Uninitialized → Ready → Updated`. [`Lifecycle`] holds
//! that state machine together with the outputs of the last successful update,
//! so that implementations only compute new outputs and hand them over.

use crate::dataset::{Dataset, VariableData};
use crate::errors::{OceanError, OceanResult};
use crate::field::{Ghosts, ScalarField};
use crate::grid::Grid;
use crate::timeseries::{FloatValue, Time};
use std::fmt::{self, Debug};

pub const SHELF_BASE_TEMPERATURE: &str = "shelfbtemp";
pub const SHELF_BASE_MASS_FLUX: &str = "shelfbmassflux";
pub const MELANGE_BACK_PRESSURE_FRACTION: &str = "melange_back_pressure_fraction";
pub const SEA_LEVEL_ELEVATION: &str = "sea_level";

/// The boundary conditions produced by one update.
#[derive(Debug, Clone, PartialEq)]
pub struct OceanOutputs {
    pub shelf_base_temperature: ScalarField,
    pub shelf_base_mass_flux: ScalarField,
    pub melange_back_pressure_fraction: ScalarField,
    pub sea_level_elevation: FloatValue,
}

impl OceanOutputs {
    /// Zero-filled outputs on the local partition of `grid`.
    pub fn allocate(grid: &Grid) -> Self {
        Self {
            shelf_base_temperature: ScalarField::new(grid, SHELF_BASE_TEMPERATURE, Ghosts::Without)
                .with_attrs("ice temperature at the bottom of floating ice", "Kelvin"),
            shelf_base_mass_flux: ScalarField::new(grid, SHELF_BASE_MASS_FLUX, Ghosts::Without)
                .with_attrs("ice mass flux from ice shelf base (positive flux is loss from ice shelf)", "kg m-2 s-1"),
            melange_back_pressure_fraction: ScalarField::new(grid, MELANGE_BACK_PRESSURE_FRACTION, Ghosts::Without)
                .with_attrs("melange back pressure fraction", "1"),
            sea_level_elevation: 0.0,
        }
    }

    /// True if every cell of every field holds a finite value.
    pub fn is_finite(&self) -> bool {
        self.sea_level_elevation.is_finite()
            && self.shelf_base_temperature.is_finite()
            && self.shelf_base_mass_flux.is_finite()
            && self.melange_back_pressure_fraction.is_finite()
    }
}

/// The longest time step a model can take.
#[derive(Debug, Clone, PartialEq)]
pub enum MaxTimestep {
    Unlimited,
    Limited { dt: Time, reason: String },
}

impl MaxTimestep {
    pub fn limited(dt: Time, reason: impl Into<String>) -> Self {
        MaxTimestep::Limited {
            dt,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<Time> {
        match self {
            MaxTimestep::Unlimited => None,
            MaxTimestep::Limited { dt, .. } => Some(*dt),
        }
    }

    /// The stricter of two restrictions.
    pub fn min(self, other: MaxTimestep) -> MaxTimestep {
        match (self.value(), other.value()) {
            (_, None) => self,
            (None, Some(_)) => other,
            (Some(a), Some(b)) if b < a => other,
            _ => self,
        }
    }
}

/// Lifecycle stage of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Uninitialized,
    Ready,
    /// Updated over `[t, t + dt]`.
    Updated { t: Time, dt: Time },
}

/// Lifecycle state machine and the outputs of the last successful update.
pub struct Lifecycle {
    name: String,
    stage: Stage,
    outputs: Option<OceanOutputs>,
}

impl Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl Lifecycle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stage: Stage::Uninitialized,
            outputs: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_initialized(&self) -> bool {
        self.stage != Stage::Uninitialized
    }

    /// Fail unless `init` may still be called.
    pub fn check_init(&self) -> OceanResult<()> {
        match self.stage {
            Stage::Uninitialized => Ok(()),
            _ => Err(OceanError::AlreadyInitialized {
                model: self.name.clone(),
            }),
        }
    }

    pub fn mark_ready(&mut self) {
        self.stage = Stage::Ready;
    }

    /// Validate an update window against the current stage.
    ///
    /// Windows must not start before the end of the previous one. Repeating
    /// exactly the previous window is allowed and recomputes the same outputs.
    pub fn check_window(&self, t: Time, dt: Time) -> OceanResult<()> {
        let invalid = |reason: String| OceanError::InvalidTimeWindow { t, dt, reason };
        if !t.is_finite() || !dt.is_finite() {
            return Err(invalid("non-finite time".to_string()));
        }
        if dt <= 0.0 {
            return Err(invalid("the time step must be positive".to_string()));
        }
        match self.stage {
            Stage::Uninitialized => Err(OceanError::NotInitialized {
                model: self.name.clone(),
            }),
            Stage::Ready => Ok(()),
            Stage::Updated { t: t0, dt: dt0 } if t == t0 && dt == dt0 => Ok(()),
            Stage::Updated { t: t0, dt: dt0 } if t < t0 + dt0 => Err(invalid(format!(
                "{} was last updated up to {}",
                self.name,
                t0 + dt0
            ))),
            Stage::Updated { .. } => Ok(()),
        }
    }

    /// Store the outputs of a successful update over `[t, t + dt]`.
    pub fn commit(&mut self, t: Time, dt: Time, outputs: OceanOutputs) {
        self.outputs = Some(outputs);
        self.stage = Stage::Updated { t, dt };
    }

    /// The window of the last successful update.
    pub fn window(&self) -> Option<(Time, Time)> {
        match self.stage {
            Stage::Updated { t, dt } => Some((t, dt)),
            _ => None,
        }
    }

    pub fn outputs(&self) -> OceanResult<&OceanOutputs> {
        match (&self.stage, &self.outputs) {
            (Stage::Uninitialized, _) => Err(OceanError::NotInitialized {
                model: self.name.clone(),
            }),
            (_, Some(outputs)) => Ok(outputs),
            (_, None) => Err(OceanError::NotUpdated {
                model: self.name.clone(),
            }),
        }
    }
}

/// An ocean boundary-condition model.
///
/// Implementations are driven by `init` once and then `update` once per time
/// step. A failed `update` leaves the outputs of the previous successful
/// update in place.
pub trait OceanModel: Debug {
    /// Short identifier, as used by the model factory.
    fn name(&self) -> &str;

    /// Allocate state, read static inputs and check that required inputs exist.
    fn init(&mut self) -> OceanResult<()>;

    /// Recompute all outputs for the window `[t, t + dt]` (seconds).
    fn update(&mut self, t: Time, dt: Time) -> OceanResult<()>;

    /// Outputs of the last successful update.
    fn outputs(&self) -> OceanResult<&OceanOutputs>;

    fn max_timestep(&self, _t: Time) -> MaxTimestep {
        MaxTimestep::Unlimited
    }

    fn shelf_base_temperature(&self) -> OceanResult<&ScalarField> {
        Ok(&self.outputs()?.shelf_base_temperature)
    }

    fn shelf_base_mass_flux(&self) -> OceanResult<&ScalarField> {
        Ok(&self.outputs()?.shelf_base_mass_flux)
    }

    fn sea_level_elevation(&self) -> OceanResult<FloatValue> {
        Ok(self.outputs()?.sea_level_elevation)
    }

    fn melange_back_pressure_fraction(&self) -> OceanResult<&ScalarField> {
        Ok(&self.outputs()?.melange_back_pressure_fraction)
    }

    /// Fields worth saving for inspection.
    fn diagnostics(&self) -> OceanResult<Vec<&ScalarField>> {
        let outputs = self.outputs()?;
        Ok(vec![
            &outputs.shelf_base_temperature,
            &outputs.shelf_base_mass_flux,
            &outputs.melange_back_pressure_fraction,
        ])
    }

    /// Write [`diagnostics`](Self::diagnostics) and the sea level to `dataset`.
    fn write_diagnostics(&self, dataset: &mut Dataset) -> OceanResult<()> {
        for field in self.diagnostics()? {
            field.write(dataset)?;
        }
        dataset.insert_variable(
            SEA_LEVEL_ELEVATION,
            "m",
            "sea level elevation",
            VariableData::Series(vec![self.sea_level_elevation()?]),
        );
        Ok(())
    }
}
