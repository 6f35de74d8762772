use crate::models::with_reader;
use oceanbc_core::config::OceanConfig;
use oceanbc_core::dataset::Dataset;
use oceanbc_core::errors::{OceanError, OceanResult};
use oceanbc_core::forcing::{ForcingOptions, ForcingSeries};
use oceanbc_core::model::{Lifecycle, MaxTimestep, OceanModel, OceanOutputs};
use oceanbc_core::timeseries::{FloatValue, Time};
use tracing::{debug, info};

/// The output a scalar modifier adjusts, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    /// Adds `delta_T` (K) to the shelf base temperature.
    DeltaT,
    /// Adds `delta_SL` (m) to the sea level elevation.
    DeltaSL,
    /// Adds `delta_mass_flux` (kg m-2 s-1) to the shelf base mass flux.
    DeltaMassFlux,
    /// Scales the melange back-pressure fraction by `frac_MBP`.
    FracMBP,
    /// Scales the shelf base mass flux by `frac_mass_flux`.
    FracMassFlux,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 5] = [
        ModifierKind::DeltaT,
        ModifierKind::DeltaSL,
        ModifierKind::DeltaMassFlux,
        ModifierKind::FracMBP,
        ModifierKind::FracMassFlux,
    ];

    /// Name of the modifier, which is also the name of its forcing variable.
    pub fn name(self) -> &'static str {
        match self {
            ModifierKind::DeltaT => "delta_T",
            ModifierKind::DeltaSL => "delta_SL",
            ModifierKind::DeltaMassFlux => "delta_mass_flux",
            ModifierKind::FracMBP => "frac_MBP",
            ModifierKind::FracMassFlux => "frac_mass_flux",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Units the forcing is converted to.
    pub fn units(self) -> &'static str {
        match self {
            ModifierKind::DeltaT => "Kelvin",
            ModifierKind::DeltaSL => "m",
            ModifierKind::DeltaMassFlux => "kg m-2 s-1",
            ModifierKind::FracMBP | ModifierKind::FracMassFlux => "1",
        }
    }

    fn options(self, config: &OceanConfig) -> &ForcingOptions {
        match self {
            ModifierKind::DeltaT => &config.delta_t,
            ModifierKind::DeltaSL => &config.delta_sl,
            ModifierKind::DeltaMassFlux => &config.delta_mass_flux,
            ModifierKind::FracMBP => &config.frac_mbp,
            ModifierKind::FracMassFlux => &config.frac_mass_flux,
        }
    }

    /// Apply the forcing `value` to the one output this kind touches.
    pub fn apply(self, value: FloatValue, outputs: &mut OceanOutputs) {
        match self {
            ModifierKind::DeltaT => outputs.shelf_base_temperature.shift(value),
            ModifierKind::DeltaSL => outputs.sea_level_elevation += value,
            ModifierKind::DeltaMassFlux => outputs.shelf_base_mass_flux.shift(value),
            ModifierKind::FracMBP => outputs.melange_back_pressure_fraction.scale(value),
            ModifierKind::FracMassFlux => outputs.shelf_base_mass_flux.scale(value),
        }
    }
}

/// Adjusts one output of the wrapped model by a spatially uniform,
/// time-dependent offset or factor.
///
/// The forcing is averaged over each update window. Outputs other than the
/// one named by the [`ModifierKind`] are copies of the wrapped model's.
#[derive(Debug)]
pub struct ScalarModifier {
    kind: ModifierKind,
    input: Box<dyn OceanModel>,
    options: ForcingOptions,
    dataset: Option<Dataset>,
    forcing: Option<ForcingSeries>,
    value: Option<FloatValue>,
    lifecycle: Lifecycle,
}

impl ScalarModifier {
    pub fn new(kind: ModifierKind, input: Box<dyn OceanModel>, config: &OceanConfig) -> Self {
        Self {
            kind,
            input,
            options: kind.options(config).clone(),
            dataset: None,
            forcing: None,
            value: None,
            lifecycle: Lifecycle::new(kind.name()),
        }
    }

    /// Read forcing from `dataset` instead of the configured file.
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Use `forcing` directly; no dataset is read at `init`.
    pub fn with_forcing(mut self, forcing: ForcingSeries) -> Self {
        self.forcing = Some(forcing);
        self
    }

    pub fn kind(&self) -> ModifierKind {
        self.kind
    }

    /// The wrapped model.
    pub fn input(&self) -> &dyn OceanModel {
        self.input.as_ref()
    }

    /// Forcing value applied by the last successful update.
    pub fn value(&self) -> Option<FloatValue> {
        self.value
    }

    fn read_forcing(&self) -> OceanResult<ForcingSeries> {
        with_reader(self.dataset.as_ref(), &self.options, self.kind.name(), |reader| {
            info!(
                modifier = self.kind.name(),
                source = %reader.source(),
                "reading scalar ocean forcing"
            );
            reader
                .read_series(self.kind.name(), self.kind.units())?
                .with_options(&self.options)
        })
    }
}

impl OceanModel for ScalarModifier {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn init(&mut self) -> OceanResult<()> {
        self.lifecycle.check_init()?;
        self.input.init()?;
        if self.forcing.is_none() {
            self.forcing = Some(self.read_forcing()?);
        }
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn update(&mut self, t: Time, dt: Time) -> OceanResult<()> {
        self.lifecycle.check_window(t, dt)?;
        let forcing = self.forcing.as_ref().ok_or_else(|| OceanError::NotInitialized {
            model: self.lifecycle.name().to_string(),
        })?;

        self.input.update(t, dt)?;

        let value = forcing.average(t, dt);
        let mut outputs = self.input.outputs()?.clone();
        self.kind.apply(value, &mut outputs);
        debug!(modifier = self.kind.name(), t, dt, value, "applied ocean forcing");

        self.value = Some(value);
        self.lifecycle.commit(t, dt, outputs);
        Ok(())
    }

    fn outputs(&self) -> OceanResult<&OceanOutputs> {
        self.lifecycle.outputs()
    }

    fn max_timestep(&self, t: Time) -> MaxTimestep {
        self.input.max_timestep(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ModifierKind::ALL {
            assert_eq!(ModifierKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ModifierKind::from_name("delta_smb"), None);
    }
}
