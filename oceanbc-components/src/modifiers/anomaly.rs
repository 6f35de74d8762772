use crate::models::with_reader;
use oceanbc_core::config::OceanConfig;
use oceanbc_core::dataset::Dataset;
use oceanbc_core::errors::{OceanError, OceanResult};
use oceanbc_core::field::{Ghosts, ScalarField};
use oceanbc_core::forcing::{ForcingOptions, GriddedForcing};
use oceanbc_core::grid::Grid;
use oceanbc_core::model::{Lifecycle, MaxTimestep, OceanModel, OceanOutputs};
use oceanbc_core::timeseries::Time;
use std::sync::Arc;
use tracing::info;

pub const SHELF_BASE_TEMPERATURE_ANOMALY: &str = "shelf_base_temperature_anomaly";
pub const SHELF_BASE_MASS_FLUX_ANOMALY: &str = "shelf_base_mass_flux_anomaly";

#[derive(Debug)]
struct Anomalies {
    temperature: GriddedForcing,
    mass_flux: GriddedForcing,
}

/// Adds gridded, time-dependent anomalies to the shelf base temperature and
/// mass flux of the wrapped model.
#[derive(Debug)]
pub struct Anomaly {
    grid: Arc<Grid>,
    input: Box<dyn OceanModel>,
    options: ForcingOptions,
    dataset: Option<Dataset>,
    anomalies: Option<Anomalies>,
    lifecycle: Lifecycle,
}

impl Anomaly {
    pub fn new(grid: Arc<Grid>, input: Box<dyn OceanModel>, config: &OceanConfig) -> Self {
        Self {
            grid,
            input,
            options: config.anomaly.clone(),
            dataset: None,
            anomalies: None,
            lifecycle: Lifecycle::new("anomaly"),
        }
    }

    /// Read anomalies from `dataset` instead of the configured file.
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn input(&self) -> &dyn OceanModel {
        self.input.as_ref()
    }
}

impl OceanModel for Anomaly {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn init(&mut self) -> OceanResult<()> {
        self.lifecycle.check_init()?;
        self.input.init()?;

        let (options, grid) = (&self.options, &self.grid);
        let anomalies = with_reader(self.dataset.as_ref(), options, "anomaly", |reader| {
            info!(source = %reader.source(), "reading shelf base anomalies");
            Ok(Anomalies {
                temperature: reader
                    .read_gridded(SHELF_BASE_TEMPERATURE_ANOMALY, "Kelvin", grid)?
                    .with_options(options)?,
                mass_flux: reader
                    .read_gridded(SHELF_BASE_MASS_FLUX_ANOMALY, "kg m-2 s-1", grid)?
                    .with_options(options)?,
            })
        })?;

        self.anomalies = Some(anomalies);
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn update(&mut self, t: Time, dt: Time) -> OceanResult<()> {
        self.lifecycle.check_window(t, dt)?;
        let anomalies = self.anomalies.as_ref().ok_or_else(|| OceanError::NotInitialized {
            model: self.lifecycle.name().to_string(),
        })?;

        self.input.update(t, dt)?;

        let mut temperature = ScalarField::new(&self.grid, SHELF_BASE_TEMPERATURE_ANOMALY, Ghosts::Without);
        let mut mass_flux = ScalarField::new(&self.grid, SHELF_BASE_MASS_FLUX_ANOMALY, Ghosts::Without);
        anomalies.temperature.average_into(t, dt, &mut temperature)?;
        anomalies.mass_flux.average_into(t, dt, &mut mass_flux)?;

        let mut outputs = self.input.outputs()?.clone();
        outputs.shelf_base_temperature.add(&temperature)?;
        outputs.shelf_base_mass_flux.add(&mass_flux)?;

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
