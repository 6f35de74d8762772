use crate::models::with_reader;
use oceanbc_core::config::OceanConfig;
use oceanbc_core::dataset::Dataset;
use oceanbc_core::errors::{OceanError, OceanResult};
use oceanbc_core::forcing::GriddedForcing;
use oceanbc_core::grid::Grid;
use oceanbc_core::model::{Lifecycle, OceanModel, OceanOutputs, SHELF_BASE_MASS_FLUX, SHELF_BASE_TEMPERATURE};
use oceanbc_core::timeseries::Time;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
struct Inputs {
    temperature: GriddedForcing,
    mass_flux: GriddedForcing,
}

/// Reads shelf-base temperature and mass flux from a dataset.
///
/// Both variables are averaged over each update window. Melange back pressure
/// and sea level come from configuration.
#[derive(Debug)]
pub struct GivenOcean {
    grid: Arc<Grid>,
    config: Arc<OceanConfig>,
    dataset: Option<Dataset>,
    inputs: Option<Inputs>,
    lifecycle: Lifecycle,
}

impl GivenOcean {
    pub fn new(grid: Arc<Grid>, config: Arc<OceanConfig>) -> Self {
        Self {
            grid,
            config,
            dataset: None,
            inputs: None,
            lifecycle: Lifecycle::new("given"),
        }
    }

    /// Read forcing from `dataset` instead of the configured file.
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }
}

impl OceanModel for GivenOcean {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn init(&mut self) -> OceanResult<()> {
        self.lifecycle.check_init()?;
        let options = &self.config.given.forcing;
        let grid = &self.grid;

        let inputs = with_reader(self.dataset.as_ref(), options, "given", |reader| {
            info!(source = %reader.source(), "reading shelf base temperature and mass flux");
            Ok(Inputs {
                temperature: reader
                    .read_gridded(SHELF_BASE_TEMPERATURE, "Kelvin", grid)?
                    .with_options(options)?,
                mass_flux: reader
                    .read_gridded(SHELF_BASE_MASS_FLUX, "kg m-2 s-1", grid)?
                    .with_options(options)?,
            })
        })?;

        self.inputs = Some(inputs);
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn update(&mut self, t: Time, dt: Time) -> OceanResult<()> {
        self.lifecycle.check_window(t, dt)?;
        let inputs = self.inputs.as_ref().ok_or_else(|| OceanError::NotInitialized {
            model: self.lifecycle.name().to_string(),
        })?;
        let parameters = &self.config.given;

        let mut outputs = OceanOutputs::allocate(&self.grid);
        inputs
            .temperature
            .average_into(t, dt, &mut outputs.shelf_base_temperature)?;
        inputs
            .mass_flux
            .average_into(t, dt, &mut outputs.shelf_base_mass_flux)?;
        outputs
            .melange_back_pressure_fraction
            .set(parameters.melange_back_pressure_fraction);
        outputs.sea_level_elevation = parameters.sea_level;

        self.lifecycle.commit(t, dt, outputs);
        Ok(())
    }

    fn outputs(&self) -> OceanResult<&OceanOutputs> {
        self.lifecycle.outputs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oceanbc_core::dataset::VariableData;
    use oceanbc_core::grid::GridParameters;

    fn dataset(temperature: Vec<Vec<f64>>, mass_flux: Vec<Vec<f64>>, time: Vec<f64>) -> Dataset {
        let mut dataset = Dataset::new().with_time("seconds", time);
        dataset.insert_variable(SHELF_BASE_TEMPERATURE, "Kelvin", "", VariableData::Gridded(temperature));
        dataset.insert_variable(SHELF_BASE_MASS_FLUX, "kg m-2 s-1", "", VariableData::Gridded(mass_flux));
        dataset
    }

    #[test]
    fn time_dependent_records_are_averaged_per_cell() {
        let grid = Grid::shared(GridParameters::new(2, 1)).unwrap();
        let dataset = dataset(
            vec![vec![260.0, 262.0], vec![264.0, 262.0]],
            vec![vec![0.0, 1.0], vec![2.0, 1.0]],
            vec![0.0, 10.0],
        );
        let mut model = GivenOcean::new(grid, Arc::new(OceanConfig::default())).with_dataset(dataset);
        model.init().unwrap();
        model.update(0.0, 10.0).unwrap();

        let temperature = model.shelf_base_temperature().unwrap();
        assert_eq!(temperature[(0, 0)], 262.0);
        assert_eq!(temperature[(1, 0)], 262.0);
        assert_eq!(model.shelf_base_mass_flux().unwrap()[(0, 0)], 1.0);
    }

    #[test]
    fn missing_variable() {
        let grid = Grid::shared(GridParameters::default()).unwrap();
        let mut dataset = Dataset::new();
        dataset.insert_variable(SHELF_BASE_TEMPERATURE, "Kelvin", "", VariableData::Gridded(vec![vec![263.0; 9]]));
        let mut model = GivenOcean::new(grid, Arc::new(OceanConfig::default())).with_dataset(dataset);
        assert!(matches!(model.init(), Err(OceanError::MissingInput { .. })));
        assert!(matches!(model.shelf_base_temperature(), Err(OceanError::NotInitialized { .. })));
    }

    #[test]
    fn missing_file() {
        let grid = Grid::shared(GridParameters::default()).unwrap();
        let mut model = GivenOcean::new(grid, Arc::new(OceanConfig::default()));
        assert!(matches!(model.init(), Err(OceanError::MissingInput { .. })));
    }
}
