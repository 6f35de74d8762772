use crate::models::ice_thickness;
use oceanbc_core::config::OceanConfig;
use oceanbc_core::errors::OceanResult;
use oceanbc_core::grid::Grid;
use oceanbc_core::model::{Lifecycle, OceanModel, OceanOutputs};
use oceanbc_core::timeseries::Time;
use std::sync::Arc;
use tracing::info;

/// Constant sub-shelf melt rate; the shelf base is at the pressure-melting
/// temperature of the ice above it.
#[derive(Debug)]
pub struct ConstantOcean {
    grid: Arc<Grid>,
    config: Arc<OceanConfig>,
    lifecycle: Lifecycle,
}

impl ConstantOcean {
    pub fn new(grid: Arc<Grid>, config: Arc<OceanConfig>) -> Self {
        Self {
            grid,
            config,
            lifecycle: Lifecycle::new("constant"),
        }
    }
}

impl OceanModel for ConstantOcean {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn init(&mut self) -> OceanResult<()> {
        self.lifecycle.check_init()?;
        ice_thickness(&self.grid)?;

        let parameters = &self.config.constant;
        info!(
            melt_rate = parameters.melt_rate,
            melange_back_pressure_fraction = parameters.melange_back_pressure_fraction,
            "initializing constant ocean model"
        );
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn update(&mut self, t: Time, dt: Time) -> OceanResult<()> {
        self.lifecycle.check_window(t, dt)?;
        let thickness = ice_thickness(&self.grid)?;
        let constants = &self.config.constants;
        let parameters = &self.config.constant;

        let mut outputs = OceanOutputs::allocate(&self.grid);
        outputs
            .shelf_base_mass_flux
            .set(parameters.melt_rate * constants.ice_density);
        outputs
            .melange_back_pressure_fraction
            .set(parameters.melange_back_pressure_fraction);
        outputs.sea_level_elevation = parameters.sea_level;
        for (i, j) in self.grid.points() {
            outputs.shelf_base_temperature[(i, j)] =
                constants.pressure_melting_temperature(thickness[(i, j)]);
        }

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
    use oceanbc_core::errors::OceanError;
    use oceanbc_core::field::{Ghosts, ScalarField};
    use oceanbc_core::grid::{GridParameters, ICE_THICKNESS};

    fn grid_with_thickness(thickness: f64) -> Arc<Grid> {
        let grid = Grid::shared(GridParameters::default()).unwrap();
        let mut thk = ScalarField::new(&grid, ICE_THICKNESS, Ghosts::Without).with_attrs("land ice thickness", "m");
        thk.set(thickness);
        grid.variables().add(thk);
        grid
    }

    #[test]
    fn requires_ice_thickness() {
        let grid = Grid::shared(GridParameters::default()).unwrap();
        let mut model = ConstantOcean::new(grid, Arc::new(OceanConfig::default()));
        assert!(matches!(model.init(), Err(OceanError::MissingInput { .. })));
    }

    #[test]
    fn follows_thickness_changes() {
        let grid = grid_with_thickness(0.0);
        let mut model = ConstantOcean::new(grid.clone(), Arc::new(OceanConfig::default()));
        model.init().unwrap();
        model.update(0.0, 1.0).unwrap();
        assert_eq!(model.shelf_base_temperature().unwrap()[(1, 1)], 273.15);

        let mut thk = ScalarField::new(&grid, ICE_THICKNESS, Ghosts::Without);
        thk.set(100.0);
        grid.variables().add(thk);
        model.update(1.0, 1.0).unwrap();
        assert!(model.shelf_base_temperature().unwrap()[(1, 1)] < 273.15);
    }

    #[test]
    fn negative_thickness_is_rejected() {
        let grid = grid_with_thickness(-1.0);
        let mut model = ConstantOcean::new(grid, Arc::new(OceanConfig::default()));
        assert!(matches!(model.init(), Err(OceanError::InvalidValue { .. })));
    }

    #[test]
    fn init_twice_fails() {
        let mut model = ConstantOcean::new(grid_with_thickness(10.0), Arc::new(OceanConfig::default()));
        model.init().unwrap();
        assert!(matches!(model.init(), Err(OceanError::AlreadyInitialized { .. })));
    }
}
