//! Sub-shelf melt parameterization of Martin et al. (2011), "The Potsdam
//! Parallel Ice Sheet Model (PISM-PIK) - Part 2: Dynamic equilibrium
//! simulation of the Antarctic ice sheet".
//!
//! The heat flux into the shelf base is proportional to the difference between
//! a fixed ocean temperature and the freezing point of sea water at the depth
//! of the shelf base:
//!
//! $$Q = F_{melt}\, \rho_w\, c_w\, \gamma_T\, (T_{ocean} - T_f)$$
//!
//! with the freezing point
//!
//! $$T_f = 273.15 + 0.0939 - 0.057\, S + 7.64 \times 10^{-4}\, z_b$$
//!
//! where $z_b = -(\rho_i / \rho_w) H$ is the elevation of the base of a
//! floating shelf of thickness $H$.

use crate::models::ice_thickness;
use oceanbc_core::config::{OceanConfig, PhysicalConstants, PikParameters};
use oceanbc_core::errors::OceanResult;
use oceanbc_core::grid::Grid;
use oceanbc_core::model::{Lifecycle, OceanModel, OceanOutputs};
use oceanbc_core::timeseries::{FloatValue, Time};
use std::sync::Arc;
use tracing::info;

/// Shelf-base mass flux (kg m-2 s-1) under ice of the given thickness.
pub(crate) fn mass_flux(
    thickness: FloatValue,
    parameters: &PikParameters,
    constants: &PhysicalConstants,
) -> FloatValue {
    let shelf_base_elevation = -(constants.ice_density / constants.sea_water_density) * thickness;
    let freezing_point =
        273.15 + (0.0939 - 0.057 * parameters.salinity + 7.64e-4 * shelf_base_elevation);
    let ocean_temperature = parameters.ocean_temperature + 273.15;

    let heat_flux = parameters.melt_factor
        * constants.sea_water_density
        * constants.sea_water_specific_heat_capacity
        * parameters.gamma_t
        * (ocean_temperature - freezing_point);

    // ice-equivalent melt rate (m s-1) times density
    let melt_rate = heat_flux / (constants.water_latent_heat_fusion * constants.ice_density);
    melt_rate * constants.ice_density
}

/// Melt driven by the depth of the shelf base; no melange back pressure.
#[derive(Debug)]
pub struct PikOcean {
    grid: Arc<Grid>,
    config: Arc<OceanConfig>,
    lifecycle: Lifecycle,
}

impl PikOcean {
    pub fn new(grid: Arc<Grid>, config: Arc<OceanConfig>) -> Self {
        Self {
            grid,
            config,
            lifecycle: Lifecycle::new("pik"),
        }
    }
}

impl OceanModel for PikOcean {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn init(&mut self) -> OceanResult<()> {
        self.lifecycle.check_init()?;
        ice_thickness(&self.grid)?;
        info!(
            melt_factor = self.config.pik.melt_factor,
            "initializing PIK ocean model"
        );
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn update(&mut self, t: Time, dt: Time) -> OceanResult<()> {
        self.lifecycle.check_window(t, dt)?;
        let thickness = ice_thickness(&self.grid)?;
        let constants = &self.config.constants;
        let parameters = &self.config.pik;

        // melange back pressure stays zero
        let mut outputs = OceanOutputs::allocate(&self.grid);
        for (i, j) in self.grid.points() {
            let h = thickness[(i, j)];
            outputs.shelf_base_temperature[(i, j)] = constants.pressure_melting_temperature(h);
            outputs.shelf_base_mass_flux[(i, j)] = mass_flux(h, parameters, constants);
        }

        self.lifecycle.commit(t, dt, outputs);
        Ok(())
    }

    fn outputs(&self) -> OceanResult<&OceanOutputs> {
        self.lifecycle.outputs()
    }
}
