//! Three-equation melt parameterization driven by ocean potential temperature
//! and salinity, following Hellmer and Olbers (1989) and Holland and Jenkins
//! (1999).
//!
//! At the ice-ocean interface three conditions hold:
//!
//! 1. the interface is at the freezing point of sea water with the interface
//!    salinity $S_b$ at the depth $h$ of the shelf base,
//!    $T_b = a_0 S_b + a_1 + a_2 h$;
//! 2. heat supplied by the ocean balances latent heat and conduction into the
//!    ice, $c_w \gamma_T (\theta - T_b) = -w (L + c_i (T_b - T_s))$;
//! 3. salt is conserved, $\gamma_S (S_W - S_b) = -w S_b$,
//!
//! where $w$ is the melt rate (positive when the shelf grows). Expressing $T_b$
//! through the freezing point of the ocean potential temperature and
//! eliminating $w$ gives a quadratic in $S_b$ whose larger root is the
//! physical one.

use crate::models::{ice_thickness, with_reader};
use oceanbc_core::config::{OceanConfig, PhysicalConstants, ThParameters};
use oceanbc_core::dataset::Dataset;
use oceanbc_core::errors::{OceanError, OceanResult};
use oceanbc_core::field::{Ghosts, ScalarField};
use oceanbc_core::forcing::GriddedForcing;
use oceanbc_core::grid::Grid;
use oceanbc_core::model::{Lifecycle, OceanModel, OceanOutputs};
use oceanbc_core::timeseries::{FloatValue, Time};
use std::sync::Arc;
use tracing::info;

pub const OCEAN_POTENTIAL_TEMPERATURE: &str = "theta_ocean";
pub const OCEAN_SALINITY: &str = "salinity_ocean";

/// Liquidus coefficients for in-situ temperature: `T = a0 S + a1 + a2 h` (Celsius).
const IN_SITU: [FloatValue; 3] = [-0.0575, 0.0901, -7.61e-4];
/// Liquidus coefficients for potential temperature.
const POTENTIAL: [FloatValue; 3] = [-0.0575, 0.0921, -7.85e-4];

/// Salinity range (g/kg) the liquidus fit is valid for.
const SALINITY_RANGE: (FloatValue, FloatValue) = (4.0, 40.0);
/// Salinities above this are rejected as non-physical input (g/kg).
const MAX_SALINITY: FloatValue = 50.0;
/// Ocean temperatures outside this range are rejected (K).
const TEMPERATURE_RANGE: (FloatValue, FloatValue) = (253.15, 313.15);

const CELSIUS_OFFSET: FloatValue = 273.15;

/// Interface temperature and mass flux at one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeltSolution {
    /// Temperature at the ice-ocean interface (K).
    pub temperature: FloatValue,
    /// Interface salinity (g/kg).
    pub salinity: FloatValue,
    /// Mass flux (kg m-2 s-1); negative values mean freezing.
    pub mass_flux: FloatValue,
}

/// Solve the three-equation system for one cell.
///
/// `theta` is the ocean potential temperature (K), `salinity` the ocean
/// salinity (g/kg) and `thickness` the ice thickness (m).
pub fn three_equation_melt(
    theta: FloatValue,
    salinity: FloatValue,
    thickness: FloatValue,
    parameters: &ThParameters,
    constants: &PhysicalConstants,
) -> OceanResult<MeltSolution> {
    if !(theta.is_finite() && theta >= TEMPERATURE_RANGE.0 && theta <= TEMPERATURE_RANGE.1) {
        return Err(OceanError::invalid_value(
            OCEAN_POTENTIAL_TEMPERATURE,
            theta,
            format!(
                "ocean temperature must lie in [{}, {}] K",
                TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1
            ),
        ));
    }
    if !(salinity.is_finite() && salinity > 0.0 && salinity <= MAX_SALINITY) {
        return Err(OceanError::invalid_value(
            OCEAN_SALINITY,
            salinity,
            format!("salinity must lie in (0, {MAX_SALINITY}] g/kg"),
        ));
    }
    if !(thickness.is_finite() && thickness >= 0.0) {
        return Err(OceanError::invalid_value(
            "land_ice_thickness",
            thickness,
            "ice thickness must be finite and non-negative",
        ));
    }

    let clamp = |s: FloatValue| {
        if parameters.limit_salinity_range {
            s.clamp(SALINITY_RANGE.0, SALINITY_RANGE.1)
        } else {
            s
        }
    };

    let sea_water_salinity = clamp(salinity);
    let theta = theta - CELSIUS_OFFSET;
    let h = thickness;
    let (a, b) = (IN_SITU, POTENTIAL);
    let (gamma_t, gamma_s) = (parameters.gamma_t, parameters.gamma_s);
    let c_w = constants.sea_water_specific_heat_capacity;
    let c_i = constants.ice_specific_heat_capacity;

    let k_b = b[1] + b[2] * h;
    let k_a = a[1] + a[2] * h;
    let latent = constants.water_latent_heat_fusion + c_i * (k_a - parameters.shelf_top_surface_temperature);

    let qa = -c_w * gamma_t * b[0] + gamma_s * c_i * a[0];
    let qb = c_w * gamma_t * (theta - k_b) - gamma_s * sea_water_salinity * c_i * a[0] + gamma_s * latent;
    let qc = -gamma_s * sea_water_salinity * latent;

    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant.is_nan() || discriminant < 0.0 || qa == 0.0 {
        return Err(OceanError::NumericalFailure {
            model: "th".to_string(),
            reason: format!("no real interface salinity (discriminant {discriminant})"),
        });
    }
    let root = discriminant.sqrt();
    let interface_salinity = ((-qb + root) / (2.0 * qa)).max((-qb - root) / (2.0 * qa));
    if !(interface_salinity.is_finite() && interface_salinity > 0.0) {
        return Err(OceanError::NumericalFailure {
            model: "th".to_string(),
            reason: format!("non-physical interface salinity {interface_salinity}"),
        });
    }
    let interface_salinity = clamp(interface_salinity);

    let temperature = a[0] * interface_salinity + k_a + CELSIUS_OFFSET;
    let mass_flux = gamma_s * constants.sea_water_density * (sea_water_salinity - interface_salinity)
        / interface_salinity;

    Ok(MeltSolution {
        temperature,
        salinity: interface_salinity,
        mass_flux,
    })
}

#[derive(Debug)]
struct Inputs {
    theta: GriddedForcing,
    salinity: GriddedForcing,
}

/// Shelf-base temperature and mass flux from ocean temperature and salinity.
#[derive(Debug)]
pub struct GivenThOcean {
    grid: Arc<Grid>,
    config: Arc<OceanConfig>,
    dataset: Option<Dataset>,
    inputs: Option<Inputs>,
    lifecycle: Lifecycle,
}

impl GivenThOcean {
    pub fn new(grid: Arc<Grid>, config: Arc<OceanConfig>) -> Self {
        Self {
            grid,
            config,
            dataset: None,
            inputs: None,
            lifecycle: Lifecycle::new("th"),
        }
    }

    /// Read forcing from `dataset` instead of the configured file.
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }
}

impl OceanModel for GivenThOcean {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn init(&mut self) -> OceanResult<()> {
        self.lifecycle.check_init()?;
        ice_thickness(&self.grid)?;

        let options = &self.config.th.forcing;
        let grid = &self.grid;
        let inputs = with_reader(self.dataset.as_ref(), options, "th", |reader| {
            info!(source = %reader.source(), "reading ocean potential temperature and salinity");
            Ok(Inputs {
                theta: reader
                    .read_gridded(OCEAN_POTENTIAL_TEMPERATURE, "Kelvin", grid)?
                    .with_options(options)?,
                salinity: reader
                    .read_gridded(OCEAN_SALINITY, "g/kg", grid)?
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
        let thickness = ice_thickness(&self.grid)?;
        let parameters = &self.config.th;
        let constants = &self.config.constants;

        let mut theta = ScalarField::new(&self.grid, OCEAN_POTENTIAL_TEMPERATURE, Ghosts::Without);
        let mut salinity = ScalarField::new(&self.grid, OCEAN_SALINITY, Ghosts::Without);
        inputs.theta.average_into(t, dt, &mut theta)?;
        inputs.salinity.average_into(t, dt, &mut salinity)?;

        let mut outputs = OceanOutputs::allocate(&self.grid);
        for (i, j) in self.grid.points() {
            let melt = three_equation_melt(
                theta[(i, j)],
                salinity[(i, j)],
                thickness[(i, j)],
                parameters,
                constants,
            )?;
            outputs.shelf_base_temperature[(i, j)] = melt.temperature;
            outputs.shelf_base_mass_flux[(i, j)] = melt.mass_flux;
        }
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
    use approx::assert_relative_eq;

    fn solve(theta: f64, salinity: f64, thickness: f64) -> OceanResult<MeltSolution> {
        three_equation_melt(
            theta,
            salinity,
            thickness,
            &ThParameters::default(),
            &PhysicalConstants::default(),
        )
    }

    #[test]
    fn cold_ocean_under_1000m() {
        let melt = solve(270.0, 35.0, 1000.0).unwrap();
        assert_relative_eq!(melt.temperature, 270.1791, epsilon = 1e-9);
        assert_relative_eq!(melt.mass_flux, -6.48925e-5, max_relative = 1e-9);
        assert_eq!(melt.salinity, 40.0);
    }

    #[test]
    fn warm_ocean_melts() {
        let melt = solve(275.0, 34.5, 500.0).unwrap();
        assert!(melt.mass_flux > 0.0, "{melt:?}");
        assert!(melt.salinity < 34.5);
    }

    #[test]
    fn unlimited_salinity_uses_the_raw_root() {
        let parameters = ThParameters {
            limit_salinity_range: false,
            ..Default::default()
        };
        let melt = three_equation_melt(270.0, 35.0, 1000.0, &parameters, &PhysicalConstants::default()).unwrap();
        assert_relative_eq!(melt.salinity, 41.4641383, epsilon = 1e-6);
    }

    #[test]
    fn unphysical_latent_heat_has_no_interface_salinity() {
        // a shelf top far above the melting point makes the effective latent heat negative
        for (surface_temperature, reason) in [(1.5e4, "discriminant"), (1e4, "non-physical")] {
            let parameters = ThParameters {
                shelf_top_surface_temperature: surface_temperature,
                ..Default::default()
            };
            let err = three_equation_melt(313.15, 35.0, 0.0, &parameters, &PhysicalConstants::default()).unwrap_err();
            match err {
                OceanError::NumericalFailure { model, reason: message } => {
                    assert_eq!(model, "th");
                    assert!(message.contains(reason), "{message}");
                }
                other => panic!("expected a numerical failure, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        for salinity in [0.0, -1.0, 60.0, f64::NAN] {
            let err = solve(270.0, salinity, 1000.0).unwrap_err();
            assert!(matches!(err, OceanError::InvalidValue { .. }), "{salinity}");
        }
        assert!(matches!(solve(400.0, 35.0, 1000.0), Err(OceanError::InvalidValue { .. })));
        assert!(matches!(solve(270.0, 35.0, -5.0), Err(OceanError::InvalidValue { .. })));
    }
}
