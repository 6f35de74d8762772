//! Configuration of the ocean models and modifiers.
//!
//! [`OceanConfig`] is an immutable bundle of parameter sections. It is built
//! once (usually from a TOML file), wrapped in an `Arc` and handed to every
//! model in a chain at construction. Every field has a default, so a config
//! file only needs to list what differs:
//!
//! ```toml
//! [constant]
//! melange_back_pressure_fraction = 1.0
//!
//! [delta_T]
//! file = "delta_T.toml"
//! period = 31556926.0
//! ```

use crate::errors::{OceanError, OceanResult};
use crate::forcing::ForcingOptions;
use crate::timeseries::FloatValue;
use crate::units::registry::SECONDS_PER_YEAR;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Latent heat of fusion of water (J kg-1).
pub const WATER_LATENT_HEAT_FUSION: FloatValue = 3.34e5;

/// Ice density (kg m-3).
pub const ICE_DENSITY: FloatValue = 910.0;

/// Physical constants shared by all models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Density of ice (kg m-3).
    /// default: 910.0
    pub ice_density: FloatValue,

    /// Melting point of fresh water at atmospheric pressure (K).
    /// default: 273.15
    pub fresh_water_melting_point: FloatValue,

    /// Clausius-Clapeyron gradient: depression of the melting point per unit
    /// of pressure (K Pa-1).
    /// default: 7.9e-8
    pub beta_cc: FloatValue,

    /// Acceleration due to gravity (m s-2).
    /// default: 9.81
    pub standard_gravity: FloatValue,

    /// Density of sea water (kg m-3).
    /// default: 1028.0
    pub sea_water_density: FloatValue,

    /// Latent heat of fusion of water (J kg-1).
    /// default: 3.34e5
    pub water_latent_heat_fusion: FloatValue,

    /// Specific heat capacity of sea water (J kg-1 K-1).
    /// default: 3974.0
    pub sea_water_specific_heat_capacity: FloatValue,

    /// Specific heat capacity of ice (J kg-1 K-1).
    /// default: 2009.0
    pub ice_specific_heat_capacity: FloatValue,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            ice_density: ICE_DENSITY,
            fresh_water_melting_point: 273.15,
            beta_cc: 7.9e-8,
            standard_gravity: 9.81,
            sea_water_density: 1028.0,
            water_latent_heat_fusion: WATER_LATENT_HEAT_FUSION,
            sea_water_specific_heat_capacity: 3974.0,
            ice_specific_heat_capacity: 2009.0,
        }
    }
}

impl PhysicalConstants {
    /// Pressure-melting temperature (K) at the base of `thickness` meters of ice.
    pub fn pressure_melting_temperature(&self, thickness: FloatValue) -> FloatValue {
        let pressure = self.ice_density * self.standard_gravity * thickness;
        self.fresh_water_melting_point - self.beta_cc * pressure
    }
}

/// Parameters of the constant ocean model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantParameters {
    /// Sub-shelf melt rate, as ice-equivalent thickness per time (m s-1).
    /// default: the rate melted by a 0.5 W m-2 heat flux, about 5.2 cm per year
    pub melt_rate: FloatValue,

    /// Melange back-pressure fraction broadcast to every cell (1).
    /// default: 0.0
    pub melange_back_pressure_fraction: FloatValue,

    /// Sea level elevation (m).
    /// default: 0.0
    pub sea_level: FloatValue,
}

impl Default for ConstantParameters {
    fn default() -> Self {
        Self {
            melt_rate: 0.5 / (WATER_LATENT_HEAT_FUSION * ICE_DENSITY),
            melange_back_pressure_fraction: 0.0,
            sea_level: 0.0,
        }
    }
}

/// Parameters of the PIK sub-shelf melt parameterization.
///
/// The melange back-pressure fraction of this model is always zero and is
/// deliberately not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PikParameters {
    /// Dimensionless melt factor scaling the heat flux.
    /// default: 5e-3
    pub melt_factor: FloatValue,

    /// Thermal exchange velocity (m s-1).
    /// default: 1e-4
    pub gamma_t: FloatValue,

    /// Ocean temperature below the shelves (Celsius).
    /// default: -1.7
    pub ocean_temperature: FloatValue,

    /// Ocean salinity below the shelves (g/kg).
    /// default: 35.0
    pub salinity: FloatValue,
}

impl Default for PikParameters {
    fn default() -> Self {
        Self {
            melt_factor: 5e-3,
            gamma_t: 1e-4,
            ocean_temperature: -1.7,
            salinity: 35.0,
        }
    }
}

/// Parameters of models that read shelf-base fields from a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GivenParameters {
    #[serde(flatten)]
    pub forcing: ForcingOptions,

    /// Melange back-pressure fraction broadcast to every cell (1).
    /// default: 0.0
    pub melange_back_pressure_fraction: FloatValue,

    /// Sea level elevation (m).
    /// default: 0.0
    pub sea_level: FloatValue,
}

/// Parameters of the three-equation melt model driven by ocean temperature
/// and salinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThParameters {
    #[serde(flatten)]
    pub forcing: ForcingOptions,

    /// Turbulent heat exchange velocity (m s-1).
    /// default: 1e-4
    pub gamma_t: FloatValue,

    /// Turbulent salt exchange velocity (m s-1).
    /// default: 5.05e-7
    pub gamma_s: FloatValue,

    /// Temperature at the top of the shelf, used for heat conduction into the
    /// ice (Celsius).
    /// default: -20.0
    pub shelf_top_surface_temperature: FloatValue,

    /// Restrict the salinity used by the solver to `[4, 40]` g/kg.
    /// default: true
    pub limit_salinity_range: bool,

    /// Melange back-pressure fraction broadcast to every cell (1).
    /// default: 0.0
    pub melange_back_pressure_fraction: FloatValue,

    /// Sea level elevation (m).
    /// default: 0.0
    pub sea_level: FloatValue,
}

impl Default for ThParameters {
    fn default() -> Self {
        Self {
            forcing: ForcingOptions::default(),
            gamma_t: 1e-4,
            gamma_s: 5.05e-7,
            shelf_top_surface_temperature: -20.0,
            limit_salinity_range: true,
            melange_back_pressure_fraction: 0.0,
            sea_level: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheParameters {
    /// Interval between updates of the wrapped model (s).
    /// default: one year
    pub update_interval: FloatValue,
}

impl Default for CacheParameters {
    fn default() -> Self {
        Self {
            update_interval: SECONDS_PER_YEAR,
        }
    }
}

/// Configuration of a whole model chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanConfig {
    pub constants: PhysicalConstants,
    pub constant: ConstantParameters,
    pub pik: PikParameters,
    pub given: GivenParameters,
    pub th: ThParameters,
    #[serde(rename = "delta_T")]
    pub delta_t: ForcingOptions,
    #[serde(rename = "delta_SL")]
    pub delta_sl: ForcingOptions,
    pub delta_mass_flux: ForcingOptions,
    #[serde(rename = "frac_MBP")]
    pub frac_mbp: ForcingOptions,
    pub frac_mass_flux: ForcingOptions,
    pub anomaly: ForcingOptions,
    pub cache: CacheParameters,
}

impl OceanConfig {
    pub fn from_toml_str(text: &str) -> OceanResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> OceanResult<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> OceanResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check values that would make every model in a chain meaningless.
    pub fn validate(&self) -> OceanResult<()> {
        let c = &self.constants;
        let positive = [
            ("constants.ice_density", c.ice_density),
            ("constants.fresh_water_melting_point", c.fresh_water_melting_point),
            ("constants.standard_gravity", c.standard_gravity),
            ("constants.sea_water_density", c.sea_water_density),
            ("constants.water_latent_heat_fusion", c.water_latent_heat_fusion),
            ("constants.sea_water_specific_heat_capacity", c.sea_water_specific_heat_capacity),
            ("constants.ice_specific_heat_capacity", c.ice_specific_heat_capacity),
            ("th.gamma_t", self.th.gamma_t),
            ("th.gamma_s", self.th.gamma_s),
            ("pik.gamma_t", self.pik.gamma_t),
            ("cache.update_interval", self.cache.update_interval),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(*v > 0.0 && v.is_finite())) {
            return Err(OceanError::InvalidConfiguration(format!(
                "{name} must be positive, got {value}"
            )));
        }
        if !self.constant.melt_rate.is_finite() {
            return Err(OceanError::InvalidConfiguration(
                "constant.melt_rate must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
