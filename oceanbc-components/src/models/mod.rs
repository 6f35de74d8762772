//! Base ocean models.
//!
//! | Model | Name | Inputs |
//! |-------|------|--------|
//! | [`ConstantOcean`] | `constant` | ice thickness |
//! | [`PikOcean`] | `pik` | ice thickness |
//! | [`GivenOcean`] | `given` | `shelfbtemp`, `shelfbmassflux` |
//! | [`GivenThOcean`] | `th` | ice thickness, `theta_ocean`, `salinity_ocean` |

mod constant;
mod given;
mod given_th;
mod pik;

pub use constant::ConstantOcean;
pub use given::GivenOcean;
pub use given_th::{three_equation_melt, GivenThOcean, MeltSolution};
pub use pik::PikOcean;

use oceanbc_core::dataset::{Dataset, ForcingReader};
use oceanbc_core::errors::{OceanError, OceanResult};
use oceanbc_core::field::ScalarField;
use oceanbc_core::forcing::ForcingOptions;
use oceanbc_core::grid::{Grid, ICE_THICKNESS};
use std::sync::Arc;

/// The current ice thickness snapshot, checked against `grid`.
pub(crate) fn ice_thickness(grid: &Grid) -> OceanResult<Arc<ScalarField>> {
    let thickness = grid.variables().require(ICE_THICKNESS)?;
    let p = grid.partition();
    if thickness.partition() != p {
        return Err(OceanError::ShapeMismatch {
            name: ICE_THICKNESS.to_string(),
            expected: vec![p.ym, p.xm],
            found: vec![thickness.partition().ym, thickness.partition().xm],
        });
    }
    if let Some(&bad) = thickness.values().iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
        return Err(OceanError::invalid_value(
            ICE_THICKNESS,
            bad,
            "ice thickness must be finite and non-negative",
        ));
    }
    Ok(thickness)
}

/// Use a dataset supplied in memory, or open the file named in `options`.
pub(crate) fn with_reader<T>(
    preloaded: Option<&Dataset>,
    options: &ForcingOptions,
    section: &str,
    f: impl FnOnce(&dyn ForcingReader) -> OceanResult<T>,
) -> OceanResult<T> {
    match preloaded {
        Some(dataset) => f(dataset),
        None => f(&options.open(section)?),
    }
}
