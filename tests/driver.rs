//! Drive a model chain the way an ice-sheet model does: publish the ice
//! thickness, then step forward in time within the allowed time step.

use approx::assert_relative_eq;
use oceanbc::{
    Dataset, Ghosts, Grid, GridParameters, OceanConfig, OceanFactory, OceanModel, ScalarField, ICE_THICKNESS,
};
use std::sync::Arc;

const YEAR: f64 = 31_556_926.0;

#[test]
fn ten_years_of_constant_ocean_with_a_sea_level_trend() {
    let grid = Grid::shared(GridParameters::new(4, 4)).unwrap();
    let mut thk = ScalarField::new(&grid, ICE_THICKNESS, Ghosts::Without).with_attrs("land ice thickness", "m");
    thk.set(500.0);
    grid.variables().add(thk);

    let path = std::env::temp_dir().join(format!("oceanbc-driver-{}-delta_SL.toml", std::process::id()));
    Dataset::new()
        .with_time("years", vec![0.0, 10.0])
        .with_series("delta_SL", "m", vec![0.0, 1.0])
        .save(&path)
        .unwrap();

    let config = OceanConfig::from_toml_str(&format!(
        r#"
        [delta_SL]
        file = "{}"

        [cache]
        update_interval = {}
        "#,
        path.display(),
        2.0 * YEAR
    ))
    .unwrap();

    let mut model = OceanFactory::new(grid.clone(), Arc::new(config))
        .create("constant,delta_SL,cache")
        .unwrap();
    model.init().unwrap();

    let (mut t, end) = (0.0, 10.0 * YEAR);
    let mut steps = 0;
    let mut sea_levels = Vec::new();
    while t < end {
        let dt = model.max_timestep(t).value().unwrap_or(YEAR).min(YEAR).min(end - t);
        model.update(t, dt).unwrap();
        sea_levels.push(model.sea_level_elevation().unwrap());
        t += dt;
        steps += 1;
    }

    assert_eq!(steps, 10);
    // the cache holds each two-year average for two steps
    assert_relative_eq!(sea_levels[0], 0.1, epsilon = 1e-9);
    assert_eq!(sea_levels[0], sea_levels[1]);
    assert_relative_eq!(sea_levels[9], 0.9, epsilon = 1e-9);
    std::fs::remove_file(path).unwrap();
}
