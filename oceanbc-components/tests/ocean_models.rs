//! Behaviour of the base models and modifiers on a small grid covered by
//! 1000 m thick ice.
//!
//! Each test builds a chain, updates it over one step and compares its outputs
//! either to closed-form values or to the outputs of the wrapped model.

use approx::assert_relative_eq;
use is_close::is_close;
use oceanbc_components::models::{ConstantOcean, GivenOcean, GivenThOcean, PikOcean};
use oceanbc_components::modifiers::{Anomaly, Cache, ModifierKind, ScalarModifier};
use oceanbc_components::OceanFactory;
use oceanbc_core::config::OceanConfig;
use oceanbc_core::dataset::{Dataset, VariableData};
use oceanbc_core::errors::OceanError;
use oceanbc_core::field::{Ghosts, ScalarField};
use oceanbc_core::forcing::{ForcingOptions, ForcingSeries};
use oceanbc_core::grid::{Grid, GridParameters, ICE_THICKNESS};
use oceanbc_core::model::{OceanModel, OceanOutputs};
use oceanbc_core::units::SECONDS_PER_YEAR;
use std::path::PathBuf;
use std::sync::Arc;

const THICKNESS: f64 = 1000.0;
const DT: f64 = SECONDS_PER_YEAR;

fn grid(parameters: GridParameters) -> Arc<Grid> {
    let grid = Grid::shared(parameters).unwrap();
    let mut thk = ScalarField::new(&grid, ICE_THICKNESS, Ghosts::Without).with_attrs("land ice thickness", "m");
    thk.set(THICKNESS);
    grid.variables().add(thk);
    grid
}

fn default_grid() -> Arc<Grid> {
    grid(GridParameters::default())
}

fn config() -> OceanConfig {
    let mut config = OceanConfig::default();
    config.constant.melange_back_pressure_fraction = 1.0;
    config
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("oceanbc-{}-{name}", std::process::id()))
}

fn uniform(grid: &Grid, value: f64) -> VariableData {
    VariableData::Gridded(vec![vec![value; grid.mx() * grid.my()]])
}

fn given_dataset(grid: &Grid) -> Dataset {
    let mut dataset = Dataset::new().with_time("seconds", vec![0.0]);
    dataset.insert_variable("shelfbtemp", "Kelvin", "", uniform(grid, 263.0));
    dataset.insert_variable("shelfbmassflux", "kg m-2 s-1", "", uniform(grid, 3e-3));
    dataset
}

fn constant_model(grid: &Arc<Grid>) -> Box<dyn OceanModel> {
    Box::new(ConstantOcean::new(grid.clone(), Arc::new(config())))
}

fn given_model(grid: &Arc<Grid>) -> Box<dyn OceanModel> {
    Box::new(GivenOcean::new(grid.clone(), Arc::new(config())).with_dataset(given_dataset(grid)))
}

fn modifier(kind: ModifierKind, input: Box<dyn OceanModel>, value: f64) -> ScalarModifier {
    let forcing = ForcingSeries::constant(kind.name(), kind.units(), value).unwrap();
    ScalarModifier::new(kind, input, &config()).with_forcing(forcing)
}

fn run(model: &mut dyn OceanModel) {
    model.init().unwrap();
    model.update(0.0, DT).unwrap();
}

fn all_cells(field: &ScalarField, expected: f64) {
    for value in field.values() {
        assert!(is_close!(*value, expected), "expected {expected}, got {value}");
    }
}

/// Per-cell `modified - input` for every output.
fn differences(modified: &OceanOutputs, input: &OceanOutputs) -> [Vec<f64>; 3] {
    let diff = |a: &ScalarField, b: &ScalarField| -> Vec<f64> {
        a.values().iter().zip(b.values().iter()).map(|(x, y)| x - y).collect()
    };
    [
        diff(&modified.shelf_base_temperature, &input.shelf_base_temperature),
        diff(&modified.shelf_base_mass_flux, &input.shelf_base_mass_flux),
        diff(&modified.melange_back_pressure_fraction, &input.melange_back_pressure_fraction),
    ]
}

mod base_models {
    use super::*;

    #[test]
    fn constant() {
        let grid = default_grid();
        let mut model = constant_model(&grid);
        run(model.as_mut());

        let config = config();
        let c = &config.constants;
        all_cells(
            model.shelf_base_mass_flux().unwrap(),
            config.constant.melt_rate * c.ice_density,
        );
        all_cells(
            model.shelf_base_temperature().unwrap(),
            c.fresh_water_melting_point - c.beta_cc * c.ice_density * c.standard_gravity * THICKNESS,
        );
        all_cells(model.melange_back_pressure_fraction().unwrap(), 1.0);
        assert_eq!(model.sea_level_elevation().unwrap(), 0.0);
    }

    #[test]
    fn pik() {
        let grid = default_grid();
        let mut config = config();
        // ignored by the PIK model
        config.constant.melange_back_pressure_fraction = 0.7;
        let mut model = PikOcean::new(grid, Arc::new(config.clone()));
        run(&mut model);

        let c = &config.constants;
        all_cells(model.shelf_base_mass_flux().unwrap(), 5.36591610659e-06);
        all_cells(
            model.shelf_base_temperature().unwrap(),
            c.fresh_water_melting_point - c.beta_cc * c.ice_density * c.standard_gravity * THICKNESS,
        );
        all_cells(model.melange_back_pressure_fraction().unwrap(), 0.0);
        assert_eq!(model.sea_level_elevation().unwrap(), 0.0);
    }

    #[test]
    fn given() {
        let grid = default_grid();
        let mut model = given_model(&grid);
        run(model.as_mut());

        all_cells(model.shelf_base_temperature().unwrap(), 263.0);
        all_cells(model.shelf_base_mass_flux().unwrap(), 3e-3);
        all_cells(model.melange_back_pressure_fraction().unwrap(), 0.0);
        assert_eq!(model.sea_level_elevation().unwrap(), 0.0);
    }

    #[test]
    fn given_th() {
        let grid = default_grid();
        let mut dataset = Dataset::new().with_time("seconds", vec![0.0]);
        dataset.insert_variable("theta_ocean", "Kelvin", "", uniform(&grid, 270.0));
        dataset.insert_variable("salinity_ocean", "g/kg", "", uniform(&grid, 35.0));
        let mut model = GivenThOcean::new(grid, Arc::new(config())).with_dataset(dataset);
        run(&mut model);

        for value in model.shelf_base_temperature().unwrap().values() {
            assert_relative_eq!(*value, 270.1791, epsilon = 1e-6);
        }
        for value in model.shelf_base_mass_flux().unwrap().values() {
            assert_relative_eq!(*value, -6.48925e-5, max_relative = 1e-6);
        }
        all_cells(model.melange_back_pressure_fraction().unwrap(), 0.0);
    }

    #[test]
    fn given_th_rejects_negative_salinity() {
        let grid = default_grid();
        let mut dataset = Dataset::new();
        dataset.insert_variable("theta_ocean", "Kelvin", "", uniform(&grid, 270.0));
        dataset.insert_variable("salinity_ocean", "g/kg", "", uniform(&grid, -1.0));
        let mut model = GivenThOcean::new(grid, Arc::new(config())).with_dataset(dataset);
        model.init().unwrap();
        let err = model.update(0.0, DT).unwrap_err();
        assert!(matches!(err, OceanError::InvalidValue { .. }), "{err}");
        assert!(matches!(model.shelf_base_mass_flux(), Err(OceanError::NotUpdated { .. })));
    }
}

mod modifiers {
    use super::*;

    fn check_delta(kind: ModifierKind, input: Box<dyn OceanModel>) {
        let mut model = modifier(kind, input, -5.0);
        run(&mut model);
        let modified = model.outputs().unwrap();
        let input = model.input().outputs().unwrap();
        let [temperature, mass_flux, melange] = differences(modified, input);

        let touched = |k: ModifierKind| if k == kind { -5.0 } else { 0.0 };
        assert!(temperature.iter().all(|d| is_close!(*d, touched(ModifierKind::DeltaT))));
        assert!(mass_flux.iter().all(|d| is_close!(*d, touched(ModifierKind::DeltaMassFlux))));
        assert!(melange.iter().all(|d| *d == 0.0));
        assert!(is_close!(
            modified.sea_level_elevation - input.sea_level_elevation,
            touched(ModifierKind::DeltaSL)
        ));
    }

    fn check_fraction(kind: ModifierKind, input: Box<dyn OceanModel>) {
        let mut model = modifier(kind, input, 0.5);
        run(&mut model);
        let modified = model.outputs().unwrap();
        let input = model.input().outputs().unwrap();

        let (changed, unchanged) = match kind {
            ModifierKind::FracMBP => (
                (&modified.melange_back_pressure_fraction, &input.melange_back_pressure_fraction),
                (&modified.shelf_base_mass_flux, &input.shelf_base_mass_flux),
            ),
            _ => (
                (&modified.shelf_base_mass_flux, &input.shelf_base_mass_flux),
                (&modified.melange_back_pressure_fraction, &input.melange_back_pressure_fraction),
            ),
        };
        for (a, b) in changed.0.values().iter().zip(changed.1.values().iter()) {
            if *b != 0.0 {
                assert!(is_close!(a / b, 0.5));
            }
        }
        assert_eq!(unchanged.0, unchanged.1);
        assert_eq!(modified.shelf_base_temperature, input.shelf_base_temperature);
        assert_eq!(modified.sea_level_elevation, input.sea_level_elevation);
    }

    #[test]
    fn delta_t() {
        check_delta(ModifierKind::DeltaT, constant_model(&default_grid()));
        check_delta(ModifierKind::DeltaT, given_model(&default_grid()));
    }

    #[test]
    fn delta_sl() {
        check_delta(ModifierKind::DeltaSL, constant_model(&default_grid()));
        check_delta(ModifierKind::DeltaSL, given_model(&default_grid()));
    }

    #[test]
    fn delta_mass_flux() {
        check_delta(ModifierKind::DeltaMassFlux, constant_model(&default_grid()));
        check_delta(ModifierKind::DeltaMassFlux, given_model(&default_grid()));
    }

    #[test]
    fn frac_mbp() {
        check_fraction(ModifierKind::FracMBP, constant_model(&default_grid()));
    }

    #[test]
    fn frac_mass_flux() {
        check_fraction(ModifierKind::FracMassFlux, constant_model(&default_grid()));
        check_fraction(ModifierKind::FracMassFlux, given_model(&default_grid()));
    }

    #[test]
    fn composition_follows_wrap_order() {
        let grid = default_grid();

        // offset inside, factor outside
        let inner = modifier(ModifierKind::DeltaMassFlux, given_model(&grid), 5.0);
        let mut outer = modifier(ModifierKind::FracMassFlux, Box::new(inner), 2.0);
        run(&mut outer);
        all_cells(outer.shelf_base_mass_flux().unwrap(), 2.0 * (3e-3 + 5.0));

        // factor inside, offset outside
        let inner = modifier(ModifierKind::FracMassFlux, given_model(&grid), 2.0);
        let mut outer = modifier(ModifierKind::DeltaMassFlux, Box::new(inner), 5.0);
        run(&mut outer);
        all_cells(outer.shelf_base_mass_flux().unwrap(), 2.0 * 3e-3 + 5.0);
    }

    #[test]
    fn forcing_is_averaged_over_the_window() {
        let dataset = Dataset::new()
            .with_time("years", vec![0.0, 1.0])
            .with_series("delta_T", "Kelvin", vec![0.0, -2.0]);
        let grid = default_grid();
        let mut model = ScalarModifier::new(ModifierKind::DeltaT, constant_model(&grid), &config())
            .with_dataset(dataset);
        run(&mut model);
        assert_relative_eq!(model.value().unwrap(), -1.0, epsilon = 1e-12);

        // past the last record the forcing holds its last value
        model.update(DT, DT).unwrap();
        assert_relative_eq!(model.value().unwrap(), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn missing_forcing() {
        let grid = default_grid();
        let mut model = ScalarModifier::new(ModifierKind::FracMBP, constant_model(&grid), &config())
            .with_dataset(Dataset::new().with_series("delta_T", "K", vec![1.0]));
        assert!(matches!(model.init(), Err(OceanError::MissingInput { .. })));

        let mut model = ScalarModifier::new(ModifierKind::FracMBP, constant_model(&grid), &config());
        assert!(matches!(model.init(), Err(OceanError::MissingInput { .. })));
    }

    #[test]
    fn anomaly_is_added_per_cell() {
        let grid = grid(GridParameters::new(2, 1));
        let mut dataset = Dataset::new();
        dataset.insert_variable(
            "shelf_base_temperature_anomaly",
            "Kelvin",
            "",
            VariableData::Gridded(vec![vec![1.0, -1.0]]),
        );
        dataset.insert_variable(
            "shelf_base_mass_flux_anomaly",
            "kg m-2 s-1",
            "",
            VariableData::Gridded(vec![vec![0.0, 1e-3]]),
        );
        let mut model = Anomaly::new(grid.clone(), given_model(&grid), &config()).with_dataset(dataset);
        run(&mut model);

        let temperature = model.shelf_base_temperature().unwrap();
        assert_eq!(temperature[(0, 0)], 264.0);
        assert_eq!(temperature[(1, 0)], 262.0);
        assert_relative_eq!(model.shelf_base_mass_flux().unwrap()[(1, 0)], 4e-3);
        assert_eq!(
            model.melange_back_pressure_fraction().unwrap(),
            model.input().melange_back_pressure_fraction().unwrap()
        );
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn accessors_before_init_and_update() {
        let grid = default_grid();
        let mut model = modifier(ModifierKind::DeltaT, constant_model(&grid), 1.0);
        assert!(matches!(model.shelf_base_temperature(), Err(OceanError::NotInitialized { .. })));
        assert!(matches!(model.update(0.0, DT), Err(OceanError::NotInitialized { .. })));
        model.init().unwrap();
        assert!(matches!(model.sea_level_elevation(), Err(OceanError::NotUpdated { .. })));
    }

    #[test]
    fn update_is_idempotent() {
        let grid = default_grid();
        let inner = modifier(ModifierKind::DeltaT, given_model(&grid), -5.0);
        let mut model = modifier(ModifierKind::FracMassFlux, Box::new(inner), 0.5);
        run(&mut model);
        let first = model.outputs().unwrap().clone();
        model.update(0.0, DT).unwrap();
        assert_eq!(model.outputs().unwrap(), &first);
    }

    #[test]
    fn invalid_windows_leave_outputs_untouched() {
        let grid = default_grid();
        let mut model = modifier(ModifierKind::DeltaT, constant_model(&grid), 1.0);
        run(&mut model);
        let before = model.outputs().unwrap().clone();

        for (t, dt) in [(0.0, 0.0), (DT, -1.0), (0.5 * DT, DT)] {
            let err = model.update(t, dt).unwrap_err();
            assert!(matches!(err, OceanError::InvalidTimeWindow { .. }), "[{t}, {dt}]");
            assert_eq!(model.outputs().unwrap(), &before);
        }
        model.update(DT, DT).unwrap();
    }

    #[test]
    fn missing_thickness_fails_at_init() {
        let grid = Grid::shared(GridParameters::default()).unwrap();
        let mut model = modifier(ModifierKind::DeltaT, Box::new(PikOcean::new(grid, Arc::new(config()))), 1.0);
        assert!(matches!(model.init(), Err(OceanError::MissingInput { .. })));
    }

    #[test]
    fn cache_updates_the_wrapped_model_once_per_interval() {
        let mut config = config();
        config.cache.update_interval = 10.0;
        let dataset = Dataset::new()
            .with_time("seconds", vec![0.0, 20.0])
            .with_series("delta_T", "Kelvin", vec![0.0, 20.0]);
        let grid = default_grid();
        let inner = ScalarModifier::new(ModifierKind::DeltaT, constant_model(&grid), &config).with_dataset(dataset);
        let mut cache = Cache::new(Box::new(inner), &config).unwrap();
        cache.init().unwrap();

        cache.update(0.0, 4.0).unwrap();
        let first = cache.shelf_base_temperature().unwrap().clone();
        assert_eq!(cache.next_update(), Some(10.0));
        assert_eq!(cache.max_timestep(4.0).value(), Some(6.0));

        // the wrapped model averaged over [0, 10] and is not updated again yet
        cache.update(4.0, 4.0).unwrap();
        assert_eq!(cache.shelf_base_temperature().unwrap(), &first);

        cache.update(10.0, 4.0).unwrap();
        assert_eq!(cache.next_update(), Some(20.0));
        let shift = cache.shelf_base_temperature().unwrap()[(0, 0)] - first[(0, 0)];
        assert_relative_eq!(shift, 10.0, epsilon = 1e-9);
    }
}

mod partitioning {
    use super::*;

    /// Thickness varying across the domain so that every cell differs.
    fn add_varying_thickness(grid: &Grid) {
        let mut thk = ScalarField::new(grid, ICE_THICKNESS, Ghosts::Without);
        for (i, j) in grid.points() {
            thk[(i, j)] = 100.0 * (1 + i + 4 * j) as f64;
        }
        grid.variables().add(thk);
    }

    fn th_dataset(mx: usize, my: usize) -> Dataset {
        let mut dataset = Dataset::new();
        let theta = (0..mx * my).map(|k| 271.0 + 0.1 * k as f64).collect();
        dataset.insert_variable("theta_ocean", "Kelvin", "", VariableData::Gridded(vec![theta]));
        dataset.insert_variable("salinity_ocean", "g/kg", "", VariableData::Gridded(vec![vec![34.5; mx * my]]));
        dataset
    }

    #[test]
    fn partitions_match_the_single_worker_result() {
        let (mx, my) = (4, 5);
        let run_on = |rank: usize, size: usize| {
            let grid = Grid::shared(GridParameters::new(mx, my).partitioned(rank, size)).unwrap();
            add_varying_thickness(&grid);
            let base = GivenThOcean::new(grid.clone(), Arc::new(config())).with_dataset(th_dataset(mx, my));
            let mut model = modifier(ModifierKind::DeltaMassFlux, Box::new(base), 1e-4);
            run(&mut model);
            let mut dataset = Dataset::new();
            model.write_diagnostics(&mut dataset).unwrap();
            dataset
        };

        let whole = run_on(0, 1);
        let mut pieces = Dataset::new();
        for rank in 0..2 {
            let part = run_on(rank, 2);
            for name in ["shelfbtemp", "shelfbmassflux"] {
                // merge the rows written by this worker
                let record = part.gridded_record(name, 0).unwrap().to_vec();
                let merged = match pieces.gridded_record(name, 0) {
                    Some(existing) => existing
                        .iter()
                        .zip(&record)
                        .map(|(a, b)| if *a != 0.0 { *a } else { *b })
                        .collect(),
                    None => record,
                };
                pieces.insert_variable(name, "", "", VariableData::Gridded(vec![merged]));
            }
        }

        for name in ["shelfbtemp", "shelfbmassflux"] {
            assert_eq!(whole.gridded_record(name, 0), pieces.gridded_record(name, 0), "{name}");
        }
    }
}

mod factory {
    use super::*;

    #[test]
    fn chain_from_files() {
        let grid = default_grid();
        let given_path = temp_file("given.toml");
        given_dataset(&grid).save(&given_path).unwrap();
        let delta_path = temp_file("delta_SL.json");
        Dataset::new()
            .with_series("delta_SL", "m", vec![-5.0])
            .save(&delta_path)
            .unwrap();

        let mut config = config();
        config.given.forcing = ForcingOptions::with_file(&given_path);
        config.delta_sl = ForcingOptions::with_file(&delta_path);

        let factory = OceanFactory::new(grid, Arc::new(config));
        let mut model = factory.create("given,delta_SL,cache").unwrap();
        run(model.as_mut());

        all_cells(model.shelf_base_temperature().unwrap(), 263.0);
        assert_eq!(model.sea_level_elevation().unwrap(), -5.0);
        assert_eq!(model.max_timestep(0.0).value(), Some(SECONDS_PER_YEAR));

        std::fs::remove_file(given_path).unwrap();
        std::fs::remove_file(delta_path).unwrap();
    }
}
