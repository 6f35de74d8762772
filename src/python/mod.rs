use crate::{
    Dataset, Grid, GridParameters, OceanConfig, OceanError, OceanFactory, OceanModel, ScalarField, ICE_THICKNESS,
};
use numpy::{PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyIOError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::Arc;

fn to_py_err(e: OceanError) -> PyErr {
    match e {
        OceanError::MissingInput { .. } => PyKeyError::new_err(e.to_string()),
        OceanError::Io(_) => PyIOError::new_err(e.to_string()),
        OceanError::NotInitialized { .. }
        | OceanError::NotUpdated { .. }
        | OceanError::AlreadyInitialized { .. }
        | OceanError::NumericalFailure { .. } => PyRuntimeError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

/// An ocean model chain, driven from Python.
#[pyclass(unsendable)]
#[pyo3(name = "OceanModel")]
pub struct PyOceanModel {
    grid: Arc<Grid>,
    model: Box<dyn OceanModel>,
}

#[pymethods]
impl PyOceanModel {
    /// Create a model chain.
    ///
    /// Parameters
    /// ----------
    /// description : str
    ///     Base model followed by modifiers, e.g. ``"given,delta_T"``.
    /// grid_parameters : dict, optional
    ///     Grid size, extent and partition (``mx``, ``my``, ``lx``, ``ly``, ``rank``, ``size``).
    /// config : dict, optional
    ///     Configuration sections, as in the TOML configuration file.
    #[staticmethod]
    #[pyo3(signature = (description, grid_parameters=None, config=None))]
    fn create(
        description: &str,
        grid_parameters: Option<Bound<'_, PyAny>>,
        config: Option<Bound<'_, PyAny>>,
    ) -> PyResult<Self> {
        let grid_parameters: GridParameters = match grid_parameters {
            Some(p) => pythonize::depythonize_bound(p).map_err(|e| PyValueError::new_err(e.to_string()))?,
            None => GridParameters::default(),
        };
        let config: OceanConfig = match config {
            Some(c) => pythonize::depythonize_bound(c).map_err(|e| PyValueError::new_err(e.to_string()))?,
            None => OceanConfig::default(),
        };
        config.validate().map_err(to_py_err)?;

        let grid = Grid::shared(grid_parameters).map_err(to_py_err)?;
        let model = OceanFactory::new(grid.clone(), Arc::new(config))
            .create(description)
            .map_err(to_py_err)?;
        Ok(Self { grid, model })
    }

    #[getter]
    fn name(&self) -> String {
        self.model.name().to_string()
    }

    /// Publish the ice thickness (m) on the local partition, shape ``(ym, xm)``.
    fn set_ice_thickness(&self, thickness: PyReadonlyArray2<'_, f64>) -> PyResult<()> {
        let values: ndarray::Array2<f64> = thickness.as_array().to_owned();
        let field = ScalarField::from_values(&self.grid, ICE_THICKNESS, "m", values).map_err(to_py_err)?;
        self.grid.variables().add(field);
        Ok(())
    }

    fn init(&mut self) -> PyResult<()> {
        self.model.init().map_err(to_py_err)
    }

    /// Update over ``[t, t + dt]`` (seconds).
    fn update(&mut self, t: f64, dt: f64) -> PyResult<()> {
        self.model.update(t, dt).map_err(to_py_err)
    }

    /// Longest allowed step from ``t``, or ``None`` if unlimited.
    fn max_timestep(&self, t: f64) -> Option<f64> {
        self.model.max_timestep(t).value()
    }

    fn shelf_base_temperature<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let field = self.model.shelf_base_temperature().map_err(to_py_err)?;
        Ok(PyArray2::from_owned_array_bound(py, field.to_array()))
    }

    fn shelf_base_mass_flux<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let field = self.model.shelf_base_mass_flux().map_err(to_py_err)?;
        Ok(PyArray2::from_owned_array_bound(py, field.to_array()))
    }

    fn melange_back_pressure_fraction<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let field = self.model.melange_back_pressure_fraction().map_err(to_py_err)?;
        Ok(PyArray2::from_owned_array_bound(py, field.to_array()))
    }

    fn sea_level_elevation(&self) -> PyResult<f64> {
        self.model.sea_level_elevation().map_err(to_py_err)
    }

    /// Write the current outputs to a ``.toml`` or ``.json`` dataset.
    fn write_diagnostics(&self, path: &str) -> PyResult<()> {
        let mut dataset = Dataset::new();
        self.model.write_diagnostics(&mut dataset).map_err(to_py_err)?;
        dataset.save(path).map_err(to_py_err)
    }
}

#[pymodule]
#[pyo3(name = "_lib")]
fn oceanbc(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<PyOceanModel>()?;
    Ok(())
}
