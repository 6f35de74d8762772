//! Self-describing forcing datasets and the [`ForcingReader`] seam.
//!
//! A dataset holds an optional time axis and named variables. Each variable
//! records its units and either a scalar series (one value per record) or
//! gridded records (one row-major `my × mx` array per record, covering the
//! whole grid). A dataset without a time axis holds a single record that is
//! constant in time.
//!
//! Datasets are stored as TOML or JSON, chosen by file extension:
//!
//! ```toml
//! [time]
//! units = "seconds"
//! values = [0.0]
//!
//! [variables.delta_T]
//! units = "Kelvin"
//! values = [-5.0]
//! ```

use crate::errors::{OceanError, OceanResult};
use crate::forcing::{ForcingSeries, GriddedForcing};
use crate::grid::Grid;
use crate::timeseries::{FloatValue, TimeAxis};
use crate::units::converter;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads forcing variables, converted to the units a model asks for.
///
/// Implementations must return every record converted to `units`, and must
/// fail with [`OceanError::MissingInput`] when the variable does not exist.
pub trait ForcingReader {
    /// Human-readable description of the source, used in error messages.
    fn source(&self) -> String;

    fn read_series(&self, name: &str, units: &str) -> OceanResult<ForcingSeries>;

    /// Read a gridded variable, keeping only the cells of this worker's partition.
    fn read_gridded(&self, name: &str, units: &str, grid: &Grid) -> OceanResult<GriddedForcing>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeVariable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableData {
    /// One value per time record.
    Series(Vec<FloatValue>),
    /// One flattened `my × mx` array per time record.
    Gridded(Vec<Vec<FloatValue>>),
}

impl VariableData {
    fn n_records(&self) -> usize {
        match self {
            VariableData::Series(values) => values.len(),
            VariableData::Gridded(records) => records.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    pub values: VariableData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeVariable>,
    #[serde(default)]
    pub variables: BTreeMap<String, Variable>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

fn format_of(path: &Path) -> OceanResult<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(OceanError::InvalidConfiguration(format!(
            "unsupported dataset format '{}' (expected .toml or .json)",
            path.display()
        ))),
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a dataset from disk. A missing file is a missing-input error.
    pub fn open(path: impl AsRef<Path>) -> OceanResult<Self> {
        let path = path.as_ref();
        let format = format_of(path)?;
        if !path.exists() {
            return Err(OceanError::missing(path.display().to_string(), "file system"));
        }
        let text = fs::read_to_string(path)?;
        let mut dataset: Dataset = match format {
            Format::Toml => toml::from_str(&text)?,
            Format::Json => serde_json::from_str(&text)?,
        };
        dataset.path = Some(path.to_path_buf());
        debug!(path = %path.display(), variables = dataset.variables.len(), "opened dataset");
        Ok(dataset)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> OceanResult<()> {
        let path = path.as_ref();
        let text = match format_of(path)? {
            Format::Toml => toml::to_string(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };
        fs::write(path, text)?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_time(mut self, units: &str, values: Vec<f64>) -> Self {
        self.time = Some(TimeVariable {
            units: Some(units.to_string()),
            values,
        });
        self
    }

    /// Add a scalar series with one value per time record.
    pub fn with_series(mut self, name: &str, units: &str, values: Vec<FloatValue>) -> Self {
        self.insert_variable(name, units, "", VariableData::Series(values));
        self
    }

    pub fn insert_variable(&mut self, name: &str, units: &str, long_name: &str, values: VariableData) {
        self.variables.insert(
            name.to_string(),
            Variable {
                units: Some(units.to_string()),
                long_name: (!long_name.is_empty()).then(|| long_name.to_string()),
                values,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// One record of a gridded variable, if present.
    pub fn gridded_record(&self, name: &str, index: usize) -> Option<&[FloatValue]> {
        match &self.variables.get(name)?.values {
            VariableData::Gridded(records) => records.get(index).map(Vec::as_slice),
            VariableData::Series(_) => None,
        }
    }

    fn variable(&self, name: &str) -> OceanResult<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| OceanError::missing(name, self.source()))
    }

    /// The time axis in seconds, checked against the number of records.
    fn time_axis(&self, name: &str, n_records: usize) -> OceanResult<TimeAxis> {
        let axis = match &self.time {
            None => TimeAxis::constant(),
            Some(time) => {
                let units = time
                    .units
                    .as_deref()
                    .ok_or_else(|| OceanError::malformed("time", "time axis has no units"))?;
                let to_seconds = converter(units, "seconds")
                    .map_err(|e| OceanError::malformed("time", e.to_string()))?;
                TimeAxis::new(time.values.iter().map(|&t| to_seconds.apply(t)).collect())?
            }
        };
        if axis.len() != n_records {
            return Err(OceanError::malformed(
                name,
                format!("{} records but {} time values", n_records, axis.len()),
            ));
        }
        Ok(axis)
    }

    fn unit_converter(&self, name: &str, variable: &Variable, units: &str) -> OceanResult<crate::units::Converter> {
        let stored = variable
            .units
            .as_deref()
            .ok_or_else(|| OceanError::malformed(name, "variable has no units attribute"))?;
        converter(stored, units).map_err(|e| OceanError::malformed(name, e.to_string()))
    }
}

impl ForcingReader for Dataset {
    fn source(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "in-memory dataset".to_string(),
        }
    }

    fn read_series(&self, name: &str, units: &str) -> OceanResult<ForcingSeries> {
        let variable = self.variable(name)?;
        let values = match &variable.values {
            VariableData::Series(values) => values,
            VariableData::Gridded(_) => {
                return Err(OceanError::malformed(name, "expected a scalar series, found gridded data"))
            }
        };
        let convert = self.unit_converter(name, variable, units)?;
        let time = self.time_axis(name, values.len())?;
        ForcingSeries::new(
            name,
            units,
            time,
            values.iter().map(|&v| convert.apply(v)).collect(),
        )
        .map(|series| series.with_long_name(variable.long_name.as_deref().unwrap_or("")))
    }

    fn read_gridded(&self, name: &str, units: &str, grid: &Grid) -> OceanResult<GriddedForcing> {
        let variable = self.variable(name)?;
        let records = match &variable.values {
            VariableData::Gridded(records) => records,
            VariableData::Series(_) => {
                return Err(OceanError::malformed(name, "expected gridded data, found a scalar series"))
            }
        };
        let convert = self.unit_converter(name, variable, units)?;
        let time = self.time_axis(name, variable.values.n_records())?;

        let (mx, my) = (grid.mx(), grid.my());
        let p = grid.partition();
        let mut local = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.len() != mx * my {
                return Err(OceanError::malformed(
                    name,
                    format!(
                        "record {index} has {} values, the grid has {mx}x{my} cells",
                        record.len()
                    ),
                ));
            }
            local.push(Array2::from_shape_fn((p.ym, p.xm), |(r, c)| {
                convert.apply(record[(p.ys + r) * mx + p.xs + c])
            }));
        }

        GriddedForcing::new(name, units, time, local)
            .map(|forcing| forcing.with_long_name(variable.long_name.as_deref().unwrap_or("")))
    }
}
