//! Time-dependent forcing read from datasets.
//!
//! [`ForcingSeries`] holds a spatially uniform series and [`GriddedForcing`]
//! one array per record, restricted to the local partition. Both evaluate the
//! "value for this step" as the average over the update window `[t, t + dt]`
//! using the weights computed by [`TimeAxis`].

use crate::dataset::Dataset;
use crate::errors::{OceanError, OceanResult};
use crate::field::ScalarField;
use crate::timeseries::{FloatValue, InterpolationStrategy, Periodicity, Time, TimeAxis, Weights};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Where a model finds its forcing and how the records are evaluated in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingOptions {
    /// Dataset holding the forcing variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Period of the forcing in seconds; `None` for non-periodic forcing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Time>,
    /// Start of the forcing period, in seconds.
    pub reference_time: Time,
    pub interpolation: InterpolationStrategy,
}

impl ForcingOptions {
    pub fn with_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            ..Default::default()
        }
    }

    /// Open the configured dataset. `section` names the configuration section
    /// in the error raised when no file was configured.
    pub fn open(&self, section: &str) -> OceanResult<Dataset> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| OceanError::missing(format!("{section}.file"), "configuration"))?;
        Dataset::open(file)
    }

    fn periodicity(&self) -> OceanResult<Option<Periodicity>> {
        self.period
            .map(|period| Periodicity::new(period, self.reference_time))
            .transpose()
    }
}

/// How a forcing variable is sampled over a window.
#[derive(Debug, Clone, Default, PartialEq)]
struct Sampling {
    interpolation: InterpolationStrategy,
    periodicity: Option<Periodicity>,
}

impl Sampling {
    fn weights(&self, name: &str, time: &TimeAxis, t: Time, dt: Time) -> Weights {
        let weights = match &self.periodicity {
            Some(periodicity) => time.periodic_window_weights(t, dt, self.interpolation, periodicity),
            None => time.window_weights(t, dt, self.interpolation),
        };
        if weights.clamped {
            warn!(
                variable = name,
                t,
                dt,
                first = time.first(),
                last = time.last(),
                "requested window lies outside the forcing time range; using the nearest record"
            );
        }
        weights
    }
}

/// A spatially uniform forcing variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcingSeries {
    name: String,
    units: String,
    long_name: String,
    time: TimeAxis,
    values: Vec<FloatValue>,
    sampling: Sampling,
}

impl ForcingSeries {
    pub fn new(name: &str, units: &str, time: TimeAxis, values: Vec<FloatValue>) -> OceanResult<Self> {
        if values.len() != time.len() {
            return Err(OceanError::malformed(
                name,
                format!("{} values for {} time records", values.len(), time.len()),
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(OceanError::malformed(name, format!("non-finite value {bad}")));
        }
        Ok(Self {
            name: name.to_string(),
            units: units.to_string(),
            long_name: String::new(),
            time,
            values,
            sampling: Sampling::default(),
        })
    }

    /// A series holding one value for all time.
    pub fn constant(name: &str, units: &str, value: FloatValue) -> OceanResult<Self> {
        Self::new(name, units, TimeAxis::constant(), vec![value])
    }

    pub fn with_long_name(mut self, long_name: &str) -> Self {
        self.long_name = long_name.to_string();
        self
    }

    /// Apply the interpolation and periodicity of `options`.
    pub fn with_options(mut self, options: &ForcingOptions) -> OceanResult<Self> {
        self.sampling = Sampling {
            interpolation: options.interpolation,
            periodicity: options.periodicity()?,
        };
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    pub fn values(&self) -> &[FloatValue] {
        &self.values
    }

    /// Interpolated value at `t`.
    pub fn value(&self, t: Time) -> FloatValue {
        self.average(t, 0.0)
    }

    /// Average value over `[t, t + dt]`.
    pub fn average(&self, t: Time, dt: Time) -> FloatValue {
        self.sampling
            .weights(&self.name, &self.time, t, dt)
            .apply(&self.values)
    }
}

/// A gridded forcing variable, one local-partition array per record.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedForcing {
    name: String,
    units: String,
    long_name: String,
    time: TimeAxis,
    records: Vec<Array2<FloatValue>>,
    sampling: Sampling,
}

impl GriddedForcing {
    pub fn new(name: &str, units: &str, time: TimeAxis, records: Vec<Array2<FloatValue>>) -> OceanResult<Self> {
        if records.len() != time.len() {
            return Err(OceanError::malformed(
                name,
                format!("{} records for {} time values", records.len(), time.len()),
            ));
        }
        if let Some(first) = records.first() {
            if records.iter().any(|r| r.shape() != first.shape()) {
                return Err(OceanError::malformed(name, "records have different shapes"));
            }
        }
        if records.iter().any(|r| r.iter().any(|v| !v.is_finite())) {
            return Err(OceanError::malformed(name, "non-finite value in gridded data"));
        }
        Ok(Self {
            name: name.to_string(),
            units: units.to_string(),
            long_name: String::new(),
            time,
            records,
            sampling: Sampling::default(),
        })
    }

    pub fn with_long_name(mut self, long_name: &str) -> Self {
        self.long_name = long_name.to_string();
        self
    }

    pub fn with_options(mut self, options: &ForcingOptions) -> OceanResult<Self> {
        self.sampling = Sampling {
            interpolation: options.interpolation,
            periodicity: options.periodicity()?,
        };
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    /// The local-partition array of record `index`, if stored.
    pub fn record(&self, index: usize) -> Option<&Array2<FloatValue>> {
        self.records.get(index)
    }

    fn check_shape(&self, field: &ScalarField) -> OceanResult<()> {
        let p = field.partition();
        match self.records.first() {
            Some(record) if record.shape() != [p.ym, p.xm] => Err(OceanError::ShapeMismatch {
                name: self.name.clone(),
                expected: vec![p.ym, p.xm],
                found: record.shape().to_vec(),
            }),
            _ => Ok(()),
        }
    }

    /// Copy record `index` into the owned cells of `field`.
    pub fn record_into(&self, index: usize, field: &mut ScalarField) -> OceanResult<()> {
        self.check_shape(field)?;
        let record = self.records.get(index).ok_or_else(|| {
            OceanError::malformed(&self.name, format!("no record {index} ({} stored)", self.records.len()))
        })?;
        field.values_mut().assign(record);
        Ok(())
    }

    /// Store the average over `[t, t + dt]` in the owned cells of `field`.
    pub fn average_into(&self, t: Time, dt: Time, field: &mut ScalarField) -> OceanResult<()> {
        self.check_shape(field)?;
        let weights = self.sampling.weights(&self.name, &self.time, t, dt);
        let mut values = field.values_mut();
        values.fill(0.0);
        for (index, weight) in &weights.terms {
            values.scaled_add(*weight, &self.records[*index]);
        }
        Ok(())
    }
}
