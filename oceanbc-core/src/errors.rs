use crate::timeseries::Time;
use thiserror::Error;

/// Error type for ocean model operations.
///
/// The first five variants are the failure kinds a driver must treat as hard
/// errors: nothing in this workspace substitutes defaults for missing physical
/// inputs.
#[derive(Error, Debug)]
pub enum OceanError {
    /// A required variable or field could not be found.
    #[error("missing required input '{variable}' ({location})")]
    MissingInput { variable: String, location: String },
    /// Forcing data exists but cannot be used as stored.
    #[error("malformed forcing data for '{variable}': {reason}")]
    MalformedForcing { variable: String, reason: String },
    /// A physical input lies outside the range a model is valid for.
    #[error("invalid value {value} for '{variable}': {reason}")]
    InvalidValue {
        variable: String,
        value: f64,
        reason: String,
    },
    #[error("invalid time window [{t}, {t} + {dt}]: {reason}")]
    InvalidTimeWindow { t: Time, dt: Time, reason: String },
    #[error("numerical failure in {model}: {reason}")]
    NumericalFailure { model: String, reason: String },

    #[error("{model} has not been initialized")]
    NotInitialized { model: String },
    #[error("{model} has been initialized but not updated")]
    NotUpdated { model: String },
    #[error("{model} is already initialized")]
    AlreadyInitialized { model: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("shape mismatch for '{name}': expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("unit error: {0}")]
    Units(#[from] crate::units::ConversionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("could not write TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OceanError {
    pub fn missing(variable: impl Into<String>, location: impl Into<String>) -> Self {
        OceanError::MissingInput {
            variable: variable.into(),
            location: location.into(),
        }
    }

    pub fn malformed(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        OceanError::MalformedForcing {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_value(variable: impl Into<String>, value: f64, reason: impl Into<String>) -> Self {
        OceanError::InvalidValue {
            variable: variable.into(),
            value,
            reason: reason.into(),
        }
    }
}

/// Convenience type for `Result<T, OceanError>`.
pub type OceanResult<T> = Result<T, OceanError>;
