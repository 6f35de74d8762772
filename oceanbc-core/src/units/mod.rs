//! Unit parsing and conversion for forcing data.
//!
//! Forcing files record the units of every variable. Models declare the units
//! they compute in, and values are converted on read:
//!
//! ```
//! use oceanbc_core::units::converter;
//!
//! let to_kelvin = converter("Celsius", "Kelvin").unwrap();
//! assert!((to_kelvin.apply(-1.7) - 271.45).abs() < 1e-12);
//!
//! let to_si = converter("m year-1", "m s-1").unwrap();
//! assert!(to_si.offset == 0.0);
//! ```
//!
//! - [`dimension`]: physical dimension exponents
//! - [`registry`]: known symbols with their SI factors
//! - [`conversion`]: the [`Unit`] type and affine [`Converter`]

pub mod conversion;
pub mod dimension;
pub mod registry;

pub use conversion::{converter, ConversionError, Converter, Unit};
pub use dimension::Dimension;
pub use registry::{UnitInfo, UnitRegistry, SECONDS_PER_YEAR, UNIT_REGISTRY};
