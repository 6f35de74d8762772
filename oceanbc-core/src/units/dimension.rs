//! Physical dimensions for unit validation.
//!
//! Dimensions are stored as integer exponents of the base quantities that
//! occur in ocean forcing data: mass, length, time and temperature.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// The physical dimension of a quantity.
///
/// For example a mass flux (kg m-2 s-1) has mass = 1, length = -2, time = -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Dimension {
    pub mass: i8,
    pub length: i8,
    pub time: i8,
    pub temperature: i8,
}

impl Dimension {
    #[must_use]
    pub const fn dimensionless() -> Self {
        Self::new(0, 0, 0, 0)
    }

    #[must_use]
    pub const fn new(mass: i8, length: i8, time: i8, temperature: i8) -> Self {
        Self {
            mass,
            length,
            time,
            temperature,
        }
    }

    pub const MASS: Self = Self::new(1, 0, 0, 0);
    pub const LENGTH: Self = Self::new(0, 1, 0, 0);
    pub const TIME: Self = Self::new(0, 0, 1, 0);
    pub const TEMPERATURE: Self = Self::new(0, 0, 0, 1);
    /// M L⁻¹ T⁻²
    pub const PRESSURE: Self = Self::new(1, -1, -2, 0);
    /// M L T⁻²
    pub const FORCE: Self = Self::new(1, 1, -2, 0);
    /// M L² T⁻²
    pub const ENERGY: Self = Self::new(1, 2, -2, 0);
    /// M L² T⁻³
    pub const POWER: Self = Self::new(1, 2, -3, 0);

    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::dimensionless()
    }

    /// True if this is exactly a temperature (not a temperature rate or
    /// gradient). Only such units carry an affine offset in conversions.
    #[must_use]
    pub fn is_pure_temperature(&self) -> bool {
        *self == Self::TEMPERATURE
    }

    #[must_use]
    pub fn pow(self, exponent: i8) -> Self {
        Self::new(
            self.mass * exponent,
            self.length * exponent,
            self.time * exponent,
            self.temperature * exponent,
        )
    }
}

impl Add for Dimension {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.mass + rhs.mass,
            self.length + rhs.length,
            self.time + rhs.time,
            self.temperature + rhs.temperature,
        )
    }
}

impl Sub for Dimension {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for Dimension {
    type Output = Self;

    fn neg(self) -> Self {
        self.pow(-1)
    }
}

impl Mul<i8> for Dimension {
    type Output = Self;

    fn mul(self, rhs: i8) -> Self {
        self.pow(rhs)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }
        let parts: Vec<String> = [
            ("M", self.mass),
            ("L", self.length),
            ("T", self.time),
            ("Θ", self.temperature),
        ]
        .iter()
        .filter(|(_, exp)| *exp != 0)
        .map(|(symbol, exp)| match exp {
            1 => symbol.to_string(),
            _ => format!("{symbol}^{exp}"),
        })
        .collect();
        write!(f, "{}", parts.join(" "))
    }
}
