//! Unit parsing and conversion.
//!
//! The parser accepts the notations found in forcing files:
//!
//! | Notation | Meaning |
//! |----------|---------|
//! | `kg m-2 s-1`, `kg m^-2 s^-1`, `kg/m^2/s` | mass flux |
//! | `m year-1`, `m / year` | velocity |
//! | `g/kg`, `psu` | salinity |
//! | `Kelvin`, `K`, `Celsius`, `degC` | temperature |
//!
//! Grammar:
//!
//! ```text
//! unit_expr  = term (('/' | 'per') term)*
//! term       = factor (('*' | '·' | ' ') factor)*
//! factor     = symbol (('^' | '**')? exponent)?
//! exponent   = '-'? [0-9]+
//! ```

use super::dimension::Dimension;
use super::registry::UNIT_REGISTRY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("empty unit string")]
    EmptyUnit,
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("invalid exponent in '{0}'")]
    InvalidExponent(String),
    #[error("unexpected character '{0}' in unit string")]
    UnexpectedChar(char),
    #[error("cannot convert from '{from_unit}' to '{to_unit}': incompatible dimensions ({from} vs {to})")]
    IncompatibleDimensions {
        from: Dimension,
        to: Dimension,
        from_unit: String,
        to_unit: String,
    },
}

/// A parsed unit: a product of registered symbols raised to integer powers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    original: String,
    dimension: Dimension,
    to_si_factor: f64,
    to_si_offset: f64,
}

impl Unit {
    pub fn parse(input: &str) -> Result<Self, ConversionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ConversionError::EmptyUnit);
        }

        let factors = parse_factors(input)?;

        let mut dimension = Dimension::dimensionless();
        let mut factor = 1.0;
        let mut offset = 0.0;
        for (symbol, exponent) in &factors {
            let info = UNIT_REGISTRY
                .lookup(symbol)
                .ok_or_else(|| ConversionError::UnknownUnit(symbol.clone()))?;
            dimension = dimension + info.dimension * *exponent;
            factor *= info.to_si_factor.powi(i32::from(*exponent));
            // An offset only makes sense for a lone temperature symbol;
            // "Celsius year-1" is a rate and converts like Kelvin.
            if factors.len() == 1 && *exponent == 1 {
                offset = info.to_si_offset;
            }
        }

        Ok(Self {
            original: input.to_string(),
            dimension,
            to_si_factor: factor,
            to_si_offset: offset,
        })
    }

    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    #[must_use]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.dimension == other.dimension
    }

    /// Build a converter from values in `self` to values in `target`.
    pub fn converter_to(&self, target: &Self) -> Result<Converter, ConversionError> {
        if !self.is_compatible(target) {
            return Err(ConversionError::IncompatibleDimensions {
                from: self.dimension,
                to: target.dimension,
                from_unit: self.original.clone(),
                to_unit: target.original.clone(),
            });
        }
        // x_si = x * f_s + o_s ; y = (x_si - o_t) / f_t
        let scale = self.to_si_factor / target.to_si_factor;
        let offset = (self.to_si_offset - target.to_si_offset) / target.to_si_factor;
        Ok(Converter { scale, offset })
    }
}

/// An affine map `y = scale * x + offset` between two compatible units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    pub scale: f64,
    pub offset: f64,
}

impl Converter {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.scale * value + self.offset
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// Convenience wrapper: the converter between two unit strings.
pub fn converter(from: &str, to: &str) -> Result<Converter, ConversionError> {
    Unit::parse(from)?.converter_to(&Unit::parse(to)?)
}

fn parse_factors(input: &str) -> Result<Vec<(String, i8)>, ConversionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut factors = Vec::new();
    let mut position = 0;
    let mut denominator = false;

    while position < chars.len() {
        let c = chars[position];
        if c.is_whitespace() || c == '*' || c == '·' {
            position += 1;
        } else if c == '/' {
            denominator = true;
            position += 1;
        } else if c.is_ascii_digit() {
            // a bare "1" (as in "1" or "1/s") is a dimensionless factor
            let start = position;
            while position < chars.len() && chars[position].is_ascii_digit() {
                position += 1;
            }
            let number: String = chars[start..position].iter().collect();
            if number != "1" {
                return Err(ConversionError::InvalidExponent(number));
            }
        } else if c.is_alphabetic() || c == '_' || c == '%' {
            let start = position;
            while position < chars.len()
                && (chars[position].is_alphabetic() || chars[position] == '_' || chars[position] == '%')
            {
                position += 1;
            }
            let symbol: String = chars[start..position].iter().collect();
            if symbol == "per" {
                denominator = true;
                continue;
            }
            let (exponent, next) = parse_exponent(&chars, position)?;
            position = next;
            let exponent = if denominator { -exponent } else { exponent };
            factors.push((symbol, exponent));
        } else {
            return Err(ConversionError::UnexpectedChar(c));
        }
    }

    Ok(factors)
}

fn parse_exponent(chars: &[char], mut position: usize) -> Result<(i8, usize), ConversionError> {
    if position < chars.len() && chars[position] == '^' {
        position += 1;
    } else if position + 1 < chars.len() && chars[position] == '*' && chars[position + 1] == '*' {
        position += 2;
    }

    let start = position;
    if position < chars.len() && chars[position] == '-' {
        position += 1;
    }
    while position < chars.len() && chars[position].is_ascii_digit() {
        position += 1;
    }
    let text: String = chars[start..position].iter().collect();
    match text.as_str() {
        "" => Ok((1, position)),
        _ => text
            .parse::<i8>()
            .map(|e| (e, position))
            .map_err(|_| ConversionError::InvalidExponent(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equivalent_notations() {
        let a = Unit::parse("kg m-2 s-1").unwrap();
        let b = Unit::parse("kg m^-2 s^-1").unwrap();
        let c = Unit::parse("kg / m^2 s").unwrap();
        assert_eq!(a.dimension(), b.dimension());
        assert_eq!(b.dimension(), c.dimension());
        assert_eq!(a.dimension(), Dimension::new(1, -2, -1, 0));
    }

    #[test]
    fn melt_rate_per_year_to_per_second() {
        let conv = converter("m year-1", "m s-1").unwrap();
        assert_relative_eq!(conv.apply(31_556_926.0), 1.0);
        assert_eq!(conv.offset, 0.0);
    }

    #[test]
    fn celsius_to_kelvin_is_affine() {
        let conv = converter("Celsius", "Kelvin").unwrap();
        assert_relative_eq!(conv.apply(-1.7), 271.45);
        let back = converter("K", "degC").unwrap();
        assert_relative_eq!(back.apply(273.15), 0.0);
    }

    #[test]
    fn temperature_rates_have_no_offset() {
        let conv = converter("Celsius / year", "K s-1").unwrap();
        assert_eq!(conv.offset, 0.0);
    }

    #[test]
    fn salinity_units() {
        let conv = converter("psu", "g/kg").unwrap();
        assert_relative_eq!(conv.apply(35.0), 35.0);
        assert!(Unit::parse("g/kg").unwrap().dimension().is_dimensionless());
        assert!(Unit::parse("1").unwrap().dimension().is_dimensionless());
    }

    #[test]
    fn incompatible_units_fail() {
        let err = converter("Kelvin", "meters").unwrap_err();
        assert!(matches!(err, ConversionError::IncompatibleDimensions { .. }));
    }

    #[test]
    fn unknown_unit_fails() {
        assert!(matches!(
            Unit::parse("furlong"),
            Err(ConversionError::UnknownUnit(_))
        ));
        assert!(matches!(Unit::parse("  "), Err(ConversionError::EmptyUnit)));
    }
}
