//! Registry of the units that appear in ocean forcing files.
//!
//! # Conversion Factor Convention
//!
//! Factors convert FROM the registered unit TO the SI base unit, and the
//! offset is added afterwards (only used for `Celsius`):
//! - `km` has factor 1e3
//! - `year` has factor 31556926 (the mean tropical year, as used by the
//!   ice-sheet model clock)
//! - `Celsius` has factor 1 and offset 273.15

use super::dimension::Dimension;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Seconds in one year.
pub const SECONDS_PER_YEAR: f64 = 31_556_926.0;

#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub name: String,
    pub dimension: Dimension,
    pub to_si_factor: f64,
    pub to_si_offset: f64,
}

impl UnitInfo {
    fn new(name: &str, dimension: Dimension, to_si_factor: f64) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            to_si_factor,
            to_si_offset: 0.0,
        }
    }

    fn affine(name: &str, dimension: Dimension, to_si_factor: f64, to_si_offset: f64) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            to_si_factor,
            to_si_offset,
        }
    }
}

/// SI prefixes accepted in front of prefixable symbols.
static SI_PREFIXES: &[(&str, f64)] = &[
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
];

/// Symbols that accept an SI prefix.
static PREFIXABLE: &[&str] = &["m", "g", "s", "Pa", "W", "J", "N"];

pub struct UnitRegistry {
    units: HashMap<String, UnitInfo>,
}

impl UnitRegistry {
    fn standard() -> Self {
        let mut units = HashMap::new();
        let mut add = |aliases: &[&str], info: UnitInfo| {
            for alias in aliases {
                units.insert(alias.to_string(), info.clone());
            }
        };

        add(&["m", "meter", "meters", "metre", "metres"], UnitInfo::new("m", Dimension::LENGTH, 1.0));
        add(&["kg"], UnitInfo::new("kg", Dimension::MASS, 1.0));
        add(&["g", "gram", "grams"], UnitInfo::new("g", Dimension::MASS, 1e-3));
        add(&["s", "sec", "second", "seconds"], UnitInfo::new("s", Dimension::TIME, 1.0));
        add(&["min", "minute", "minutes"], UnitInfo::new("min", Dimension::TIME, 60.0));
        add(&["h", "hour", "hours"], UnitInfo::new("h", Dimension::TIME, 3600.0));
        add(&["day", "days", "d"], UnitInfo::new("day", Dimension::TIME, 86400.0));
        add(
            &["year", "years", "yr", "a", "common_year"],
            UnitInfo::new("year", Dimension::TIME, SECONDS_PER_YEAR),
        );
        add(&["K", "Kelvin", "kelvin", "degK"], UnitInfo::new("K", Dimension::TEMPERATURE, 1.0));
        add(
            &["Celsius", "celsius", "degC", "degree_Celsius", "degrees_Celsius"],
            UnitInfo::affine("Celsius", Dimension::TEMPERATURE, 1.0, 273.15),
        );
        add(&["Pa", "pascal"], UnitInfo::new("Pa", Dimension::PRESSURE, 1.0));
        add(&["bar"], UnitInfo::new("bar", Dimension::PRESSURE, 1e5));
        add(&["N", "newton"], UnitInfo::new("N", Dimension::FORCE, 1.0));
        add(&["J", "joule"], UnitInfo::new("J", Dimension::ENERGY, 1.0));
        add(&["W", "watt"], UnitInfo::new("W", Dimension::POWER, 1.0));
        // practical salinity is numerically equal to g/kg
        add(&["psu", "PSU"], UnitInfo::new("psu", Dimension::dimensionless(), 1e-3));
        add(&["percent", "%"], UnitInfo::new("percent", Dimension::dimensionless(), 1e-2));
        add(&["1", "dimensionless"], UnitInfo::new("1", Dimension::dimensionless(), 1.0));

        Self { units }
    }

    /// Look up a symbol, trying SI prefixes on prefixable symbols.
    pub fn lookup(&self, symbol: &str) -> Option<UnitInfo> {
        if let Some(info) = self.units.get(symbol) {
            return Some(info.clone());
        }
        SI_PREFIXES.iter().find_map(|(prefix, factor)| {
            let base = symbol.strip_prefix(prefix)?;
            if !PREFIXABLE.contains(&base) {
                return None;
            }
            let info = self.units.get(base)?;
            Some(UnitInfo::new(symbol, info.dimension, info.to_si_factor * factor))
        })
    }
}

pub static UNIT_REGISTRY: LazyLock<UnitRegistry> = LazyLock::new(UnitRegistry::standard);
