//! Unit-suffixed literal normalization.
//!
//! Conditions may write literals in display units (`85F`, `25mph`, `3mi`);
//! observations are always canonical, so literals are converted once at
//! parse time.

use crate::error::UnitError;
use std::fmt;
use wxalarm_common::fields::{Field, UnitFamily};

const MPH_TO_MS: f64 = 0.44704;
const MI_TO_KM: f64 = 1.609344;

/// A unit suffix recognised on a condition literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Fahrenheit,
    Celsius,
    Mph,
    MetersPerSecond,
    Kilometers,
    Miles,
}

impl Unit {
    /// Match a suffix case-insensitively.
    pub fn from_suffix(suffix: &str) -> Option<Unit> {
        match suffix.to_ascii_lowercase().as_str() {
            "f" => Some(Unit::Fahrenheit),
            "c" => Some(Unit::Celsius),
            "mph" => Some(Unit::Mph),
            "m/s" | "ms" => Some(Unit::MetersPerSecond),
            "km" => Some(Unit::Kilometers),
            "mi" => Some(Unit::Miles),
            _ => None,
        }
    }

    pub fn family(self) -> UnitFamily {
        match self {
            Unit::Fahrenheit | Unit::Celsius => UnitFamily::Temperature,
            Unit::Mph | Unit::MetersPerSecond => UnitFamily::Speed,
            Unit::Kilometers | Unit::Miles => UnitFamily::Distance,
        }
    }

    /// Convert `value` in this unit to the family's canonical unit.
    pub fn to_canonical(self, value: f64) -> f64 {
        match self {
            Unit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            Unit::Mph => value * MPH_TO_MS,
            Unit::Miles => value * MI_TO_KM,
            Unit::Celsius | Unit::MetersPerSecond | Unit::Kilometers => value,
        }
    }

    /// Suffix as shown after a number, including any separating space.
    pub fn display_suffix(self) -> &'static str {
        match self {
            Unit::Fahrenheit => "°F",
            Unit::Celsius => "°C",
            Unit::Mph => " mph",
            Unit::MetersPerSecond => " m/s",
            Unit::Kilometers => " km",
            Unit::Miles => " mi",
        }
    }
}

impl fmt::Display for Unit {
    /// Source spelling, as accepted by [`Unit::from_suffix`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self {
            Unit::Fahrenheit => "F",
            Unit::Celsius => "C",
            Unit::Mph => "mph",
            Unit::MetersPerSecond => "m/s",
            Unit::Kilometers => "km",
            Unit::Miles => "mi",
        };
        f.write_str(suffix)
    }
}

/// Suffixes accepted for a unit family, for error messages.
pub fn accepted_suffixes(family: UnitFamily) -> &'static str {
    match family {
        UnitFamily::None => "no unit",
        UnitFamily::Temperature => "F or C",
        UnitFamily::Speed => "mph or m/s",
        UnitFamily::Distance => "km or mi",
    }
}

/// Normalize a literal for `field` to the field's canonical unit.
///
/// A literal with no suffix is taken as already canonical.
///
/// # Errors
///
/// Returns [`UnitError`] when the suffix is unrecognised or belongs to a
/// different unit family than `field`.
///
/// # Examples
///
/// ```
/// use wxalarm_alert::units::normalize;
/// use wxalarm_common::fields::Field;
///
/// let (c, _) = normalize(Field::Temperature, 212.0, Some("F"), "212F").unwrap();
/// assert!((c - 100.0).abs() < 1e-9);
/// assert!(normalize(Field::Humidity, 40.0, Some("mph"), "40mph").is_err());
/// ```
pub fn normalize(
    field: Field,
    value: f64,
    suffix: Option<&str>,
    literal: &str,
) -> Result<(f64, Option<Unit>), UnitError> {
    let Some(suffix) = suffix else {
        return Ok((value, None));
    };
    match Unit::from_suffix(suffix) {
        Some(unit) if unit.family() == field.family() => Ok((unit.to_canonical(value), Some(unit))),
        _ => Err(UnitError {
            literal: literal.to_string(),
            suffix: suffix.to_string(),
            field: field.name().to_string(),
            family: field.family(),
        }),
    }
}
