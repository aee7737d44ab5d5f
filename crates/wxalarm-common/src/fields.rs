//! Static registry of the sensor fields a condition may reference.

use crate::types::Observation;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The unit family a field's literals are expressed in.
///
/// Only fields in a non-`None` family accept unit suffixes on literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFamily {
    None,
    Temperature,
    Speed,
    Distance,
}

impl fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitFamily::None => write!(f, "none"),
            UnitFamily::Temperature => write!(f, "temperature"),
            UnitFamily::Speed => write!(f, "speed"),
            UnitFamily::Distance => write!(f, "distance"),
        }
    }
}

/// A sensor field that conditions and templates can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Temperature,
    Humidity,
    Pressure,
    WindSpeed,
    WindGust,
    WindDirection,
    Lux,
    Uv,
    RainRate,
    RainDaily,
    LightningCount,
    LightningDistance,
}

struct FieldDef {
    field: Field,
    name: &'static str,
    aliases: &'static [&'static str],
    label: &'static str,
    unit: &'static str,
    family: UnitFamily,
    precision: usize,
    accessor: fn(&Observation) -> f64,
}

static REGISTRY: [FieldDef; 12] = [
    FieldDef {
        field: Field::Temperature,
        name: "temperature",
        aliases: &["temp"],
        label: "temperature",
        unit: "°C",
        family: UnitFamily::Temperature,
        precision: 1,
        accessor: |o| o.temperature,
    },
    FieldDef {
        field: Field::Humidity,
        name: "humidity",
        aliases: &[],
        label: "humidity",
        unit: "%",
        family: UnitFamily::None,
        precision: 0,
        accessor: |o| o.humidity,
    },
    FieldDef {
        field: Field::Pressure,
        name: "pressure",
        aliases: &[],
        label: "pressure",
        unit: "mb",
        family: UnitFamily::None,
        precision: 2,
        accessor: |o| o.pressure,
    },
    FieldDef {
        field: Field::WindSpeed,
        name: "wind_speed",
        aliases: &["wind"],
        label: "wind speed",
        unit: "m/s",
        family: UnitFamily::Speed,
        precision: 1,
        accessor: |o| o.wind_avg,
    },
    FieldDef {
        field: Field::WindGust,
        name: "wind_gust",
        aliases: &[],
        label: "wind gust",
        unit: "m/s",
        family: UnitFamily::Speed,
        precision: 1,
        accessor: |o| o.wind_gust,
    },
    FieldDef {
        field: Field::WindDirection,
        name: "wind_direction",
        aliases: &[],
        label: "wind direction",
        unit: "°",
        family: UnitFamily::None,
        precision: 0,
        accessor: |o| o.wind_direction,
    },
    FieldDef {
        field: Field::Lux,
        name: "lux",
        aliases: &["light"],
        label: "light level",
        unit: "lux",
        family: UnitFamily::None,
        precision: 0,
        accessor: |o| o.illuminance,
    },
    FieldDef {
        field: Field::Uv,
        name: "uv",
        aliases: &["uv_index"],
        label: "UV index",
        unit: "index",
        family: UnitFamily::None,
        precision: 0,
        accessor: |o| o.uv,
    },
    FieldDef {
        field: Field::RainRate,
        name: "rain_rate",
        aliases: &["rain_accumulated"],
        label: "rain rate",
        unit: "mm/hr",
        family: UnitFamily::None,
        precision: 2,
        accessor: |o| o.rain_rate,
    },
    FieldDef {
        field: Field::RainDaily,
        name: "rain_daily",
        aliases: &["rain_accumulation"],
        label: "daily rainfall",
        unit: "mm",
        family: UnitFamily::None,
        precision: 2,
        accessor: |o| o.rain_daily,
    },
    FieldDef {
        field: Field::LightningCount,
        name: "lightning_count",
        aliases: &[],
        label: "lightning strike count",
        unit: "strikes",
        family: UnitFamily::None,
        precision: 0,
        accessor: |o| f64::from(o.lightning_count),
    },
    FieldDef {
        field: Field::LightningDistance,
        name: "lightning_distance",
        aliases: &[],
        label: "lightning distance",
        unit: "km",
        family: UnitFamily::Distance,
        precision: 1,
        accessor: |o| o.lightning_distance,
    },
];

impl Field {
    /// Every field, in registry order.
    pub const ALL: [Field; 12] = [
        Field::Temperature,
        Field::Humidity,
        Field::Pressure,
        Field::WindSpeed,
        Field::WindGust,
        Field::WindDirection,
        Field::Lux,
        Field::Uv,
        Field::RainRate,
        Field::RainDaily,
        Field::LightningCount,
        Field::LightningDistance,
    ];

    fn def(self) -> &'static FieldDef {
        // REGISTRY is declared in the same order as the enum.
        &REGISTRY[self as usize]
    }

    /// Resolve a field name or alias.
    ///
    /// Matching is case-insensitive and treats spaces as underscores.
    ///
    /// # Examples
    ///
    /// ```
    /// use wxalarm_common::fields::Field;
    ///
    /// assert_eq!(Field::lookup("temp"), Some(Field::Temperature));
    /// assert_eq!(Field::lookup("Wind Speed"), Some(Field::WindSpeed));
    /// assert_eq!(Field::lookup("dewpoint"), None);
    /// ```
    pub fn lookup(name: &str) -> Option<Field> {
        let normalized = name.trim().to_ascii_lowercase().replace(' ', "_");
        REGISTRY
            .iter()
            .find(|s| s.name == normalized || s.aliases.contains(&normalized.as_str()))
            .map(|s| s.field)
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn label(self) -> &'static str {
        self.def().label
    }

    /// Canonical unit the field is stored and compared in.
    pub fn unit(self) -> &'static str {
        self.def().unit
    }

    pub fn family(self) -> UnitFamily {
        self.def().family
    }

    /// Decimal places used when the value is rendered into a message.
    pub fn precision(self) -> usize {
        self.def().precision
    }

    /// Current value of this field in `obs`, in canonical units.
    pub fn value(self, obs: &Observation) -> f64 {
        (self.def().accessor)(obs)
    }

    /// Format `value` at the field's display precision, without a unit.
    pub fn format_value(self, value: f64) -> String {
        format!("{:.*}", self.precision(), value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::lookup(s).ok_or_else(|| format!("unknown field: {s}"))
    }
}

/// Registry entry as exposed to the condition editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: &'static str,
    pub unit_family: UnitFamily,
    pub label: &'static str,
    pub unit: &'static str,
    pub aliases: &'static [&'static str],
}

/// All fields a condition can reference, in registry order.
pub fn available_fields() -> Vec<FieldInfo> {
    REGISTRY
        .iter()
        .map(|s| FieldInfo {
            name: s.name,
            unit_family: s.family,
            label: s.label,
            unit: s.unit,
            aliases: s.aliases,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_matches_enum() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(REGISTRY[i].field, *field);
        }
    }

    #[test]
    fn lookup_resolves_aliases() {
        assert_eq!(Field::lookup("wind"), Some(Field::WindSpeed));
        assert_eq!(Field::lookup("light"), Some(Field::Lux));
        assert_eq!(Field::lookup("UV_INDEX"), Some(Field::Uv));
        assert_eq!(Field::lookup("lightning count"), Some(Field::LightningCount));
        assert_eq!(Field::lookup(""), None);
    }

    #[test]
    fn value_reads_canonical_observation_fields() {
        let obs = Observation {
            wind_avg: 4.2,
            illuminance: 12000.0,
            lightning_count: 3,
            ..Default::default()
        };
        assert_eq!(Field::WindSpeed.value(&obs), 4.2);
        assert_eq!(Field::Lux.value(&obs), 12000.0);
        assert_eq!(Field::LightningCount.value(&obs), 3.0);
    }

    #[test]
    fn format_value_uses_field_precision() {
        assert_eq!(Field::Temperature.format_value(21.456), "21.5");
        assert_eq!(Field::Pressure.format_value(1013.2), "1013.20");
        assert_eq!(Field::Humidity.format_value(45.6), "46");
    }

    #[test]
    fn available_fields_serializes_family_lowercase() {
        let fields = available_fields();
        assert_eq!(fields.len(), 12);
        let json = serde_json::to_value(&fields[0]).unwrap();
        assert_eq!(json["name"], "temperature");
        assert_eq!(json["unit_family"], "temperature");
        assert_eq!(json["label"], "temperature");
    }
}
