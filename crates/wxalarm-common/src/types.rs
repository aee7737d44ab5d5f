use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of station readings.
///
/// All values are stored in canonical metric units: °C, %, mb, m/s, degrees,
/// lux, UV index, mm/hr, mm and km. Condition literals written in other units
/// are normalized at parse time, never here.
///
/// # Examples
///
/// ```
/// use wxalarm_common::types::Observation;
///
/// let obs: Observation = serde_json::from_str(r#"{"temperature": 21.5, "humidity": 40}"#).unwrap();
/// assert_eq!(obs.temperature, 21.5);
/// assert_eq!(obs.lightning_count, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    /// Air temperature, °C
    pub temperature: f64,
    /// Relative humidity, %
    pub humidity: f64,
    /// Station pressure, mb
    pub pressure: f64,
    /// Average wind speed, m/s
    pub wind_avg: f64,
    /// Wind gust, m/s
    pub wind_gust: f64,
    /// Wind direction, degrees
    pub wind_direction: f64,
    /// Illuminance, lux
    pub illuminance: f64,
    pub uv: f64,
    /// Rain rate, mm/hr
    pub rain_rate: f64,
    /// Rain accumulated since local midnight, mm
    pub rain_daily: f64,
    pub lightning_count: u32,
    /// Average lightning strike distance, km
    pub lightning_distance: f64,
}

impl Observation {
    /// Temperature converted to °F, for display only.
    pub fn temperature_f(&self) -> f64 {
        self.temperature * 9.0 / 5.0 + 32.0
    }

    /// Sixteen-point compass name for the wind direction, collapsed to eight.
    pub fn wind_cardinal(&self) -> &'static str {
        let dir = self.wind_direction.rem_euclid(360.0);
        match dir {
            d if !(22.5..337.5).contains(&d) => "N",
            d if d < 67.5 => "NE",
            d if d < 112.5 => "E",
            d if d < 157.5 => "SE",
            d if d < 202.5 => "S",
            d if d < 247.5 => "SW",
            d if d < 292.5 => "W",
            _ => "NW",
        }
    }
}
