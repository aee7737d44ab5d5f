//! Time windows during which an alarm is armed.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use spa::{calc_sunrise_and_set, SunriseAndSet};
use std::fmt;

const MAX_SUN_OFFSET_MINUTES: i64 = 24 * 60;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    #[default]
    Always,
    Time,
    Daily,
    Weekly,
    Sun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

impl fmt::Display for SunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SunEvent::Sunrise => write!(f, "sunrise"),
            SunEvent::Sunset => write!(f, "sunset"),
        }
    }
}

/// Geographic position used for sunrise/sunset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// When an alarm is armed. The JSON shape is flat, keyed by `type`.
///
/// Time-of-day rules are inclusive at both ends and an `end_time` earlier
/// than `start_time` wraps past midnight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "type", default)]
    pub kind: ScheduleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// 0 = Sunday .. 6 = Saturday
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun_event: Option<SunEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun_event_end: Option<SunEvent>,
    /// Minutes relative to `sun_event`; negative is before.
    #[serde(default)]
    pub sun_offset: i64,
    #[serde(default)]
    pub sun_offset_end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub use_station_location: bool,
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| format!("invalid time '{s}' (use HH:MM): {e}"))
}

impl Schedule {
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            ScheduleType::Always => Ok(()),
            ScheduleType::Time | ScheduleType::Daily => match (&self.start_time, &self.end_time) {
                (Some(start), Some(end)) => {
                    parse_time_of_day(start)?;
                    parse_time_of_day(end)?;
                    Ok(())
                }
                _ => Err("start_time and end_time are required".to_string()),
            },
            ScheduleType::Weekly => {
                if self.days_of_week.is_empty() {
                    return Err("days_of_week is required for a weekly schedule".to_string());
                }
                if let Some(day) = self.days_of_week.iter().find(|d| **d > 6) {
                    return Err(format!(
                        "invalid day of week: {day} (must be 0-6, where 0=Sunday)"
                    ));
                }
                match (&self.start_time, &self.end_time) {
                    (None, None) => Ok(()),
                    (Some(start), Some(end)) => {
                        parse_time_of_day(start)?;
                        parse_time_of_day(end)?;
                        Ok(())
                    }
                    _ => Err("both start_time and end_time must be set for a weekly time range"
                        .to_string()),
                }
            }
            ScheduleType::Sun => {
                if self.sun_event.is_none() {
                    return Err("sun_event is required (sunrise or sunset)".to_string());
                }
                for offset in [self.sun_offset, self.sun_offset_end] {
                    if offset.abs() > MAX_SUN_OFFSET_MINUTES {
                        return Err(format!(
                            "sun offset {offset} is out of range (at most one day either way)"
                        ));
                    }
                }
                if let Some(lat) = self.latitude.filter(|l| !(-90.0..=90.0).contains(l)) {
                    return Err(format!("latitude {lat} is out of range"));
                }
                if let Some(lon) = self.longitude.filter(|l| !(-180.0..=180.0).contains(l)) {
                    return Err(format!("longitude {lon} is out of range"));
                }
                Ok(())
            }
        }
    }

    /// Whether the alarm is armed at `now`.
    ///
    /// Time-of-day and weekday rules read `now` in its own time zone. A
    /// schedule that cannot be resolved (unparseable times, or a sun rule
    /// with no location) is treated as always active.
    pub fn is_active<Tz: TimeZone>(&self, now: &DateTime<Tz>, station: Option<Location>) -> bool {
        match self.kind {
            ScheduleType::Always => true,
            ScheduleType::Time | ScheduleType::Daily => self.in_time_range(now),
            ScheduleType::Weekly => {
                if self.days_of_week.is_empty() {
                    return true;
                }
                let today = now.weekday().num_days_from_sunday() as u8;
                self.days_of_week.contains(&today) && self.in_time_range(now)
            }
            ScheduleType::Sun => self.in_sun_window(now, station),
        }
    }

    fn in_time_range<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let (Some(start), Some(end)) = (&self.start_time, &self.end_time) else {
            return true;
        };
        let (Ok(start), Ok(end)) = (parse_time_of_day(start), parse_time_of_day(end)) else {
            return true;
        };
        let minute_of_day = |t: NaiveTime| t.hour() * 60 + t.minute();
        let (start, end) = (minute_of_day(start), minute_of_day(end));
        let current = minute_of_day(now.time());
        if end < start {
            current >= start || current <= end
        } else {
            current >= start && current <= end
        }
    }

    fn location(&self, station: Option<Location>) -> Option<Location> {
        let own = Location {
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
        };
        let chosen = if self.use_station_location || own.is_unset() {
            station?
        } else {
            own
        };
        (!chosen.is_unset()).then_some(chosen)
    }

    fn in_sun_window<Tz: TimeZone>(&self, now: &DateTime<Tz>, station: Option<Location>) -> bool {
        let (Some(event), Some(location)) = (self.sun_event, self.location(station)) else {
            return true;
        };
        let Some(times) = sun_times(now.date_naive(), location) else {
            return true;
        };
        let at = |event: SunEvent, offset: i64| {
            let base = match event {
                SunEvent::Sunrise => times.sunrise,
                SunEvent::Sunset => times.sunset,
            };
            base + chrono::Duration::minutes(offset)
        };

        let now = now.with_timezone(&Utc);
        let start = at(event, self.sun_offset);
        let Some(end_event) = self.sun_event_end else {
            return now >= start;
        };
        let end = at(end_event, self.sun_offset_end);
        if start <= end {
            now >= start && now <= end
        } else {
            // e.g. sunset to sunrise
            now >= start || now <= end
        }
    }
}

fn format_offset(minutes: i64) -> String {
    match minutes {
        0 => String::new(),
        m if m > 0 => format!(" +{m}m"),
        m => format!(" {m}m"),
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = match (&self.start_time, &self.end_time) {
            (Some(s), Some(e)) => Some((s.as_str(), e.as_str())),
            _ => None,
        };
        match self.kind {
            ScheduleType::Always => write!(f, "Always active (24/7)"),
            ScheduleType::Time | ScheduleType::Daily => {
                let (start, end) = range.unwrap_or(("?", "?"));
                write!(f, "Daily from {start} to {end}")
            }
            ScheduleType::Weekly => {
                let days: Vec<&str> = self
                    .days_of_week
                    .iter()
                    .filter_map(|d| DAY_NAMES.get(usize::from(*d)).copied())
                    .collect();
                let days = days.join(", ");
                match range {
                    Some((start, end)) => write!(f, "{days} from {start} to {end}"),
                    None => write!(f, "{days} (all day)"),
                }
            }
            ScheduleType::Sun => {
                let location = if self.use_station_location {
                    " (station location)".to_string()
                } else {
                    match (self.latitude, self.longitude) {
                        (Some(lat), Some(lon)) => format!(" ({lat:.4}, {lon:.4})"),
                        _ => String::new(),
                    }
                };
                let start = match self.sun_event {
                    Some(event) => format!("{event}{}", format_offset(self.sun_offset)),
                    None => "?".to_string(),
                };
                match self.sun_event_end {
                    Some(end) => write!(
                        f,
                        "{start} to {end}{}{location}",
                        format_offset(self.sun_offset_end)
                    ),
                    None => write!(f, "After {start}{location}"),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Sunrise and sunset for a calendar date at `location`.
///
/// During polar night both times are midnight UTC; during polar day the
/// window spans the whole UTC day. `None` when the coordinates are out of
/// range for the solar position algorithm.
pub fn sun_times(date: NaiveDate, location: Location) -> Option<SunTimes> {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    let noon = midnight + chrono::Duration::hours(12);
    match calc_sunrise_and_set(noon, location.latitude, location.longitude) {
        Ok(SunriseAndSet::Daylight(sunrise, sunset)) => Some(SunTimes { sunrise, sunset }),
        Ok(SunriseAndSet::PolarNight) => Some(SunTimes {
            sunrise: midnight,
            sunset: midnight,
        }),
        Ok(SunriseAndSet::PolarDay) => Some(SunTimes {
            sunrise: midnight,
            sunset: midnight + chrono::Duration::seconds(86_399),
        }),
        Err(e) => {
            tracing::warn!(
                latitude = location.latitude,
                longitude = location.longitude,
                error = ?e,
                "Sun position unavailable, schedule left armed"
            );
            None
        }
    }
}
