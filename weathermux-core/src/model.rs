//! The canonical weather object: the single output contract shared by every
//! provider normalizer and consumed by downstream displays.
//!
//! A report is created empty at the start of a normalization step, filled
//! field by field as the upstream payload is parsed, and handed off
//! immutably. The one exception is the nowcast backfill step, which replaces
//! only the `nowcast` sub-object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{AlertSeverity, Hazard, Icon, PrecipIntensity, PrecipType};

/// Which provider produced a report. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "nws")]
    Nws,
    #[serde(rename = "open-meteo")]
    OpenMeteo,
    #[serde(rename = "openweather")]
    OpenWeather,
    #[serde(rename = "pirateweather")]
    PirateWeather,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Nws => "nws",
            Source::OpenMeteo => "open-meteo",
            Source::OpenWeather => "openweather",
            Source::PirateWeather => "pirateweather",
        }
    }
}

/// Wind direction is passed through in whichever representation the provider
/// uses: numeric degrees or a provider-native compass string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindDirection {
    Degrees(f64),
    Compass(String),
}

/// Current conditions block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currently {
    /// Temperature in °F.
    pub temperature: Option<f64>,
    pub icon: Icon,
    pub summary: String,
    /// Wind speed in mph.
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<WindDirection>,
    /// Relative humidity as a 0–1 fraction.
    pub humidity: Option<f64>,
    /// Pressure in hPa.
    pub pressure: Option<f64>,
    /// Visibility in miles.
    pub visibility: Option<f64>,
    pub is_daytime: bool,
}

impl Default for Currently {
    fn default() -> Self {
        Self {
            temperature: None,
            icon: Icon::Cloudy,
            summary: String::new(),
            wind_speed: None,
            wind_direction: None,
            humidity: None,
            pressure: None,
            visibility: None,
            is_daytime: true,
        }
    }
}

/// One day of the daily forecast. `time` is local midnight in unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub time: i64,
    pub icon: Icon,
    pub temperature_high: f64,
    pub temperature_low: f64,
    pub summary: String,
    /// Probability of precipitation, 0–100.
    pub precip_chance: u8,
}

/// One hour of the hourly forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyEntry {
    pub time: i64,
    /// Display string, e.g. "3 PM".
    pub formatted_time: String,
    pub temperature: f64,
    pub icon: Icon,
    pub summary: String,
    pub precip_chance: u8,
    pub is_daytime: bool,
}

/// One minute-level precipitation sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowcastPoint {
    pub time: i64,
    pub formatted_time: String,
    /// Precipitation rate in mm/h.
    pub precip_intensity: f64,
    /// Probability as a 0–1 fraction.
    pub precip_probability: f64,
    pub precip_type: PrecipType,
    pub intensity_label: PrecipIntensity,
}

/// Minute-resolution short-horizon precipitation forecast.
///
/// Providers without minute data emit [`Nowcast::pending`]; the nowcast
/// sub-fetcher later replaces the whole block in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nowcast {
    pub available: bool,
    /// True while a later backfill call may still replace this block.
    pub pending: bool,
    pub source: Option<Source>,
    /// Sample spacing in minutes: 1 or 15.
    pub interval_minutes: u32,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Human sentence, e.g. "Rain starting around 3:40 PM".
    pub description: String,
    pub data: Vec<NowcastPoint>,
}

impl Nowcast {
    /// Placeholder emitted by providers that carry no minute data.
    pub fn pending() -> Self {
        Self {
            available: false,
            pending: true,
            source: None,
            interval_minutes: 0,
            start_time: None,
            end_time: None,
            description: String::new(),
            data: Vec::new(),
        }
    }

    /// Terminal "no minute data" state, set when a backfill attempt fails.
    pub fn unavailable() -> Self {
        Self { pending: false, ..Self::pending() }
    }
}

impl Default for Nowcast {
    fn default() -> Self {
        Self::pending()
    }
}

/// One active weather alert after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub full_text: String,
    pub severity: AlertSeverity,
    pub urgency: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// Deduplicated, sorted for deterministic output.
    pub hazard_types: Vec<Hazard>,
    pub primary_hazard: String,
    pub geometry: Option<serde_json::Value>,
}

/// Station metadata; only meaningful when `source == Nws`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub display: bool,
    pub station_name: Option<String>,
    /// Distance from the request point in miles, when station coordinates
    /// were known.
    pub station_distance: Option<f64>,
    pub observation_time: Option<DateTime<Utc>>,
    pub using_forecast_description: bool,
    pub description_adjusted: bool,
    pub is_forecast_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub name: String,
    pub url: String,
    pub license: Option<String>,
}

/// The provider-agnostic normalized output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub source: Source,
    /// Display label: city/state, upstream zone name, or raw coordinates.
    pub timezone: String,
    pub currently: Currently,
    pub daily: Vec<DailyEntry>,
    pub hourly: Vec<HourlyEntry>,
    pub nowcast: Nowcast,
    pub alerts: Vec<Alert>,
    pub station_info: StationInfo,
    pub attribution: Attribution,
}

impl WeatherReport {
    /// Empty report for `source`; normalizers fill it field by field.
    pub fn empty(source: Source, attribution: Attribution) -> Self {
        Self {
            source,
            timezone: String::new(),
            currently: Currently::default(),
            daily: Vec::new(),
            hourly: Vec::new(),
            nowcast: Nowcast::pending(),
            alerts: Vec::new(),
            station_info: StationInfo::default(),
            attribution,
        }
    }
}

/// Pad or truncate a daily sequence to exactly 7 entries. Missing days are
/// cloned from the last known entry, each one day later.
pub fn pad_daily_to_week(mut daily: Vec<DailyEntry>) -> Vec<DailyEntry> {
    daily.truncate(7);
    while daily.len() < 7 {
        if let Some(last) = daily.last() {
            let mut next = last.clone();
            next.time = last.time + 86_400;
            daily.push(next);
        } else {
            break;
        }
    }
    daily
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(time: i64) -> DailyEntry {
        DailyEntry {
            time,
            icon: Icon::ClearDay,
            temperature_high: 70.0,
            temperature_low: 50.0,
            summary: "Sunny".into(),
            precip_chance: 0,
        }
    }

    #[test]
    fn pad_daily_clones_forward_one_day_at_a_time() {
        let padded = pad_daily_to_week(vec![day(0), day(86_400), day(172_800)]);
        assert_eq!(padded.len(), 7);
        for w in padded.windows(2) {
            assert_eq!(w[1].time - w[0].time, 86_400);
        }
        assert_eq!(padded[6].summary, "Sunny");
    }

    #[test]
    fn pad_daily_truncates_long_input() {
        let long: Vec<_> = (0..10).map(|i| day(i * 86_400)).collect();
        assert_eq!(pad_daily_to_week(long).len(), 7);
    }

    #[test]
    fn pad_daily_empty_stays_empty() {
        assert!(pad_daily_to_week(Vec::new()).is_empty());
    }

    #[test]
    fn nowcast_pending_flags() {
        let p = Nowcast::pending();
        assert!(p.pending && !p.available);
        let u = Nowcast::unavailable();
        assert!(!u.pending && !u.available);
    }
}
