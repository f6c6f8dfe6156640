//! Consolidated-global provider: Open-Meteo.
//!
//! One request carries current conditions, hourly and daily forecasts, and a
//! 15-minute precipitation block, all selected through query parameters with
//! `timezone=auto`. No API key, no alerts.

use async_trait::async_trait;
use chrono::{FixedOffset, Offset};
use reqwest::Client;
use serde::Deserialize;

use crate::config::KeyStore;
use crate::error::{ProviderError, truncate_body};
use crate::model::{
    Attribution, Currently, DailyEntry, HourlyEntry, Nowcast, Source, WeatherReport,
    WindDirection, pad_daily_to_week,
};
use crate::nowcast::{self, RawNowcastPoint};
use crate::provider::{Provider, ProviderId, ProviderMetadata, ResolveRequest};
use crate::taxonomy::{Icon, PrecipType};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,is_day,weather_code,surface_pressure,wind_speed_10m,wind_direction_10m";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code,precipitation_probability,is_day,visibility";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max";
const MINUTELY_FIELDS: &str = "precipitation,rain,snowfall";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string() }
    }
}

impl OpenMeteoProvider {
    /// Point the provider at a different host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(
        &self,
        client: &Client,
        query: &[(&str, String)],
    ) -> Result<OmResponse, ProviderError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = client.get(&url).query(query).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: ProviderId::OpenMeteo,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::payload(ProviderId::OpenMeteo, e.to_string()))
    }

    /// Narrow request used by the nowcast backfill: only the 15-minute block.
    pub(crate) async fn fetch_minutely(
        &self,
        client: &Client,
        latitude: f64,
        longitude: f64,
    ) -> Result<Nowcast, ProviderError> {
        let parsed = self
            .fetch(
                client,
                &[
                    ("latitude", format!("{latitude:.4}")),
                    ("longitude", format!("{longitude:.4}")),
                    ("timezone", "auto".to_string()),
                    ("timeformat", "unixtime".to_string()),
                    ("minutely_15", MINUTELY_FIELDS.to_string()),
                    ("forecast_minutely_15", "8".to_string()),
                ],
            )
            .await?;

        let offset = parsed.local_offset();
        parsed
            .minutely_15
            .map(|block| build_nowcast(block, offset))
            .ok_or_else(|| {
                ProviderError::payload(ProviderId::OpenMeteo, "no minutely_15 block in response")
            })
    }
}

#[async_trait]
impl Provider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            requires_api_key: false,
            supports_nowcast: true,
            home_regions: &[],
        }
    }

    async fn resolve(
        &self,
        client: &Client,
        request: &ResolveRequest,
        _keys: &KeyStore,
    ) -> Result<WeatherReport, ProviderError> {
        let parsed = self
            .fetch(
                client,
                &[
                    ("latitude", format!("{:.4}", request.latitude)),
                    ("longitude", format!("{:.4}", request.longitude)),
                    ("timezone", "auto".to_string()),
                    ("timeformat", "unixtime".to_string()),
                    ("current", CURRENT_FIELDS.to_string()),
                    ("hourly", HOURLY_FIELDS.to_string()),
                    ("daily", DAILY_FIELDS.to_string()),
                    ("minutely_15", MINUTELY_FIELDS.to_string()),
                    ("forecast_days", "7".to_string()),
                ],
            )
            .await?;

        normalize(request, parsed)
    }
}

// Upstream payload shapes. Parallel arrays carry nullable slots.

#[derive(Debug, Deserialize)]
struct OmResponse {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    utc_offset_seconds: i32,
    current: Option<OmCurrent>,
    hourly: Option<OmHourly>,
    daily: Option<OmDaily>,
    minutely_15: Option<OmMinutely>,
}

impl OmResponse {
    fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| chrono::Utc.fix())
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: i64,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    is_day: Option<u8>,
    weather_code: Option<i32>,
    surface_pressure: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
    #[serde(default)]
    is_day: Vec<Option<u8>>,
    #[serde(default)]
    visibility: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<i64>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmMinutely {
    time: Vec<i64>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    rain: Vec<Option<f64>>,
    #[serde(default)]
    snowfall: Vec<Option<f64>>,
}

/// WMO weather interpretation codes → canonical icon.
fn wmo_icon(code: i32, is_day: bool) -> Icon {
    match code {
        0 => {
            if is_day { Icon::ClearDay } else { Icon::ClearNight }
        }
        1 | 2 => {
            if is_day { Icon::PartlyCloudyDay } else { Icon::PartlyCloudyNight }
        }
        3 => Icon::Cloudy,
        45 | 48 => Icon::Fog,
        51 | 53 | 55 => Icon::Rain,
        56 | 57 | 66 | 67 => Icon::Sleet,
        61 | 63 | 65 | 80 | 81 | 82 => Icon::Rain,
        71 | 73 | 75 | 77 | 85 | 86 => Icon::Snow,
        95 | 96 | 99 => Icon::Thunderstorm,
        other => {
            tracing::warn!(code = other, "unmapped WMO weather code, defaulting to cloudy");
            Icon::Cloudy
        }
    }
}

fn wmo_summary(code: i32) -> &'static str {
    match code {
        0 => "Clear",
        1 => "Mostly Clear",
        2 => "Partly Cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing Drizzle",
        61 | 63 => "Rain",
        65 => "Heavy Rain",
        66 | 67 => "Freezing Rain",
        71 | 73 => "Snow",
        75 | 77 => "Heavy Snow",
        80 | 81 => "Rain Showers",
        82 => "Violent Rain Showers",
        85 | 86 => "Snow Showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with Hail",
        _ => "Cloudy",
    }
}

fn normalize(request: &ResolveRequest, parsed: OmResponse) -> Result<WeatherReport, ProviderError> {
    let current = parsed
        .current
        .as_ref()
        .ok_or_else(|| ProviderError::payload(ProviderId::OpenMeteo, "missing current block"))?;
    let hourly = parsed
        .hourly
        .as_ref()
        .ok_or_else(|| ProviderError::payload(ProviderId::OpenMeteo, "missing hourly block"))?;
    let daily = parsed
        .daily
        .as_ref()
        .ok_or_else(|| ProviderError::payload(ProviderId::OpenMeteo, "missing daily block"))?;

    let offset = parsed.local_offset();
    let mut report = WeatherReport::empty(Source::OpenMeteo, attribution());

    report.timezone = request
        .location_name
        .clone()
        .or_else(|| parsed.timezone.clone())
        .unwrap_or_else(|| request.fallback_label());

    let is_day = current.is_day.unwrap_or(1) == 1;
    let code = current.weather_code.unwrap_or(3);

    // Visibility lives only in the hourly block; read it from the hour
    // containing the current time.
    let current_hour_ix = hourly
        .time
        .iter()
        .rposition(|t| *t <= current.time)
        .unwrap_or(0);
    let visibility = hourly
        .visibility
        .get(current_hour_ix)
        .copied()
        .flatten()
        .map(crate::units::meters_to_miles);

    report.currently = Currently {
        temperature: current.temperature_2m.map(crate::units::celsius_to_fahrenheit),
        icon: wmo_icon(code, is_day),
        summary: wmo_summary(code).to_string(),
        wind_speed: current.wind_speed_10m.map(crate::units::kmh_to_mph),
        wind_direction: current.wind_direction_10m.map(WindDirection::Degrees),
        humidity: current.relative_humidity_2m.map(|v| (v / 100.0).clamp(0.0, 1.0)),
        pressure: current.surface_pressure,
        visibility,
        is_daytime: is_day,
    };

    let daily_entries: Vec<DailyEntry> = daily
        .time
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let code = daily.weather_code.get(i).copied().flatten().unwrap_or(3);
            DailyEntry {
                time: *t,
                icon: wmo_icon(code, true),
                temperature_high: daily
                    .temperature_2m_max
                    .get(i)
                    .copied()
                    .flatten()
                    .map(crate::units::celsius_to_fahrenheit)
                    .unwrap_or(0.0),
                temperature_low: daily
                    .temperature_2m_min
                    .get(i)
                    .copied()
                    .flatten()
                    .map(crate::units::celsius_to_fahrenheit)
                    .unwrap_or(0.0),
                summary: wmo_summary(code).to_string(),
                precip_chance: daily
                    .precipitation_probability_max
                    .get(i)
                    .copied()
                    .flatten()
                    .map(|v| v.clamp(0.0, 100.0) as u8)
                    .unwrap_or(0),
            }
        })
        .collect();
    report.daily = pad_daily_to_week(daily_entries);

    report.hourly = hourly
        .time
        .iter()
        .enumerate()
        .filter(|(_, t)| **t >= current.time)
        .take(12)
        .map(|(i, t)| {
            let code = hourly.weather_code.get(i).copied().flatten().unwrap_or(3);
            let hour_is_day = hourly.is_day.get(i).copied().flatten().unwrap_or(1) == 1;
            HourlyEntry {
                time: *t,
                formatted_time: nowcast::format_local_hour(*t, offset),
                temperature: hourly
                    .temperature_2m
                    .get(i)
                    .copied()
                    .flatten()
                    .map(crate::units::celsius_to_fahrenheit)
                    .unwrap_or(0.0),
                icon: wmo_icon(code, hour_is_day),
                summary: wmo_summary(code).to_string(),
                precip_chance: hourly
                    .precipitation_probability
                    .get(i)
                    .copied()
                    .flatten()
                    .map(|v| v.clamp(0.0, 100.0) as u8)
                    .unwrap_or(0),
                is_daytime: hour_is_day,
            }
        })
        .collect();

    report.nowcast = match parsed.minutely_15 {
        Some(block) => build_nowcast(block, offset),
        None => Nowcast::unavailable(),
    };

    Ok(report)
}

/// 15-minute precipitation block → canonical nowcast.
fn build_nowcast(block: OmMinutely, offset: FixedOffset) -> Nowcast {
    let points: Vec<RawNowcastPoint> = block
        .time
        .iter()
        .enumerate()
        .take(8)
        .map(|(i, t)| {
            // Values are mm per 15 minutes; scale to a rate.
            let rain = block.rain.get(i).copied().flatten().unwrap_or(0.0);
            let snow = block.snowfall.get(i).copied().flatten().unwrap_or(0.0);
            let total = block.precipitation.get(i).copied().flatten().unwrap_or(rain + snow);
            let rate = total * 4.0;
            let precip_type = if snow > 0.0 && rain > 0.0 {
                PrecipType::Mix
            } else if snow > 0.0 {
                PrecipType::Snow
            } else if total > 0.0 {
                PrecipType::Rain
            } else {
                PrecipType::None
            };
            RawNowcastPoint {
                time: *t,
                rate_mm_per_hour: rate,
                probability: if rate > 0.0 { 1.0 } else { 0.0 },
                precip_type,
            }
        })
        .collect();

    nowcast::assemble(points, 15, Source::OpenMeteo, offset)
}

fn attribution() -> Attribution {
    Attribution {
        name: "Open-Meteo".to_string(),
        url: "https://open-meteo.com".to_string(),
        license: Some("CC BY 4.0".to_string()),
    }
}
