//! Minute-resolution provider: Pirate Weather.
//!
//! One templated endpoint carries the whole payload; an `exclude` query
//! parameter lets the nowcast backfill fetch just the 1-minute block
//! cheaply. Key-gated: the orchestrator skips this provider without a
//! network call when no usable key is configured.

use async_trait::async_trait;
use chrono::{FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;

use crate::alerts::{self, RawAlert};
use crate::config::KeyStore;
use crate::error::{ProviderError, truncate_body};
use crate::model::{
    Attribution, Currently, DailyEntry, HourlyEntry, Nowcast, Source, WeatherReport,
    WindDirection, pad_daily_to_week,
};
use crate::nowcast::{self, RawNowcastPoint};
use crate::provider::{Provider, ProviderId, ProviderMetadata, ResolveRequest};
use crate::taxonomy::{Icon, PrecipType};

const DEFAULT_BASE_URL: &str = "https://api.pirateweather.net";

/// `units=us` reports precipitation rates in inches per hour.
const INCHES_TO_MM: f64 = 25.4;

#[derive(Debug, Clone)]
pub struct PirateProvider {
    base_url: String,
}

impl Default for PirateProvider {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string() }
    }
}

impl PirateProvider {
    /// Point the provider at a different host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(
        &self,
        client: &Client,
        key: &str,
        latitude: f64,
        longitude: f64,
        exclude: Option<&str>,
    ) -> Result<PwResponse, ProviderError> {
        let url = format!("{}/forecast/{key}/{latitude:.4},{longitude:.4}", self.base_url);
        let mut request = client.get(&url).query(&[("units", "us")]);
        if let Some(exclude) = exclude {
            request = request.query(&[("exclude", exclude)]);
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: ProviderId::PirateWeather,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::payload(ProviderId::PirateWeather, e.to_string()))
    }

    /// Narrow request used by the nowcast backfill: only the minute block.
    pub(crate) async fn fetch_minutely(
        &self,
        client: &Client,
        key: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Nowcast, ProviderError> {
        let parsed = self
            .fetch(client, key, latitude, longitude, Some("currently,hourly,daily,alerts"))
            .await?;

        let offset = parsed.local_offset(None);
        parsed
            .minutely
            .map(|block| build_nowcast(block, offset))
            .ok_or_else(|| {
                ProviderError::payload(ProviderId::PirateWeather, "no minutely block in response")
            })
    }
}

#[async_trait]
impl Provider for PirateProvider {
    fn id(&self) -> ProviderId {
        ProviderId::PirateWeather
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            requires_api_key: true,
            supports_nowcast: true,
            home_regions: &[],
        }
    }

    async fn resolve(
        &self,
        client: &Client,
        request: &ResolveRequest,
        keys: &KeyStore,
    ) -> Result<WeatherReport, ProviderError> {
        let key = keys
            .usable_key(ProviderId::PirateWeather)
            .ok_or(ProviderError::MissingKey(ProviderId::PirateWeather))?;

        let parsed =
            self.fetch(client, key, request.latitude, request.longitude, None).await?;
        normalize(request, parsed)
    }
}

// Upstream payload shapes (Dark-Sky-compatible).

#[derive(Debug, Deserialize)]
struct PwResponse {
    #[serde(default)]
    timezone: Option<String>,
    currently: Option<PwCurrently>,
    minutely: Option<PwBlock<PwMinutePoint>>,
    hourly: Option<PwBlock<PwHourPoint>>,
    daily: Option<PwBlock<PwDayPoint>>,
    #[serde(default)]
    alerts: Vec<PwAlert>,
}

impl PwResponse {
    /// UTC offset of the payload's zone at the reference instant. The
    /// current observation time anchors it so normalization stays
    /// deterministic for a fixed payload.
    fn local_offset(&self, reference: Option<i64>) -> FixedOffset {
        let reference = reference
            .or_else(|| self.currently.as_ref().map(|c| c.time))
            .or_else(|| {
                self.minutely.as_ref().and_then(|m| m.data.first().map(|p| p.time))
            });
        let (Some(tz_name), Some(reference)) = (self.timezone.as_deref(), reference) else {
            return Utc.fix();
        };
        let Ok(tz) = tz_name.parse::<Tz>() else {
            return Utc.fix();
        };
        match tz.timestamp_opt(reference, 0) {
            chrono::LocalResult::Single(dt) => dt.offset().fix(),
            _ => Utc.fix(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PwBlock<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PwCurrently {
    time: i64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    icon: Option<String>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    wind_speed: Option<f64>,
    wind_bearing: Option<f64>,
    visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PwMinutePoint {
    time: i64,
    #[serde(default)]
    precip_intensity: f64,
    #[serde(default)]
    precip_probability: f64,
    #[serde(default)]
    precip_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PwHourPoint {
    time: i64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    icon: Option<String>,
    temperature: Option<f64>,
    #[serde(default)]
    precip_probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PwDayPoint {
    time: i64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    icon: Option<String>,
    temperature_high: Option<f64>,
    temperature_low: Option<f64>,
    #[serde(default)]
    precip_probability: f64,
    #[serde(default)]
    sunrise_time: Option<i64>,
    #[serde(default)]
    sunset_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PwAlert {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    expires: Option<i64>,
    #[serde(default)]
    severity: Option<String>,
}

/// Icons arrive as canonical Dark Sky strings; unknown values fall through
/// the shared substring chain.
fn parse_icon(icon: Option<&str>, text: &str, is_daytime: bool) -> Icon {
    match icon {
        Some("clear-day") => Icon::ClearDay,
        Some("clear-night") => Icon::ClearNight,
        Some("partly-cloudy-day") => Icon::PartlyCloudyDay,
        Some("partly-cloudy-night") => Icon::PartlyCloudyNight,
        Some("cloudy") => Icon::Cloudy,
        Some("rain") => Icon::Rain,
        Some("snow") => Icon::Snow,
        Some("sleet") | Some("hail") => Icon::Sleet,
        Some("wind") => Icon::Wind,
        Some("fog") => Icon::Fog,
        Some("thunderstorm") => Icon::Thunderstorm,
        Some(other) => Icon::from_text(other, is_daytime),
        None => Icon::from_text(text, is_daytime),
    }
}

fn is_daytime_at(time: i64, icon: Option<&str>, sunrise: Option<i64>, sunset: Option<i64>) -> bool {
    if let Some(icon) = icon {
        if icon.ends_with("-night") {
            return false;
        }
        if icon.ends_with("-day") {
            return true;
        }
    }
    match (sunrise, sunset) {
        (Some(rise), Some(set)) => time >= rise && time < set,
        _ => true,
    }
}

fn normalize(request: &ResolveRequest, parsed: PwResponse) -> Result<WeatherReport, ProviderError> {
    let currently = parsed
        .currently
        .as_ref()
        .ok_or_else(|| ProviderError::payload(ProviderId::PirateWeather, "missing currently block"))?;

    let offset = parsed.local_offset(None);
    let mut report = WeatherReport::empty(Source::PirateWeather, attribution());

    report.timezone = request
        .location_name
        .clone()
        .or_else(|| parsed.timezone.clone())
        .unwrap_or_else(|| request.fallback_label());

    let first_day = parsed.daily.as_ref().and_then(|d| d.data.first());
    let sunrise = first_day.and_then(|d| d.sunrise_time);
    let sunset = first_day.and_then(|d| d.sunset_time);
    let is_daytime =
        is_daytime_at(currently.time, currently.icon.as_deref(), sunrise, sunset);

    report.currently = Currently {
        temperature: currently.temperature,
        icon: parse_icon(currently.icon.as_deref(), &currently.summary, is_daytime)
            .apply_thunder_override(&currently.summary),
        summary: currently.summary.clone(),
        wind_speed: currently.wind_speed,
        wind_direction: currently.wind_bearing.map(WindDirection::Degrees),
        humidity: currently.humidity.map(|v| v.clamp(0.0, 1.0)),
        pressure: currently.pressure,
        visibility: currently.visibility,
        is_daytime,
    };

    let daily_entries: Vec<DailyEntry> = parsed
        .daily
        .as_ref()
        .map(|block| {
            block
                .data
                .iter()
                .map(|d| DailyEntry {
                    time: d.time,
                    icon: parse_icon(d.icon.as_deref(), &d.summary, true)
                        .apply_thunder_override(&d.summary),
                    temperature_high: d.temperature_high.unwrap_or(0.0),
                    temperature_low: d.temperature_low.unwrap_or(0.0),
                    summary: d.summary.clone(),
                    precip_chance: (d.precip_probability.clamp(0.0, 1.0) * 100.0) as u8,
                })
                .collect()
        })
        .unwrap_or_default();
    if daily_entries.is_empty() {
        return Err(ProviderError::payload(ProviderId::PirateWeather, "daily block empty"));
    }
    report.daily = pad_daily_to_week(daily_entries);

    report.hourly = parsed
        .hourly
        .as_ref()
        .map(|block| {
            block
                .data
                .iter()
                .take(12)
                .map(|h| {
                    let hour_is_day =
                        is_daytime_at(h.time, h.icon.as_deref(), sunrise, sunset);
                    HourlyEntry {
                        time: h.time,
                        formatted_time: nowcast::format_local_hour(h.time, offset),
                        temperature: h.temperature.unwrap_or(0.0),
                        icon: parse_icon(h.icon.as_deref(), &h.summary, hour_is_day)
                            .apply_thunder_override(&h.summary),
                        summary: h.summary.clone(),
                        precip_chance: (h.precip_probability.clamp(0.0, 1.0) * 100.0) as u8,
                        is_daytime: hour_is_day,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    report.nowcast = match parsed.minutely {
        Some(block) if !block.data.is_empty() => build_nowcast(block, offset),
        _ => Nowcast::unavailable(),
    };

    report.alerts = parsed
        .alerts
        .into_iter()
        .map(|a| {
            alerts::classify(RawAlert {
                id: a.uri.clone().unwrap_or_else(|| {
                    format!("{}-{}", a.title, a.time.unwrap_or_default())
                }),
                title: a.title,
                description: String::new(),
                full_text: a.description,
                upstream_severity: a.severity,
                urgency: None,
                expires: a.expires.and_then(|t| Utc.timestamp_opt(t, 0).single()),
                geometry: None,
            })
        })
        .collect();

    Ok(report)
}

fn build_nowcast(block: PwBlock<PwMinutePoint>, offset: FixedOffset) -> Nowcast {
    let points: Vec<RawNowcastPoint> = block
        .data
        .iter()
        .take(60)
        .map(|p| {
            let rate = p.precip_intensity * INCHES_TO_MM;
            let precip_type = match &p.precip_type {
                Some(t) => PrecipType::parse(t),
                None if rate > 0.0 => PrecipType::Rain,
                None => PrecipType::None,
            };
            RawNowcastPoint {
                time: p.time,
                rate_mm_per_hour: rate,
                probability: p.precip_probability,
                precip_type,
            }
        })
        .collect();

    nowcast::assemble(points, 1, Source::PirateWeather, offset)
}

fn attribution() -> Attribution {
    Attribution {
        name: "Pirate Weather".to_string(),
        url: "https://pirateweather.net".to_string(),
        license: None,
    }
}
