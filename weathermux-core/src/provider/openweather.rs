//! Key-gated global provider: OpenWeatherMap.
//!
//! Two endpoints: current conditions and the 5-day/3-hour forecast, both
//! gated on an `appid` query key. Daily entries are built by grouping the
//! 3-hour list per local date. No alerts on this plan; the nowcast stays
//! pending for the backfill step.

use async_trait::async_trait;
use chrono::{FixedOffset, Offset, TimeZone, Timelike, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::config::KeyStore;
use crate::error::{ProviderError, truncate_body};
use crate::model::{
    Attribution, Currently, DailyEntry, HourlyEntry, Source, WeatherReport, WindDirection,
    pad_daily_to_week,
};
use crate::nowcast;
use crate::provider::{Provider, ProviderId, ProviderMetadata, ResolveRequest};
use crate::taxonomy::Icon;
use crate::units;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
}

impl Default for OpenWeatherProvider {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string() }
    }
}

impl OpenWeatherProvider {
    /// Point the provider at a different host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        client: &Client,
        path: &str,
        key: &str,
        request: &ResolveRequest,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        let response = client
            .get(&url)
            .query(&[
                ("lat", format!("{:.4}", request.latitude)),
                ("lon", format!("{:.4}", request.longitude)),
                ("appid", key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: ProviderId::OpenWeather,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::payload(ProviderId::OpenWeather, format!("{path}: {e}")))
    }
}

#[async_trait]
impl Provider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            requires_api_key: true,
            supports_nowcast: false,
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
            .usable_key(ProviderId::OpenWeather)
            .ok_or(ProviderError::MissingKey(ProviderId::OpenWeather))?;

        let (current, forecast) = tokio::try_join!(
            self.get_json::<OwCurrentResponse>(client, "/data/2.5/weather", key, request),
            self.get_json::<OwForecastResponse>(client, "/data/2.5/forecast", key, request),
        )?;

        normalize(request, current, forecast)
    }
}

// Upstream payload shapes.

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: i64,
    /// UTC offset in seconds.
    #[serde(default)]
    timezone: i32,
    main: OwMain,
    #[serde(default = "Vec::new")]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: Option<OwWind>,
    #[serde(default)]
    visibility: Option<f64>,
    #[serde(default)]
    sys: Option<OwSys>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default = "Vec::new")]
    weather: Vec<OwWeather>,
    /// Probability of precipitation, 0–1.
    #[serde(default)]
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: Option<OwCity>,
    list: Vec<OwForecastEntry>,
}

/// Condition id → canonical icon; the icon code's `d`/`n` suffix decides
/// day or night variants.
fn owm_icon(id: i64, icon: Option<&str>, description: &str) -> Icon {
    let is_day = icon.map_or(true, |i| !i.ends_with('n'));
    match id {
        200..=232 => Icon::Thunderstorm,
        300..=321 => Icon::Rain,
        511 => Icon::Sleet,
        500..=531 => Icon::Rain,
        611..=616 => Icon::Sleet,
        600..=622 => Icon::Snow,
        701 | 711 | 721 | 731 | 741 | 751 | 761 | 762 => Icon::Fog,
        771 => Icon::Wind,
        781 => Icon::Thunderstorm,
        800 => {
            if is_day { Icon::ClearDay } else { Icon::ClearNight }
        }
        801 | 802 => {
            if is_day { Icon::PartlyCloudyDay } else { Icon::PartlyCloudyNight }
        }
        803 | 804 => Icon::Cloudy,
        _ => Icon::from_text(description, is_day),
    }
}

fn normalize(
    request: &ResolveRequest,
    current: OwCurrentResponse,
    forecast: OwForecastResponse,
) -> Result<WeatherReport, ProviderError> {
    if forecast.list.is_empty() {
        return Err(ProviderError::payload(ProviderId::OpenWeather, "forecast list empty"));
    }

    let offset_seconds =
        forecast.city.as_ref().map(|c| c.timezone).unwrap_or(current.timezone);
    let offset =
        FixedOffset::east_opt(offset_seconds).unwrap_or_else(|| Utc.fix());

    let mut report = WeatherReport::empty(Source::OpenWeather, attribution());

    report.timezone = match current.sys.as_ref().and_then(|s| s.country.as_deref()) {
        Some(country) if !current.name.is_empty() => format!("{}, {country}", current.name),
        _ if !current.name.is_empty() => current.name.clone(),
        _ => request.fallback_label(),
    };

    let weather = current.weather.first();
    let summary = weather.map(|w| w.description.clone()).unwrap_or_default();
    let icon_code = weather.and_then(|w| w.icon.as_deref());
    let is_daytime = match icon_code {
        Some(code) => !code.ends_with('n'),
        None => {
            let sys = current.sys.as_ref();
            match (sys.and_then(|s| s.sunrise), sys.and_then(|s| s.sunset)) {
                (Some(rise), Some(set)) => current.dt >= rise && current.dt < set,
                _ => true,
            }
        }
    };

    report.currently = Currently {
        temperature: Some(units::celsius_to_fahrenheit(current.main.temp)),
        icon: weather
            .map(|w| owm_icon(w.id, w.icon.as_deref(), &w.description))
            .unwrap_or(Icon::Cloudy)
            .apply_thunder_override(&summary),
        summary,
        wind_speed: current.wind.as_ref().and_then(|w| w.speed).map(units::mps_to_mph),
        wind_direction: current
            .wind
            .as_ref()
            .and_then(|w| w.deg)
            .map(WindDirection::Degrees),
        humidity: current.main.humidity.map(|v| (v / 100.0).clamp(0.0, 1.0)),
        pressure: current.main.pressure,
        visibility: current.visibility.map(units::meters_to_miles),
        is_daytime,
    };

    report.daily = pad_daily_to_week(group_daily(&forecast.list, offset));

    report.hourly = forecast
        .list
        .iter()
        .take(12)
        .map(|entry| {
            let weather = entry.weather.first();
            let hour_is_day =
                weather.and_then(|w| w.icon.as_deref()).map_or(true, |i| !i.ends_with('n'));
            let summary = weather.map(|w| w.description.clone()).unwrap_or_default();
            HourlyEntry {
                time: entry.dt,
                formatted_time: nowcast::format_local_hour(entry.dt, offset),
                temperature: units::celsius_to_fahrenheit(entry.main.temp),
                icon: weather
                    .map(|w| owm_icon(w.id, w.icon.as_deref(), &w.description))
                    .unwrap_or(Icon::Cloudy)
                    .apply_thunder_override(&summary),
                summary,
                precip_chance: (entry.pop.unwrap_or(0.0).clamp(0.0, 1.0) * 100.0) as u8,
                is_daytime: hour_is_day,
            }
        })
        .collect();

    // No alert feed on this plan; nowcast stays pending for the backfill.
    Ok(report)
}

/// Collapse the 3-hour forecast list into one entry per local date. The
/// midday-nearest entry contributes the icon and summary.
fn group_daily(list: &[OwForecastEntry], offset: FixedOffset) -> Vec<DailyEntry> {
    let mut out: Vec<DailyEntry> = Vec::new();
    let mut current_date = None;
    let mut high = f64::MIN;
    let mut low = f64::MAX;
    let mut pop: f64 = 0.0;
    let mut midday: Option<(i64, &OwForecastEntry)> = None;
    let mut midnight = 0i64;

    let flush = |out: &mut Vec<DailyEntry>,
                 high: f64,
                 low: f64,
                 pop: f64,
                 midday: Option<(i64, &OwForecastEntry)>,
                 midnight: i64| {
        let Some((_, entry)) = midday else { return };
        let weather = entry.weather.first();
        let summary = weather.map(|w| w.description.clone()).unwrap_or_default();
        out.push(DailyEntry {
            time: midnight,
            icon: weather
                .map(|w| owm_icon(w.id, w.icon.as_deref(), &w.description))
                .unwrap_or(Icon::Cloudy),
            temperature_high: units::celsius_to_fahrenheit(high),
            temperature_low: units::celsius_to_fahrenheit(low),
            summary,
            precip_chance: (pop.clamp(0.0, 1.0) * 100.0) as u8,
        });
    };

    for entry in list {
        let local = match offset.timestamp_opt(entry.dt, 0) {
            chrono::LocalResult::Single(dt) => dt,
            _ => continue,
        };
        let date = local.date_naive();

        if current_date != Some(date) {
            flush(&mut out, high, low, pop, midday, midnight);
            current_date = Some(date);
            high = f64::MIN;
            low = f64::MAX;
            pop = 0.0;
            midday = None;
            midnight = date
                .and_hms_opt(0, 0, 0)
                .and_then(|naive| naive.and_local_timezone(offset).single())
                .map_or(entry.dt, |dt| dt.timestamp());
        }

        high = high.max(entry.main.temp_max.unwrap_or(entry.main.temp));
        low = low.min(entry.main.temp_min.unwrap_or(entry.main.temp));
        pop = pop.max(entry.pop.unwrap_or(0.0));

        // Distance from local noon decides the representative entry.
        let noon_distance = (i64::from(local.hour()) - 12).abs();
        match midday {
            Some((best, _)) if best <= noon_distance => {}
            _ => midday = Some((noon_distance, entry)),
        }
    }
    flush(&mut out, high, low, pop, midday, midnight);

    out
}

fn attribution() -> Attribution {
    Attribution {
        name: "OpenWeatherMap".to_string(),
        url: "https://openweathermap.org".to_string(),
        license: Some("ODbL".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather(id: i64, icon: &str, description: &str) -> OwWeather {
        OwWeather { id, description: description.into(), icon: Some(icon.into()) }
    }

    fn entry(dt: i64, temp: f64, pop: f64) -> OwForecastEntry {
        OwForecastEntry {
            dt,
            main: OwMain {
                temp,
                temp_min: Some(temp - 1.0),
                temp_max: Some(temp + 1.0),
                humidity: Some(60.0),
                pressure: Some(1012.0),
            },
            weather: vec![weather(801, "02d", "few clouds")],
            pop: Some(pop),
        }
    }

    fn current() -> OwCurrentResponse {
        OwCurrentResponse {
            name: "Berlin".into(),
            dt: 1754470000,
            timezone: 7200,
            main: OwMain {
                temp: 0.0,
                temp_min: None,
                temp_max: None,
                humidity: Some(70.0),
                pressure: Some(1009.0),
            },
            weather: vec![weather(500, "10d", "light rain")],
            wind: Some(OwWind { speed: Some(5.0), deg: Some(220.0) }),
            visibility: Some(10000.0),
            sys: Some(OwSys {
                country: Some("DE".into()),
                sunrise: Some(1754450000),
                sunset: Some(1754500000),
            }),
        }
    }

    fn forecast() -> OwForecastResponse {
        // 40 entries at 3-hour spacing, the standard 5-day payload.
        OwForecastResponse {
            city: Some(OwCity { timezone: 7200 }),
            list: (0..40).map(|i| entry(1754470800 + i * 10800, 20.0, 0.3)).collect(),
        }
    }

    fn request() -> ResolveRequest {
        ResolveRequest::new(52.52, 13.405)
    }

    #[test]
    fn normalize_converts_metric_units() {
        let report = normalize(&request(), current(), forecast()).expect("normalizes");
        assert_eq!(report.currently.temperature, Some(32.0));
        assert!((report.currently.wind_speed.unwrap() - 11.1847).abs() < 1e-4);
        assert_eq!(report.currently.humidity, Some(0.7));
        assert_eq!(report.currently.pressure, Some(1009.0));
        assert!((report.currently.visibility.unwrap() - 6.21371).abs() < 1e-4);
    }

    #[test]
    fn normalize_builds_location_label() {
        let report = normalize(&request(), current(), forecast()).expect("normalizes");
        assert_eq!(report.timezone, "Berlin, DE");
    }

    #[test]
    fn five_day_list_groups_and_pads_to_seven() {
        let report = normalize(&request(), current(), forecast()).expect("normalizes");
        assert_eq!(report.daily.len(), 7);
        for w in report.daily.windows(2) {
            assert_eq!(w[1].time - w[0].time, 86_400);
        }
    }

    #[test]
    fn daily_group_takes_extremes_and_max_pop() {
        let offset = FixedOffset::east_opt(0).expect("utc offset");
        // One local date: 2026-08-06 (dt values within the same UTC day).
        let list = vec![
            entry(1754460000, 18.0, 0.1),
            entry(1754470800, 24.0, 0.6),
            entry(1754481600, 21.0, 0.2),
        ];
        let days = group_daily(&list, offset);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].temperature_high, units::celsius_to_fahrenheit(25.0));
        assert_eq!(days[0].temperature_low, units::celsius_to_fahrenheit(17.0));
        assert_eq!(days[0].precip_chance, 60);
    }

    #[test]
    fn empty_forecast_list_is_payload_error() {
        let empty = OwForecastResponse { city: None, list: Vec::new() };
        let err = normalize(&request(), current(), empty).unwrap_err();
        assert!(err.to_string().contains("forecast list empty"));
    }

    #[test]
    fn hourly_takes_first_twelve_entries() {
        let report = normalize(&request(), current(), forecast()).expect("normalizes");
        assert_eq!(report.hourly.len(), 12);
        assert_eq!(report.hourly[0].precip_chance, 30);
        assert_eq!(report.hourly[0].icon, Icon::PartlyCloudyDay);
    }

    #[test]
    fn nowcast_left_pending_for_backfill() {
        let report = normalize(&request(), current(), forecast()).expect("normalizes");
        assert!(report.nowcast.pending);
    }

    #[test]
    fn condition_ids_map_to_icons() {
        assert_eq!(owm_icon(211, Some("11d"), ""), Icon::Thunderstorm);
        assert_eq!(owm_icon(511, Some("13d"), ""), Icon::Sleet);
        assert_eq!(owm_icon(600, Some("13n"), ""), Icon::Snow);
        assert_eq!(owm_icon(800, Some("01n"), ""), Icon::ClearNight);
        assert_eq!(owm_icon(800, Some("01d"), ""), Icon::ClearDay);
        assert_eq!(owm_icon(804, Some("04d"), ""), Icon::Cloudy);
        assert_eq!(owm_icon(741, Some("50d"), ""), Icon::Fog);
    }
}
