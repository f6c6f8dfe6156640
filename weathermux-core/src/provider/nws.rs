//! Official-station provider: the US National Weather Service API.
//!
//! Resolution runs a staged pipeline, any stage of which can hand control
//! back to the orchestrator: point lookup (coordinate → grid + location
//! name), station discovery, sequential station probing, then a concurrent
//! fan-out for daily forecast, hourly forecast, and active alerts. A missing
//! station observation is not a failure; current conditions degrade to the
//! first hourly forecast period.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::alerts::{self, RawAlert};
use crate::config::KeyStore;
use crate::error::{ProviderError, truncate_body};
use crate::model::{
    Attribution, Currently, DailyEntry, HourlyEntry, Source, StationInfo, WeatherReport,
    WindDirection, pad_daily_to_week,
};
use crate::provider::{Provider, ProviderId, ProviderMetadata, ResolveRequest};
use crate::taxonomy::Icon;
use crate::units;

pub mod stations;

use stations::{ObservationProperties, QuantitativeValue, StationCandidate};

const DEFAULT_BASE_URL: &str = "https://api.weather.gov";
const DEFAULT_USER_AGENT: &str = "weathermux/0.1 (weathermux@example.com)";

/// Wind faster than this turns a calm summary into "... and Windy".
const WINDY_THRESHOLD_MPH: f64 = 15.0;

#[derive(Debug, Clone)]
pub struct NwsProvider {
    base_url: String,
    user_agent: String,
}

impl Default for NwsProvider {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl NwsProvider {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), user_agent: user_agent.into() }
    }

    /// Point the provider at a different host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        client: &Client,
        url: &str,
    ) -> Result<T, ProviderError> {
        let response = client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: ProviderId::Nws,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::payload(ProviderId::Nws, format!("{url}: {e}"))
        })
    }
}

#[async_trait]
impl Provider for NwsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Nws
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            requires_api_key: false,
            supports_nowcast: false,
            home_regions: &["US"],
        }
    }

    async fn resolve(
        &self,
        client: &Client,
        request: &ResolveRequest,
        _keys: &KeyStore,
    ) -> Result<WeatherReport, ProviderError> {
        // Stage 1: coordinate → grid identifiers + administrative location.
        let points_url =
            format!("{}/points/{:.4},{:.4}", self.base_url, request.latitude, request.longitude);
        let points: PointsResponse = self.get_json(client, &points_url).await?;
        let grid = points.properties;
        tracing::debug!(grid_id = %grid.grid_id, "resolved forecast grid");

        // Stage 2: nearby observation stations for the grid.
        let station_list: StationsResponse =
            self.get_json(client, &grid.observation_stations).await?;
        let candidates: Vec<StationCandidate> = station_list
            .features
            .into_iter()
            .map(|f| {
                let (lat, lon) = f.coordinates();
                StationCandidate {
                    id: f.properties.station_identifier,
                    name: f.properties.name,
                    distance: stations::candidate_distance(
                        lat,
                        lon,
                        request.latitude,
                        request.longitude,
                    ),
                }
            })
            .collect();

        // Stage 3: sequential probe. `None` degrades, it does not fail.
        let observation = stations::resolve_best_observation(
            client,
            &self.base_url,
            &self.user_agent,
            candidates,
            Utc::now(),
        )
        .await;

        // Stage 4: daily forecast, hourly forecast, and alerts together.
        let alerts_url = format!(
            "{}/alerts/active?point={:.4},{:.4}",
            self.base_url, request.latitude, request.longitude
        );
        let (daily, hourly, alerts) = tokio::try_join!(
            self.get_json::<ForecastResponse>(client, &grid.forecast),
            self.get_json::<ForecastResponse>(client, &grid.forecast_hourly),
            self.get_json::<AlertsResponse>(client, &alerts_url),
        )?;

        normalize(request, &grid, observation, daily, hourly, alerts)
    }
}

// Upstream payload shapes.

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsProperties {
    grid_id: String,
    forecast: String,
    forecast_hourly: String,
    observation_stations: String,
    #[serde(default)]
    relative_location: Option<RelativeLocation>,
    #[serde(default)]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelativeLocation {
    properties: RelativeLocationProperties,
}

#[derive(Debug, Deserialize)]
struct RelativeLocationProperties {
    city: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct StationsResponse {
    features: Vec<StationFeature>,
}

#[derive(Debug, Deserialize)]
struct StationFeature {
    properties: StationProperties,
    #[serde(default)]
    geometry: Option<PointGeometry>,
}

impl StationFeature {
    fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        match &self.geometry {
            Some(g) if g.coordinates.len() >= 2 => (Some(g.coordinates[1]), Some(g.coordinates[0])),
            _ => (None, None),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationProperties {
    station_identifier: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    /// GeoJSON order: [longitude, latitude].
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPeriod {
    name: String,
    start_time: DateTime<FixedOffset>,
    is_daytime: bool,
    /// Already °F for `us` units.
    temperature: f64,
    #[serde(default)]
    probability_of_precipitation: Option<QuantitativeValue>,
    #[serde(default)]
    wind_speed: Option<String>,
    #[serde(default)]
    wind_direction: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    short_forecast: String,
}

impl ForecastPeriod {
    fn precip_chance(&self) -> u8 {
        self.probability_of_precipitation
            .as_ref()
            .and_then(|q| q.value)
            .map(|v| v.clamp(0.0, 100.0) as u8)
            .unwrap_or(0)
    }

    fn icon(&self) -> Icon {
        self.icon
            .as_deref()
            .and_then(|url| icon_from_url(url))
            .unwrap_or_else(|| Icon::from_text(&self.short_forecast, self.is_daytime))
    }
}

#[derive(Debug, Deserialize)]
struct AlertsResponse {
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    properties: AlertProperties,
    #[serde(default)]
    geometry: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    id: String,
    event: String,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
}

// Normalization.

fn normalize(
    request: &ResolveRequest,
    grid: &PointsProperties,
    observation: Option<(StationCandidate, ObservationProperties)>,
    daily: ForecastResponse,
    hourly: ForecastResponse,
    alerts: AlertsResponse,
) -> Result<WeatherReport, ProviderError> {
    let daily_periods = daily.properties.periods;
    let hourly_periods = hourly.properties.periods;
    if daily_periods.is_empty() {
        return Err(ProviderError::payload(ProviderId::Nws, "forecast returned no periods"));
    }
    let first_hour = hourly_periods
        .first()
        .ok_or_else(|| ProviderError::payload(ProviderId::Nws, "hourly forecast returned no periods"))?;

    let mut report = WeatherReport::empty(Source::Nws, attribution());

    report.timezone = match &grid.relative_location {
        Some(loc) => format!("{}, {}", loc.properties.city, loc.properties.state),
        None => grid.time_zone.clone().unwrap_or_else(|| request.fallback_label()),
    };

    let is_daytime = first_hour.is_daytime;

    match observation {
        Some((station, obs)) => {
            let wind_mph = convert_wind(&obs.wind_speed);
            let using_forecast_description = obs.text_description.trim().is_empty();
            let base_summary = if using_forecast_description {
                first_hour.short_forecast.clone()
            } else {
                obs.text_description.clone()
            };
            let (summary, adjusted) = clean_observation_text(&base_summary);
            let summary = append_windy(summary, wind_mph);

            let icon = obs
                .icon
                .as_deref()
                .and_then(icon_from_url)
                .unwrap_or_else(|| Icon::from_text(&summary, is_daytime))
                .apply_thunder_override(&summary);

            report.currently = Currently {
                temperature: obs.temperature.value.map(|v| convert_temperature(v, &obs.temperature)),
                icon,
                summary,
                wind_speed: wind_mph,
                wind_direction: obs.wind_direction.value.map(WindDirection::Degrees),
                humidity: obs.relative_humidity.value.map(|v| (v / 100.0).clamp(0.0, 1.0)),
                pressure: obs.barometric_pressure.value.map(units::pa_to_hpa),
                visibility: obs.visibility.value.map(units::meters_to_miles),
                is_daytime,
            };
            report.station_info = StationInfo {
                display: true,
                station_name: Some(station.name),
                station_distance: station.distance,
                observation_time: Some(obs.timestamp),
                using_forecast_description,
                description_adjusted: adjusted,
                is_forecast_data: false,
            };
        }
        None => {
            // Forecast-only degrade: no qualifying station observation.
            let wind_mph = first_hour.wind_speed.as_deref().and_then(parse_wind_mph);
            let (summary, adjusted) = clean_observation_text(&first_hour.short_forecast);
            let summary = append_windy(summary, wind_mph);

            let icon = first_hour.icon().apply_thunder_override(&summary);

            report.currently = Currently {
                temperature: Some(first_hour.temperature),
                icon,
                summary,
                wind_speed: wind_mph,
                wind_direction: first_hour
                    .wind_direction
                    .clone()
                    .filter(|d| !d.is_empty())
                    .map(WindDirection::Compass),
                humidity: None,
                pressure: None,
                visibility: None,
                is_daytime,
            };
            report.station_info = StationInfo {
                display: true,
                station_name: None,
                station_distance: None,
                observation_time: None,
                using_forecast_description: true,
                description_adjusted: adjusted,
                is_forecast_data: true,
            };
        }
    }

    report.daily = pad_daily_to_week(pair_daily_periods(&daily_periods));

    report.hourly = hourly_periods
        .iter()
        .take(12)
        .map(|p| HourlyEntry {
            time: p.start_time.timestamp(),
            formatted_time: format_hour(&p.start_time),
            temperature: p.temperature,
            icon: p.icon(),
            summary: p.short_forecast.clone(),
            precip_chance: p.precip_chance(),
            is_daytime: p.is_daytime,
        })
        .collect();

    report.alerts = alerts
        .features
        .into_iter()
        .map(|f| {
            alerts::classify(RawAlert {
                id: f.properties.id,
                title: f.properties.event,
                description: f.properties.headline.unwrap_or_default(),
                full_text: match f.properties.instruction {
                    Some(instruction) => {
                        format!("{}\n\n{}", f.properties.description, instruction)
                    }
                    None => f.properties.description,
                },
                upstream_severity: f.properties.severity.filter(|s| s != "Unknown"),
                urgency: f.properties.urgency,
                expires: f.properties.expires,
                geometry: f.geometry,
            })
        })
        .collect();

    Ok(report)
}

fn attribution() -> Attribution {
    Attribution {
        name: "National Weather Service".to_string(),
        url: "https://www.weather.gov".to_string(),
        license: Some("US Government public domain".to_string()),
    }
}

fn convert_temperature(value: f64, qv: &QuantitativeValue) -> f64 {
    if qv.unit_code.ends_with("degF") {
        value
    } else {
        units::celsius_to_fahrenheit(value)
    }
}

fn convert_wind(qv: &QuantitativeValue) -> Option<f64> {
    let value = qv.value?;
    if qv.unit_code.ends_with("m_s-1") {
        Some(units::mps_to_mph(value))
    } else if qv.unit_code.ends_with("km_h-1") {
        Some(units::kmh_to_mph(value))
    } else {
        // Already mph.
        Some(value)
    }
}

/// Parse a period wind string such as "10 mph" or "5 to 15 mph"; the upper
/// bound wins.
fn parse_wind_mph(text: &str) -> Option<f64> {
    text.split_whitespace()
        .filter_map(|tok| tok.parse::<f64>().ok())
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

static FORECAST_REGISTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(will be|likely|chance( of)?|possible|expect(ed|ing)?|tonight|tomorrow)\b")
        .expect("forecast register pattern")
});

/// Strip forecast-register phrasing from an observation summary. Returns the
/// cleaned text and whether anything changed; an empty cleanup result falls
/// back to the original untouched.
fn clean_observation_text(text: &str) -> (String, bool) {
    if !FORECAST_REGISTER_RE.is_match(text) {
        return (text.to_string(), false);
    }
    let stripped = FORECAST_REGISTER_RE.replace_all(text, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed.trim_matches(|c: char| c == ',' || c.is_whitespace()).to_string();
    if collapsed.is_empty() {
        (text.to_string(), false)
    } else {
        (collapsed, true)
    }
}

fn append_windy(summary: String, wind_mph: Option<f64>) -> String {
    match wind_mph {
        Some(w) if w > WINDY_THRESHOLD_MPH && !summary.to_lowercase().contains("wind") => {
            format!("{summary} and Windy")
        }
        _ => summary,
    }
}

/// Map an NWS icon URL (".../icons/land/day/tsra_hi,40?size=medium") to the
/// canonical icon set.
fn icon_from_url(url: &str) -> Option<Icon> {
    let path = url.split('?').next()?;
    let mut segments = path.split('/').skip_while(|s| *s != "land");
    segments.next()?;
    let is_day = match segments.next()? {
        "day" => true,
        "night" => false,
        _ => return None,
    };
    let code = segments.next()?.split(',').next()?;
    Some(map_icon_code(code, is_day))
}

fn map_icon_code(code: &str, is_day: bool) -> Icon {
    match code {
        "skc" | "few" | "hot" | "cold" => {
            if is_day { Icon::ClearDay } else { Icon::ClearNight }
        }
        "sct" | "bkn" => {
            if is_day { Icon::PartlyCloudyDay } else { Icon::PartlyCloudyNight }
        }
        "ovc" => Icon::Cloudy,
        "wind_skc" | "wind_few" | "wind_sct" | "wind_bkn" | "wind_ovc" => Icon::Wind,
        "snow" | "blizzard" => Icon::Snow,
        "rain_snow" | "rain_sleet" | "snow_sleet" | "sleet" | "fzra" | "rain_fzra"
        | "snow_fzra" => Icon::Sleet,
        "rain" | "rain_showers" | "rain_showers_hi" | "hurricane" | "tropical_storm" => Icon::Rain,
        "tsra" | "tsra_sct" | "tsra_hi" | "tornado" => Icon::Thunderstorm,
        "dust" | "smoke" | "haze" | "fog" => Icon::Fog,
        other => Icon::from_text(other, is_day),
    }
}

fn format_hour(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%l %p").to_string().trim().to_string()
}

/// Local midnight of the period's start, in unix seconds.
fn local_midnight(dt: &DateTime<FixedOffset>) -> i64 {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(*dt.offset()).single())
        .map_or_else(|| dt.timestamp(), |m| m.timestamp())
}

/// True when `night` is the overnight counterpart of `day`.
fn is_night_counterpart(day: &ForecastPeriod, night: &ForecastPeriod) -> bool {
    !night.is_daytime
        && (night.name == format!("{} Night", day.name) || night.name == "Tonight")
}

/// Pair day periods with their night counterparts into whole-day entries.
///
/// A leading night-only period (forecasts requested in the evening start
/// with "Tonight") and a trailing unpaired day both synthesize the missing
/// extreme at ±10 °F.
fn pair_daily_periods(periods: &[ForecastPeriod]) -> Vec<DailyEntry> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < periods.len() {
        let p = &periods[i];
        if p.is_daytime {
            match periods.get(i + 1) {
                Some(night) if is_night_counterpart(p, night) => {
                    out.push(DailyEntry {
                        time: local_midnight(&p.start_time),
                        icon: p.icon(),
                        temperature_high: p.temperature,
                        temperature_low: night.temperature,
                        summary: p.short_forecast.clone(),
                        precip_chance: p.precip_chance().max(night.precip_chance()),
                    });
                    i += 2;
                }
                _ => {
                    // Trailing (or otherwise unpaired) day period.
                    out.push(DailyEntry {
                        time: local_midnight(&p.start_time),
                        icon: p.icon(),
                        temperature_high: p.temperature,
                        temperature_low: p.temperature - 10.0,
                        summary: p.short_forecast.clone(),
                        precip_chance: p.precip_chance(),
                    });
                    i += 1;
                }
            }
        } else {
            // Leading "Tonight"/"Overnight" period with no day half.
            out.push(DailyEntry {
                time: local_midnight(&p.start_time),
                icon: p.icon(),
                temperature_high: p.temperature + 10.0,
                temperature_low: p.temperature,
                summary: p.short_forecast.clone(),
                precip_chance: p.precip_chance(),
            });
            i += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(name: &str, start: &str, is_daytime: bool, temp: f64, pop: f64) -> ForecastPeriod {
        ForecastPeriod {
            name: name.to_string(),
            start_time: start.parse().expect("valid RFC3339"),
            is_daytime,
            temperature: temp,
            probability_of_precipitation: Some(QuantitativeValue {
                value: Some(pop),
                unit_code: "wmoUnit:percent".into(),
            }),
            wind_speed: Some("10 mph".into()),
            wind_direction: Some("NW".into()),
            icon: None,
            short_forecast: "Partly Cloudy".into(),
        }
    }

    #[test]
    fn day_night_pairs_into_single_entry() {
        let periods = vec![
            period("Monday", "2026-03-02T06:00:00-05:00", true, 48.0, 20.0),
            period("Monday Night", "2026-03-02T18:00:00-05:00", false, 31.0, 50.0),
            period("Tuesday", "2026-03-03T06:00:00-05:00", true, 55.0, 0.0),
            period("Tuesday Night", "2026-03-03T18:00:00-05:00", false, 40.0, 0.0),
        ];
        let daily = pair_daily_periods(&periods);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].temperature_high, 48.0);
        assert_eq!(daily[0].temperature_low, 31.0);
        assert_eq!(daily[0].precip_chance, 50);
    }

    #[test]
    fn leading_tonight_synthesizes_high() {
        let periods = vec![
            period("Tonight", "2026-03-02T18:00:00-05:00", false, 31.0, 0.0),
            period("Tuesday", "2026-03-03T06:00:00-05:00", true, 55.0, 0.0),
            period("Tuesday Night", "2026-03-03T18:00:00-05:00", false, 40.0, 0.0),
        ];
        let daily = pair_daily_periods(&periods);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].temperature_high, 41.0);
        assert_eq!(daily[0].temperature_low, 31.0);
    }

    #[test]
    fn trailing_day_synthesizes_low() {
        let periods = vec![
            period("Monday", "2026-03-02T06:00:00-05:00", true, 48.0, 0.0),
            period("Monday Night", "2026-03-02T18:00:00-05:00", false, 31.0, 0.0),
            period("Tuesday", "2026-03-03T06:00:00-05:00", true, 55.0, 0.0),
        ];
        let daily = pair_daily_periods(&periods);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[1].temperature_high, 55.0);
        assert_eq!(daily[1].temperature_low, 45.0);
    }

    #[test]
    fn today_pairs_with_tonight() {
        let periods = vec![
            period("This Afternoon", "2026-03-02T14:00:00-05:00", true, 48.0, 10.0),
            period("Tonight", "2026-03-02T18:00:00-05:00", false, 31.0, 30.0),
        ];
        let daily = pair_daily_periods(&periods);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].precip_chance, 30);
    }

    #[test]
    fn daily_entry_time_is_local_midnight() {
        let periods = vec![
            period("Monday", "2026-03-02T06:00:00-05:00", true, 48.0, 0.0),
            period("Monday Night", "2026-03-02T18:00:00-05:00", false, 31.0, 0.0),
        ];
        let daily = pair_daily_periods(&periods);
        // 2026-03-02T00:00:00-05:00
        assert_eq!(daily[0].time, 1772427600);
    }

    #[test]
    fn clean_text_strips_forecast_register() {
        let (cleaned, adjusted) = clean_observation_text("Rain likely, windy tonight");
        assert!(adjusted);
        assert!(!cleaned.to_lowercase().contains("likely"));
        assert!(!cleaned.to_lowercase().contains("tonight"));
    }

    #[test]
    fn clean_text_falls_back_when_result_empty() {
        let (cleaned, adjusted) = clean_observation_text("Chance Likely");
        assert_eq!(cleaned, "Chance Likely");
        assert!(!adjusted);
    }

    #[test]
    fn clean_text_untouched_without_register_words() {
        let (cleaned, adjusted) = clean_observation_text("Mostly Cloudy");
        assert_eq!(cleaned, "Mostly Cloudy");
        assert!(!adjusted);
    }

    #[test]
    fn windy_appended_above_threshold() {
        assert_eq!(append_windy("Clear".into(), Some(20.0)), "Clear and Windy");
        assert_eq!(append_windy("Clear".into(), Some(10.0)), "Clear");
        assert_eq!(append_windy("Windy".into(), Some(20.0)), "Windy");
        assert_eq!(append_windy("Clear".into(), None), "Clear");
    }

    #[test]
    fn icon_url_parses_day_night_and_code() {
        assert_eq!(
            icon_from_url("https://api.weather.gov/icons/land/day/tsra_hi,40?size=medium"),
            Some(Icon::Thunderstorm)
        );
        assert_eq!(
            icon_from_url("https://api.weather.gov/icons/land/night/sct?size=medium"),
            Some(Icon::PartlyCloudyNight)
        );
        assert_eq!(
            icon_from_url("https://api.weather.gov/icons/land/day/rain_snow,30/snow,50"),
            Some(Icon::Sleet)
        );
        assert_eq!(icon_from_url("not a url"), None);
    }

    #[test]
    fn wind_string_takes_upper_bound() {
        assert_eq!(parse_wind_mph("10 mph"), Some(10.0));
        assert_eq!(parse_wind_mph("5 to 15 mph"), Some(15.0));
        assert_eq!(parse_wind_mph("calm"), None);
    }

    #[test]
    fn observation_wind_converts_by_unit_code() {
        let kmh = QuantitativeValue { value: Some(100.0), unit_code: "wmoUnit:km_h-1".into() };
        assert!((convert_wind(&kmh).unwrap() - 62.1371).abs() < 1e-4);
        let mps = QuantitativeValue { value: Some(10.0), unit_code: "wmoUnit:m_s-1".into() };
        assert!((convert_wind(&mps).unwrap() - 22.3694).abs() < 1e-4);
    }
}
