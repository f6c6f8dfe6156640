//! End-to-end engine tests against a mock upstream.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weathermux_core::config::KeyStore;
use weathermux_core::engine::Engine;
use weathermux_core::model::Source;
use weathermux_core::provider::nws::NwsProvider;
use weathermux_core::provider::open_meteo::OpenMeteoProvider;
use weathermux_core::provider::openweather::OpenWeatherProvider;
use weathermux_core::provider::pirate::PirateProvider;
use weathermux_core::provider::{ProviderId, ResolveRequest};

fn engine_against(server: &MockServer, keys: KeyStore) -> Engine {
    let base = server.uri();
    Engine::with_providers(
        keys,
        Client::new(),
        NwsProvider::new("weathermux-tests").with_base_url(base.clone()),
        OpenMeteoProvider::default().with_base_url(base.clone()),
        OpenWeatherProvider::default().with_base_url(base.clone()),
        PirateProvider::default().with_base_url(base),
    )
}

fn open_meteo_body() -> Value {
    json!({
        "timezone": "America/New_York",
        "utc_offset_seconds": -14400,
        "current": {
            "time": 1754480000,
            "temperature_2m": 21.0,
            "relative_humidity_2m": 60.0,
            "is_day": 1,
            "weather_code": 2,
            "surface_pressure": 1015.0,
            "wind_speed_10m": 12.0,
            "wind_direction_10m": 240.0
        },
        "hourly": {
            "time": (0..24).map(|i| 1754480000 + i * 3600).collect::<Vec<i64>>(),
            "temperature_2m": vec![21.0; 24],
            "weather_code": vec![2; 24],
            "precipitation_probability": vec![10.0; 24],
            "is_day": vec![1; 24],
            "visibility": vec![16000.0; 24]
        },
        "daily": {
            "time": (0..7).map(|i| 1754452800 + i * 86400).collect::<Vec<i64>>(),
            "weather_code": vec![2; 7],
            "temperature_2m_max": vec![26.0; 7],
            "temperature_2m_min": vec![16.0; 7],
            "precipitation_probability_max": vec![20.0; 7]
        }
    })
}

/// A failed official-station grid lookup must fall through to the first
/// global provider with the same coordinates.
#[tokio::test]
async fn grid_lookup_failure_falls_back_to_consolidated_provider() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/points/40.7128,-74.0060"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_meteo_body()))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_against(&server, KeyStore::new());
    let request = ResolveRequest::new(40.7128, -74.0060).with_country("US");

    let report = engine.resolve(&request).await.expect("fallback should succeed");
    assert_eq!(report.source, Source::OpenMeteo);
    assert_eq!(report.daily.len(), 7);
    assert_eq!(report.timezone, "America/New_York");
}

/// Placeholder keys short-circuit without any network call to the key-gated
/// hosts.
#[tokio::test]
async fn placeholder_key_skips_without_network_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/data/2\.5/.*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/forecast/.*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let keys = KeyStore::new().with_key(ProviderId::OpenWeather, "YOUR_API_KEY");
    let engine = engine_against(&server, keys);
    let request = ResolveRequest::new(52.52, 13.405).with_country("DE");

    let err = engine.resolve(&request).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("all weather providers failed"), "{msg}");
    assert!(msg.contains("no usable API key configured for openweather"), "{msg}");
    assert!(msg.contains("no usable API key configured for pirateweather"), "{msg}");
}

fn quantitative(value: f64, unit: &str) -> Value {
    json!({ "value": value, "unitCode": unit })
}

fn observation_body(age_minutes: i64, description: &str) -> Value {
    let timestamp = (Utc::now() - Duration::minutes(age_minutes)).to_rfc3339();
    json!({
        "properties": {
            "timestamp": timestamp,
            "textDescription": description,
            "icon": "https://api.weather.gov/icons/land/day/few?size=medium",
            "temperature": quantitative(20.0, "wmoUnit:degC"),
            "windSpeed": quantitative(10.0, "wmoUnit:km_h-1"),
            "windDirection": quantitative(270.0, "wmoUnit:degree_(angle)"),
            "relativeHumidity": quantitative(55.0, "wmoUnit:percent"),
            "barometricPressure": quantitative(101500.0, "wmoUnit:Pa"),
            "visibility": quantitative(16000.0, "wmoUnit:m")
        }
    })
}

fn station_feature(id: &str, name: &str, lon: f64, lat: f64) -> Value {
    json!({
        "properties": { "stationIdentifier": id, "name": name },
        "geometry": { "type": "Point", "coordinates": [lon, lat] }
    })
}

fn forecast_period(
    name: &str,
    start: &str,
    is_daytime: bool,
    temperature: f64,
    short_forecast: &str,
) -> Value {
    json!({
        "name": name,
        "startTime": start,
        "isDaytime": is_daytime,
        "temperature": temperature,
        "probabilityOfPrecipitation": { "value": 20.0, "unitCode": "wmoUnit:percent" },
        "windSpeed": "10 mph",
        "windDirection": "NW",
        "icon": "https://api.weather.gov/icons/land/day/few?size=medium",
        "shortForecast": short_forecast
    })
}

/// Full official-station pipeline: stations are probed in distance order,
/// the first fresh observation with a description wins, and farther
/// stations are never fetched.
#[tokio::test]
async fn station_probe_is_sequential_with_early_accept() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/points/40.7128,-74.0060"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {
                "gridId": "OKX",
                "forecast": format!("{base}/gridpoints/OKX/33,35/forecast"),
                "forecastHourly": format!("{base}/gridpoints/OKX/33,35/forecast/hourly"),
                "observationStations": format!("{base}/gridpoints/OKX/33,35/stations"),
                "relativeLocation": { "properties": { "city": "New York", "state": "NY" } },
                "timeZone": "America/New_York"
            }
        })))
        .mount(&server)
        .await;

    // Five stations, already roughly ordered by distance from the point.
    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [
                station_feature("KNYC", "Central Park", -73.99, 40.72),
                station_feature("KLGA", "LaGuardia", -73.95, 40.75),
                station_feature("KJFK", "Kennedy Intl", -73.90, 40.80),
                station_feature("KEWR", "Newark Intl", -73.80, 40.90),
                station_feature("KTEB", "Teterboro", -73.70, 41.00)
            ]
        })))
        .mount(&server)
        .await;

    // Nearest two are fresh but have no narrative description.
    Mock::given(method("GET"))
        .and(path("/stations/KNYC/observations/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(observation_body(30, "")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stations/KLGA/observations/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(observation_body(40, "")))
        .expect(1)
        .mount(&server)
        .await;
    // Third is fresh and complete: terminal accept.
    Mock::given(method("GET"))
        .and(path("/stations/KJFK/observations/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(observation_body(60, "Partly Cloudy")),
        )
        .expect(1)
        .mount(&server)
        .await;
    // The remaining candidates must never be probed.
    Mock::given(method("GET"))
        .and(path("/stations/KEWR/observations/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(observation_body(10, "Clear")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stations/KTEB/observations/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(observation_body(10, "Clear")))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "periods": [
                forecast_period("Today", "2026-08-06T06:00:00-04:00", true, 82.0, "Partly Cloudy"),
                forecast_period("Tonight", "2026-08-06T18:00:00-04:00", false, 68.0, "Mostly Clear"),
                forecast_period("Friday", "2026-08-07T06:00:00-04:00", true, 85.0, "Sunny"),
                forecast_period("Friday Night", "2026-08-07T18:00:00-04:00", false, 70.0, "Clear")
            ] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/forecast/hourly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "periods": (0..24).map(|i| forecast_period(
                "",
                &format!("2026-08-06T{:02}:00:00-04:00", (10 + i) % 24),
                true,
                80.0,
                "Partly Cloudy",
            )).collect::<Vec<Value>>() }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/alerts/active"))
        .and(query_param("point", "40.7128,-74.0060"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "features": [] })))
        .mount(&server)
        .await;

    // Nowcast backfill lands on the 15-minute feed.
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timezone": "America/New_York",
            "utc_offset_seconds": -14400,
            "minutely_15": {
                "time": (0..8).map(|i| 1754480000 + i * 900).collect::<Vec<i64>>(),
                "precipitation": vec![0.0; 8],
                "rain": vec![0.0; 8],
                "snowfall": vec![0.0; 8]
            }
        })))
        .mount(&server)
        .await;

    let engine = engine_against(&server, KeyStore::new());
    let request = ResolveRequest::new(40.7128, -74.0060).with_country("US");

    let report = engine.resolve(&request).await.expect("pipeline should succeed");

    assert_eq!(report.source, Source::Nws);
    assert_eq!(report.timezone, "New York, NY");

    // Observation from the third-nearest station won.
    assert_eq!(report.station_info.station_name.as_deref(), Some("Kennedy Intl"));
    assert!(report.station_info.display);
    assert!(!report.station_info.is_forecast_data);
    assert_eq!(report.currently.summary, "Partly Cloudy");
    assert_eq!(report.currently.temperature, Some(68.0));

    // Four periods pair into two days, padded out to a full week.
    assert_eq!(report.daily.len(), 7);
    for w in report.daily.windows(2) {
        assert_eq!(w[1].time - w[0].time, 86_400);
    }

    assert_eq!(report.hourly.len(), 12);

    // Pending nowcast was replaced by the backfill.
    assert!(report.nowcast.available);
    assert_eq!(report.nowcast.interval_minutes, 15);
    assert_eq!(report.nowcast.source, Some(Source::OpenMeteo));
}
