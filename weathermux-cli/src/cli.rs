use anyhow::Context;
use clap::{Parser, Subcommand};
use std::convert::TryFrom;

use weathermux_core::engine::{DisplaySink, Engine};
use weathermux_core::model::{Attribution, WeatherReport, WindDirection};
use weathermux_core::provider::{ProviderId, ResolveRequest};
use weathermux_core::Config;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathermux", version, about = "Multi-provider weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a key-gated provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "pirateweather".
        provider: String,
    },

    /// Resolve and show weather for a coordinate.
    Show {
        latitude: f64,
        longitude: f64,

        /// ISO country code for the coordinate, e.g. "US". Decides whether
        /// the official-station provider is tried first.
        #[arg(long)]
        country: Option<String>,

        /// Free-text location name used as a display fallback.
        #[arg(long)]
        name: Option<String>,

        /// Print the canonical report as JSON instead of formatted text.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { latitude, longitude, country, name, json } => {
                show(latitude, longitude, country, name, json).await
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;

    let api_key = inquire::Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let mut config = Config::load()?;
    config.upsert_provider_api_key(id, api_key);
    config.save()?;

    println!("Saved API key for {id} to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    name: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let keys = config.key_store();
    let engine = match &config.user_agent {
        Some(ua) => Engine::with_user_agent(keys, ua.clone()),
        None => Engine::new(keys),
    };

    let mut request = ResolveRequest::new(latitude, longitude);
    if let Some(country) = country {
        request = request.with_country(country);
    }
    if let Some(name) = name {
        request = request.with_location_name(name);
    }

    if json {
        let report = engine
            .resolve(&request)
            .await
            .context("Could not fetch weather from any provider; try again later")?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let sink = TerminalSink;
    engine
        .resolve_and_dispatch(&request, &sink)
        .await
        .context("Could not fetch weather from any provider; try again later")?;
    Ok(())
}

/// Prints the report to stdout. Stands in for the display layer.
struct TerminalSink;

impl DisplaySink for TerminalSink {
    fn set_attribution(&self, attribution: &Attribution) {
        match &attribution.license {
            Some(license) => {
                println!("Data: {} ({}), {license}", attribution.name, attribution.url);
            }
            None => println!("Data: {} ({})", attribution.name, attribution.url),
        }
    }

    fn present(&self, report: &WeatherReport) {
        println!("\n{}", report.timezone);

        let current = &report.currently;
        let temp = current
            .temperature
            .map(|t| format!("{t:.0}°F"))
            .unwrap_or_else(|| "--".to_string());
        println!("Now: {temp}  {}", current.summary);
        if let Some(wind) = current.wind_speed {
            let direction = match &current.wind_direction {
                Some(WindDirection::Compass(c)) => format!(" {c}"),
                Some(WindDirection::Degrees(d)) => format!(" {d:.0}°"),
                None => String::new(),
            };
            println!("Wind: {wind:.0} mph{direction}");
        }
        if let Some(humidity) = current.humidity {
            println!("Humidity: {:.0}%", humidity * 100.0);
        }

        if report.station_info.display {
            if let Some(station) = &report.station_info.station_name {
                match report.station_info.station_distance {
                    Some(d) => println!("Station: {station} ({d:.1} mi)"),
                    None => println!("Station: {station}"),
                }
            } else if report.station_info.is_forecast_data {
                println!("Current conditions from forecast data");
            }
        }

        if report.nowcast.available {
            println!("\n{}", report.nowcast.description);
        }

        for alert in &report.alerts {
            println!("\n[{}] {}", alert.severity.as_str().to_uppercase(), alert.title);
        }

        println!();
        for hour in report.hourly.iter().take(6) {
            println!(
                "  {:>5}  {:>5.0}°F  {:>3}%  {}",
                hour.formatted_time, hour.temperature, hour.precip_chance, hour.summary
            );
        }

        println!();
        for day in &report.daily {
            println!(
                "  {}  {:>3.0}° / {:>3.0}°  {:>3}%  {}",
                format_day(day.time),
                day.temperature_high,
                day.temperature_low,
                day.precip_chance,
                day.summary
            );
        }
    }
}

fn format_day(unix: i64) -> String {
    chrono::DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.format("%a").to_string())
        .unwrap_or_else(|| "---".to_string())
}
