//! Minute-level precipitation: shared nowcast assembly and the backfill
//! sub-fetcher.
//!
//! Providers without minute data hand back a pending placeholder; after the
//! primary resolution succeeds the engine runs [`backfill`], the only code
//! allowed to replace a report's `nowcast` block. Backfill prefers the
//! 1-minute provider when a usable key exists and falls back to the
//! 15-minute consolidated feed; its failure is silent.

use chrono::{DateTime, FixedOffset, TimeZone};
use reqwest::Client;

use crate::config::KeyStore;
use crate::model::{Nowcast, NowcastPoint, Source};
use crate::provider::ProviderId;
use crate::provider::open_meteo::OpenMeteoProvider;
use crate::provider::pirate::PirateProvider;
use crate::taxonomy::{PrecipIntensity, PrecipType};

/// Rates below this count as dry when describing the window.
const DRY_THRESHOLD_MM_H: f64 = 0.02;

/// One minute-level sample before canonical formatting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawNowcastPoint {
    pub time: i64,
    pub rate_mm_per_hour: f64,
    /// 0–1 fraction.
    pub probability: f64,
    pub precip_type: PrecipType,
}

/// Format a unix timestamp as a short local clock label, e.g. "3 PM".
pub(crate) fn format_local_hour(time: i64, offset: FixedOffset) -> String {
    match offset.timestamp_opt(time, 0) {
        chrono::LocalResult::Single(dt) => format_hour(&dt),
        _ => String::new(),
    }
}

fn format_hour(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%l %p").to_string().trim().to_string()
}

fn format_clock(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%l:%M %p").to_string().trim().to_string()
}

/// Build a canonical nowcast from raw samples.
pub(crate) fn assemble(
    points: Vec<RawNowcastPoint>,
    interval_minutes: u32,
    source: Source,
    offset: FixedOffset,
) -> Nowcast {
    if points.is_empty() {
        return Nowcast::unavailable();
    }

    let data: Vec<NowcastPoint> = points
        .iter()
        .map(|p| NowcastPoint {
            time: p.time,
            formatted_time: format_local_hour(p.time, offset),
            precip_intensity: p.rate_mm_per_hour,
            precip_probability: p.probability.clamp(0.0, 1.0),
            precip_type: p.precip_type,
            intensity_label: PrecipIntensity::from_mm_per_hour(p.rate_mm_per_hour),
        })
        .collect();

    let description = describe(&data, interval_minutes, offset);

    Nowcast {
        available: true,
        pending: false,
        source: Some(source),
        interval_minutes,
        start_time: data.first().map(|p| p.time),
        end_time: data.last().map(|p| p.time),
        description,
        data,
    }
}

fn type_label(t: PrecipType) -> &'static str {
    match t {
        PrecipType::Snow => "Snow",
        PrecipType::Sleet => "Sleet",
        PrecipType::Mix => "Mixed precipitation",
        _ => "Rain",
    }
}

/// Human sentence summarizing the window.
fn describe(data: &[NowcastPoint], interval_minutes: u32, offset: FixedOffset) -> String {
    let horizon_minutes = data.len() as u32 * interval_minutes;
    let horizon_label = if horizon_minutes >= 60 {
        "the next hour".to_string()
    } else {
        format!("the next {horizon_minutes} minutes")
    };

    let wet = |p: &NowcastPoint| p.precip_intensity >= DRY_THRESHOLD_MM_H;

    let Some(first_wet) = data.iter().position(wet) else {
        return format!("No precipitation expected for {horizon_label}.");
    };

    let label = type_label(data[first_wet].precip_type);

    if first_wet == 0 {
        match data.iter().position(|p| !wet(p)) {
            Some(stop) => {
                let minutes = stop as u32 * interval_minutes;
                format!("{label} stopping in about {minutes} minutes.")
            }
            None => format!("{label} for {horizon_label}."),
        }
    } else {
        let start = data[first_wet].time;
        match offset.timestamp_opt(start, 0) {
            chrono::LocalResult::Single(dt) => {
                format!("{label} starting around {}.", format_clock(&dt))
            }
            _ => {
                let minutes = first_wet as u32 * interval_minutes;
                format!("{label} starting in about {minutes} minutes.")
            }
        }
    }
}

/// Fetch a replacement nowcast for a report whose block is still pending.
///
/// Returns `None` when every source fails; the caller then marks the block
/// unavailable rather than surfacing an error.
pub(crate) async fn backfill(
    client: &Client,
    pirate: &PirateProvider,
    open_meteo: &OpenMeteoProvider,
    keys: &KeyStore,
    latitude: f64,
    longitude: f64,
) -> Option<Nowcast> {
    if let Some(key) = keys.usable_key(ProviderId::PirateWeather) {
        match pirate.fetch_minutely(client, key, latitude, longitude).await {
            Ok(nowcast) => return Some(nowcast),
            Err(err) => {
                tracing::debug!(%err, "minute-resolution nowcast backfill failed, trying 15-minute feed");
            }
        }
    }

    match open_meteo.fetch_minutely(client, latitude, longitude).await {
        Ok(nowcast) => Some(nowcast),
        Err(err) => {
            tracing::debug!(%err, "nowcast backfill exhausted");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;

    fn utc() -> FixedOffset {
        chrono::Utc.fix()
    }

    fn point(minute: i64, rate: f64) -> RawNowcastPoint {
        RawNowcastPoint {
            time: 1754484000 + minute * 60,
            rate_mm_per_hour: rate,
            probability: if rate > 0.0 { 0.8 } else { 0.0 },
            precip_type: if rate > 0.0 { PrecipType::Rain } else { PrecipType::None },
        }
    }

    #[test]
    fn dry_window_says_no_precipitation() {
        let nowcast = assemble((0..60).map(|i| point(i, 0.0)).collect(), 1, Source::PirateWeather, utc());
        assert!(nowcast.available);
        assert_eq!(nowcast.interval_minutes, 1);
        assert_eq!(nowcast.description, "No precipitation expected for the next hour.");
    }

    #[test]
    fn rain_throughout_says_for_the_next_hour() {
        let nowcast = assemble((0..60).map(|i| point(i, 2.0)).collect(), 1, Source::PirateWeather, utc());
        assert_eq!(nowcast.description, "Rain for the next hour.");
        assert_eq!(nowcast.data[0].intensity_label, PrecipIntensity::Moderate);
    }

    #[test]
    fn rain_stopping_reports_minutes() {
        let points: Vec<_> = (0..60).map(|i| point(i, if i < 20 { 1.0 } else { 0.0 })).collect();
        let nowcast = assemble(points, 1, Source::PirateWeather, utc());
        assert_eq!(nowcast.description, "Rain stopping in about 20 minutes.");
    }

    #[test]
    fn rain_starting_reports_clock_time() {
        let points: Vec<_> = (0..60).map(|i| point(i, if i >= 30 { 1.0 } else { 0.0 })).collect();
        let nowcast = assemble(points, 1, Source::PirateWeather, utc());
        assert!(nowcast.description.starts_with("Rain starting around"), "{}", nowcast.description);
    }

    #[test]
    fn short_window_uses_minutes_label() {
        let points: Vec<_> = (0..2).map(|i| point(i * 15, 0.0)).collect();
        let nowcast = assemble(points, 15, Source::OpenMeteo, utc());
        assert_eq!(nowcast.description, "No precipitation expected for the next 30 minutes.");
    }

    #[test]
    fn empty_points_is_unavailable() {
        let nowcast = assemble(Vec::new(), 1, Source::PirateWeather, utc());
        assert!(!nowcast.available && !nowcast.pending);
    }

    #[test]
    fn start_and_end_times_bracket_the_window() {
        let nowcast = assemble((0..4).map(|i| point(i * 15, 0.0)).collect(), 15, Source::OpenMeteo, utc());
        assert_eq!(nowcast.start_time, Some(1754484000));
        assert_eq!(nowcast.end_time, Some(1754484000 + 45 * 60));
    }
}
