//! Nearest-station observation probing for the official-station provider.
//!
//! Candidates are ranked by great-circle distance and probed one at a time.
//! Probing stays sequential on purpose: an early accept saves the remaining
//! calls, and the ordering bounds outstanding requests to one.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::units::distance_miles;

/// How many ranked candidates are probed before giving up.
const PROBE_LIMIT: usize = 5;

/// Observations older than this are never used for current conditions.
const MAX_AGE_HOURS: f64 = 2.0;

/// Transient candidate built from the grid's station list. Discarded after
/// the pipeline completes.
#[derive(Debug, Clone)]
pub struct StationCandidate {
    pub id: String,
    pub name: String,
    /// Miles from the request point; `None` when the station list entry had
    /// no coordinates.
    pub distance: Option<f64>,
}

/// Value-with-unit object used throughout the observation payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantitativeValue {
    pub value: Option<f64>,
    #[serde(default)]
    pub unit_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationProperties {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub text_description: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub temperature: QuantitativeValue,
    pub wind_speed: QuantitativeValue,
    pub wind_direction: QuantitativeValue,
    pub relative_humidity: QuantitativeValue,
    pub barometric_pressure: QuantitativeValue,
    pub visibility: QuantitativeValue,
}

#[derive(Debug, Deserialize)]
struct ObservationResponse {
    properties: ObservationProperties,
}

/// Rank candidates by distance from the request point. Candidates without
/// coordinates sort last, keeping their original relative order.
pub fn rank_candidates(mut candidates: Vec<StationCandidate>) -> Vec<StationCandidate> {
    candidates.sort_by(|a, b| match (a.distance, b.distance) {
        (Some(da), Some(db)) => da.total_cmp(&db),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    candidates
}

pub fn candidate_distance(
    station_lat: Option<f64>,
    station_lon: Option<f64>,
    lat: f64,
    lon: f64,
) -> Option<f64> {
    match (station_lat, station_lon) {
        (Some(slat), Some(slon)) => Some(distance_miles(lat, lon, slat, slon)),
        _ => None,
    }
}

/// Probe ranked stations sequentially for the best available observation.
///
/// Acceptance rules, first match wins:
/// - fresher than [`MAX_AGE_HOURS`] with a non-empty description: accept
///   immediately, remaining candidates are never fetched;
/// - fresh but description-less: kept as best-so-far only when strictly
///   fresher than the current best;
/// - stale: discarded.
///
/// Request failures and null temperatures skip to the next candidate.
/// Returns `None` when nothing qualifies; the caller degrades to
/// forecast-only current conditions.
pub async fn resolve_best_observation(
    client: &Client,
    base_url: &str,
    user_agent: &str,
    candidates: Vec<StationCandidate>,
    now: DateTime<Utc>,
) -> Option<(StationCandidate, ObservationProperties)> {
    let ranked = rank_candidates(candidates);

    let mut best: Option<(f64, StationCandidate, ObservationProperties)> = None;

    for candidate in ranked.into_iter().take(PROBE_LIMIT) {
        let url = format!("{base_url}/stations/{}/observations/latest", candidate.id);
        let obs = match fetch_observation(client, &url, user_agent).await {
            Some(obs) => obs,
            None => continue,
        };

        if obs.temperature.value.is_none() {
            tracing::debug!(station = %candidate.id, "observation has no temperature, skipping");
            continue;
        }

        let age_hours = (now - obs.timestamp).num_seconds() as f64 / 3600.0;
        if age_hours >= MAX_AGE_HOURS {
            tracing::debug!(station = %candidate.id, age_hours, "observation too old, skipping");
            continue;
        }

        if !obs.text_description.trim().is_empty() {
            return Some((candidate, obs));
        }

        match &best {
            Some((best_age, _, _)) if *best_age <= age_hours => {}
            _ => best = Some((age_hours, candidate, obs)),
        }
    }

    best.map(|(_, candidate, obs)| (candidate, obs))
}

async fn fetch_observation(
    client: &Client,
    url: &str,
    user_agent: &str,
) -> Option<ObservationProperties> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .header(reqwest::header::ACCEPT, "application/geo+json")
        .send()
        .await
        .ok()?;

    if !response.status().is_success() {
        tracing::debug!(%url, status = %response.status(), "station observation request failed");
        return None;
    }

    response
        .json::<ObservationResponse>()
        .await
        .map(|r| r.properties)
        .ok()
}
