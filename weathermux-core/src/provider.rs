use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug};

use crate::config::KeyStore;
use crate::error::ProviderError;
use crate::model::WeatherReport;

pub mod nws;
pub mod open_meteo;
pub mod openweather;
pub mod pirate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Nws,
    OpenMeteo,
    OpenWeather,
    PirateWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Nws => "nws",
            ProviderId::OpenMeteo => "open-meteo",
            ProviderId::OpenWeather => "openweather",
            ProviderId::PirateWeather => "pirateweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::Nws,
            ProviderId::OpenMeteo,
            ProviderId::OpenWeather,
            ProviderId::PirateWeather,
        ]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "nws" => Ok(ProviderId::Nws),
            "open-meteo" | "openmeteo" => Ok(ProviderId::OpenMeteo),
            "openweather" => Ok(ProviderId::OpenWeather),
            "pirateweather" | "pirate-weather" => Ok(ProviderId::PirateWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: nws, open-meteo, openweather, pirateweather."
            )),
        }
    }
}

/// Static capabilities of a provider, consulted by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct ProviderMetadata {
    pub requires_api_key: bool,
    pub supports_nowcast: bool,
    /// ISO country codes where this provider is the preferred first hop;
    /// empty means globally applicable.
    pub home_regions: &'static [&'static str],
}

impl ProviderMetadata {
    pub fn is_home_region(&self, country_code: Option<&str>) -> bool {
        match country_code {
            Some(code) => {
                let code = code.to_uppercase();
                self.home_regions.iter().any(|r| *r == code)
            }
            None => false,
        }
    }
}

/// One resolution request, owned by a single caller for its duration.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// ISO 3166-1 alpha-2 country code for the coordinate, when known.
    pub country_code: Option<String>,
    /// Free-text location name supplied by the caller, used as a timezone
    /// label fallback.
    pub location_name: Option<String>,
}

impl ResolveRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, country_code: None, location_name: None }
    }

    pub fn with_country(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    /// Label used when no upstream supplies a better one.
    pub fn fallback_label(&self) -> String {
        self.location_name
            .clone()
            .unwrap_or_else(|| format!("{:.2}, {:.2}", self.latitude, self.longitude))
    }
}

/// One upstream weather source. Implementations run their full fetch
/// pipeline and normalization, returning a canonical report or a retryable
/// failure for the orchestrator to act on.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    fn metadata(&self) -> ProviderMetadata;

    async fn resolve(
        &self,
        client: &Client,
        request: &ResolveRequest,
        keys: &KeyStore,
    ) -> Result<WeatherReport, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn home_region_matching_is_case_insensitive() {
        let meta = ProviderMetadata {
            requires_api_key: false,
            supports_nowcast: false,
            home_regions: &["US"],
        };
        assert!(meta.is_home_region(Some("us")));
        assert!(meta.is_home_region(Some("US")));
        assert!(!meta.is_home_region(Some("DE")));
        assert!(!meta.is_home_region(None));
    }

    #[test]
    fn fallback_label_prefers_location_name() {
        let req = ResolveRequest::new(40.7128, -74.0060).with_location_name("New York");
        assert_eq!(req.fallback_label(), "New York");

        let bare = ResolveRequest::new(40.7128, -74.0060);
        assert_eq!(bare.fallback_label(), "40.71, -74.01");
    }
}
