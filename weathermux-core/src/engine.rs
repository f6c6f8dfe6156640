//! Fallback orchestrator: selects a provider chain for a coordinate, runs
//! each provider's pipeline, and advances on any stage failure. Only when
//! every provider has failed does an error reach the caller.

use reqwest::Client;
use std::time::Duration;

use crate::config::KeyStore;
use crate::error::{EngineError, ProviderError};
use crate::model::{Attribution, Nowcast, WeatherReport};
use crate::nowcast;
use crate::provider::nws::NwsProvider;
use crate::provider::open_meteo::OpenMeteoProvider;
use crate::provider::openweather::OpenWeatherProvider;
use crate::provider::pirate::PirateProvider;
use crate::provider::{Provider, ProviderId, ResolveRequest};

/// Display collaborator. The engine pushes attribution and the finished
/// report; rendering itself stays outside the crate.
pub trait DisplaySink: Send + Sync {
    fn set_attribution(&self, attribution: &Attribution);
    fn present(&self, report: &WeatherReport);
}

pub struct Engine {
    client: Client,
    keys: KeyStore,
    nws: NwsProvider,
    open_meteo: OpenMeteoProvider,
    openweather: OpenWeatherProvider,
    pirate: PirateProvider,
}

impl Engine {
    pub fn new(keys: KeyStore) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            keys,
            nws: NwsProvider::default(),
            open_meteo: OpenMeteoProvider::default(),
            openweather: OpenWeatherProvider::default(),
            pirate: PirateProvider::default(),
        }
    }

    /// Engine with a custom User-Agent for the official-station API.
    pub fn with_user_agent(keys: KeyStore, user_agent: impl Into<String>) -> Self {
        let mut engine = Self::new(keys);
        engine.nws = NwsProvider::new(user_agent);
        engine
    }

    /// Fully custom construction; tests use this to point providers at a
    /// mock server.
    pub fn with_providers(
        keys: KeyStore,
        client: Client,
        nws: NwsProvider,
        open_meteo: OpenMeteoProvider,
        openweather: OpenWeatherProvider,
        pirate: PirateProvider,
    ) -> Self {
        Self { client, keys, nws, open_meteo, openweather, pirate }
    }

    fn chain(&self, request: &ResolveRequest) -> Vec<&dyn Provider> {
        let mut chain: Vec<&dyn Provider> = Vec::with_capacity(4);
        if self.nws.metadata().is_home_region(request.country_code.as_deref()) {
            chain.push(&self.nws);
        }
        chain.push(&self.open_meteo);
        chain.push(&self.openweather);
        chain.push(&self.pirate);
        chain
    }

    /// Provider order that a request would use. Exposed for inspection.
    pub fn chain_ids(&self, request: &ResolveRequest) -> Vec<ProviderId> {
        self.chain(request).iter().map(|p| p.id()).collect()
    }

    /// Resolve weather for a coordinate, walking the provider chain until
    /// one pipeline completes. Every stage-local failure is converted into
    /// "advance to next provider"; the same provider is never retried
    /// within one resolution.
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<WeatherReport, EngineError> {
        let mut attempts: Vec<(ProviderId, ProviderError)> = Vec::new();

        for provider in self.chain(request) {
            let id = provider.id();

            // Configuration failures short-circuit: no network call is made
            // for a key-gated provider without a usable key.
            if provider.metadata().requires_api_key && self.keys.usable_key(id).is_none() {
                tracing::debug!(provider = %id, "no usable API key, skipping");
                attempts.push((id, ProviderError::MissingKey(id)));
                continue;
            }

            match provider.resolve(&self.client, request, &self.keys).await {
                Ok(mut report) => {
                    tracing::info!(provider = %id, "resolved weather");
                    if report.nowcast.pending {
                        report.nowcast = self.backfill_nowcast(request).await;
                    }
                    return Ok(report);
                }
                Err(err) => {
                    tracing::warn!(provider = %id, %err, "provider failed, advancing");
                    attempts.push((id, err));
                }
            }
        }

        if attempts.is_empty() {
            Err(EngineError::EmptyChain)
        } else {
            Err(EngineError::Exhausted { attempts })
        }
    }

    /// Resolve and hand the report to the display collaborator, attribution
    /// first. The error, when every provider failed, is the caller's single
    /// user-facing message.
    pub async fn resolve_and_dispatch(
        &self,
        request: &ResolveRequest,
        sink: &dyn DisplaySink,
    ) -> Result<(), EngineError> {
        let report = self.resolve(request).await?;
        sink.set_attribution(&report.attribution);
        sink.present(&report);
        Ok(())
    }

    /// Replace a pending nowcast with minute data from a secondary source.
    /// Failure is silent; the block just becomes unavailable.
    async fn backfill_nowcast(&self, request: &ResolveRequest) -> Nowcast {
        nowcast::backfill(
            &self.client,
            &self.pirate,
            &self.open_meteo,
            &self.keys,
            request.latitude,
            request.longitude,
        )
        .await
        .unwrap_or_else(Nowcast::unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_region_request_tries_official_provider_first() {
        let engine = Engine::new(KeyStore::new());
        let req = ResolveRequest::new(40.7128, -74.0060).with_country("US");
        assert_eq!(
            engine.chain_ids(&req),
            vec![
                ProviderId::Nws,
                ProviderId::OpenMeteo,
                ProviderId::OpenWeather,
                ProviderId::PirateWeather,
            ]
        );
    }

    #[test]
    fn foreign_request_skips_official_provider() {
        let engine = Engine::new(KeyStore::new());
        let req = ResolveRequest::new(52.52, 13.405).with_country("DE");
        assert_eq!(
            engine.chain_ids(&req),
            vec![ProviderId::OpenMeteo, ProviderId::OpenWeather, ProviderId::PirateWeather]
        );
    }

    #[test]
    fn unknown_country_is_treated_as_foreign() {
        let engine = Engine::new(KeyStore::new());
        let req = ResolveRequest::new(40.7128, -74.0060);
        assert_eq!(engine.chain_ids(&req).first(), Some(&ProviderId::OpenMeteo));
    }
}
