//! Failure taxonomy for the engine.
//!
//! Every `ProviderError` variant means the same thing to the orchestrator:
//! advance to the next provider in the chain. Only `EngineError::Exhausted`
//! ever reaches the caller.

use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::ProviderId;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: ProviderId,
        status: StatusCode,
        body: String,
    },

    #[error("malformed {provider} payload: {reason}")]
    Payload { provider: ProviderId, reason: String },

    /// Key absent or a known placeholder; skipped before any network call.
    #[error("no usable API key configured for {0}")]
    MissingKey(ProviderId),
}

impl ProviderError {
    pub fn payload(provider: ProviderId, reason: impl Into<String>) -> Self {
        ProviderError::Payload { provider, reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Every configured provider failed. The attempt list preserves chain
    /// order for diagnostics.
    #[error("all weather providers failed ({})", describe_attempts(.attempts))]
    Exhausted {
        attempts: Vec<(ProviderId, ProviderError)>,
    },

    #[error("no providers configured for this request")]
    EmptyChain,
}

fn describe_attempts(attempts: &[(ProviderId, ProviderError)]) -> String {
    attempts
        .iter()
        .map(|(id, err)| format!("{id}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Truncate an upstream error body for inclusion in error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let end = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_lists_each_attempt() {
        let err = EngineError::Exhausted {
            attempts: vec![
                (ProviderId::Nws, ProviderError::payload(ProviderId::Nws, "missing grid id")),
                (ProviderId::OpenWeather, ProviderError::MissingKey(ProviderId::OpenWeather)),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("nws: malformed nws payload"));
        assert!(msg.contains("openweather: no usable API key"));
    }

    #[test]
    fn truncate_body_caps_length() {
        let long = "x".repeat(500);
        let t = truncate_body(&long);
        assert!(t.len() <= 203);
        assert!(t.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }
}
