//! Shared enumerations used by every provider normalizer: canonical icon
//! codes, alert severity tiers, precipitation intensity tiers, hazard kinds.

use serde::{Deserialize, Serialize};

/// Canonical icon set. Every provider's bespoke codes collapse into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    ClearDay,
    ClearNight,
    PartlyCloudyDay,
    PartlyCloudyNight,
    Cloudy,
    Rain,
    Snow,
    Sleet,
    Wind,
    Fog,
    Thunderstorm,
}

impl Icon {
    /// Fallback mapping for icon codes with no entry in a provider's lookup
    /// table. Substring checks run in precedence order; the final default is
    /// `Cloudy`, logged but never an error.
    pub fn from_text(text: &str, is_daytime: bool) -> Self {
        let text = text.to_lowercase();
        if text.contains("thunder") || text.contains("tstm") {
            return Icon::Thunderstorm;
        }
        if text.contains("sleet") || text.contains("freezing") {
            return Icon::Sleet;
        }
        if text.contains("snow") || text.contains("flurr") || text.contains("blizzard") {
            return Icon::Snow;
        }
        if text.contains("rain") || text.contains("shower") || text.contains("drizzle") {
            return Icon::Rain;
        }
        if text.contains("fog") || text.contains("mist") || text.contains("dust")
            || text.contains("smoke") || text.contains("haze")
        {
            return Icon::Fog;
        }
        if text.contains("wind") || text.contains("blustery") {
            return Icon::Wind;
        }
        if text.contains("partly") || text.contains("few clouds") || text.contains("scattered") {
            return if is_daytime { Icon::PartlyCloudyDay } else { Icon::PartlyCloudyNight };
        }
        if text.contains("cloud") || text.contains("overcast") {
            return Icon::Cloudy;
        }
        if text.contains("clear") || text.contains("sunny") || text.contains("fair") {
            return if is_daytime { Icon::ClearDay } else { Icon::ClearNight };
        }
        tracing::warn!(code = %text, "unmapped icon code, defaulting to cloudy");
        Icon::Cloudy
    }

    /// Thunderstorm override: coded icons lose to text that mentions
    /// thunder, however the provider spelled it.
    pub fn apply_thunder_override(self, text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("thunder") || lower.contains("tstm") || lower.contains("lightning") {
            Icon::Thunderstorm
        } else {
            self
        }
    }

}

/// Alert severity tiers, ordered so that `Extreme > Severe > Moderate > Minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Minor => "minor",
            AlertSeverity::Moderate => "moderate",
            AlertSeverity::Severe => "severe",
            AlertSeverity::Extreme => "extreme",
        }
    }
}

/// Precipitation form reported by minute-level forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipType {
    #[default]
    None,
    Rain,
    Snow,
    Sleet,
    Mix,
}

impl PrecipType {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "rain" => PrecipType::Rain,
            "snow" => PrecipType::Snow,
            "sleet" | "freezing-rain" | "ice" => PrecipType::Sleet,
            "mix" | "mixed" => PrecipType::Mix,
            _ => PrecipType::None,
        }
    }
}

/// Intensity tiers for a precipitation rate in mm/h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecipIntensity {
    None,
    VeryLight,
    Light,
    Moderate,
    Heavy,
    Violent,
}

impl PrecipIntensity {
    pub fn from_mm_per_hour(rate: f64) -> Self {
        if rate < 0.02 {
            PrecipIntensity::None
        } else if rate < 0.2 {
            PrecipIntensity::VeryLight
        } else if rate < 1.0 {
            PrecipIntensity::Light
        } else if rate < 4.0 {
            PrecipIntensity::Moderate
        } else if rate < 10.0 {
            PrecipIntensity::Heavy
        } else {
            PrecipIntensity::Violent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PrecipIntensity::None => "none",
            PrecipIntensity::VeryLight => "very light",
            PrecipIntensity::Light => "light",
            PrecipIntensity::Moderate => "moderate",
            PrecipIntensity::Heavy => "heavy",
            PrecipIntensity::Violent => "violent",
        }
    }
}

/// Categorical weather threats extracted from alert free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hazard {
    Tornado,
    Hurricane,
    FlashFlood,
    Thunderstorm,
    Flood,
    Hail,
    Snow,
    Ice,
    Wind,
    Heat,
    Cold,
    Fog,
    Dust,
    Smoke,
    Rain,
}

impl Hazard {
    pub fn as_str(self) -> &'static str {
        match self {
            Hazard::Tornado => "tornado",
            Hazard::Hurricane => "hurricane",
            Hazard::FlashFlood => "flash-flood",
            Hazard::Thunderstorm => "thunderstorm",
            Hazard::Flood => "flood",
            Hazard::Hail => "hail",
            Hazard::Snow => "snow",
            Hazard::Ice => "ice",
            Hazard::Wind => "wind",
            Hazard::Heat => "heat",
            Hazard::Cold => "cold",
            Hazard::Fog => "fog",
            Hazard::Dust => "dust",
            Hazard::Smoke => "smoke",
            Hazard::Rain => "rain",
        }
    }
}
