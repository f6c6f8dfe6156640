//! Alert severity determination and hazard-keyword extraction, shared by the
//! normalizers whose upstreams publish alerts.
//!
//! Severity trusts the upstream field only for the top two tiers; everything
//! else is keyword-classified from the title. Hazards are whole-word matches
//! over the combined alert text, with contextual confirmation for terms that
//! commonly appear in place names ("Snow Creek Rd" is not a snow hazard).

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::Alert;
use crate::taxonomy::{AlertSeverity, Hazard};

static EXTREME_KEYWORDS: &[&str] = &[
    "tornado warning",
    "tornado emergency",
    "hurricane warning",
    "typhoon warning",
    "tsunami warning",
    "flash flood emergency",
    "extreme wind",
];

static SEVERE_KEYWORDS: &[&str] = &[
    "severe thunderstorm warning",
    "flash flood warning",
    "blizzard warning",
    "ice storm warning",
    "storm surge warning",
    "tornado watch",
    "hurricane watch",
];

static MODERATE_KEYWORDS: &[&str] = &[
    "winter storm warning",
    "high wind warning",
    "flood warning",
    "gale warning",
    "storm warning",
    "winter storm watch",
    "red flag warning",
];

static MINOR_KEYWORDS: &[&str] = &[
    "dense fog",
    "frost advisory",
    "small craft",
    "special weather statement",
];

/// Determine alert severity.
///
/// An explicit upstream value is trusted only when it claims `extreme` or
/// `severe`; lower upstream tiers are ignored in favor of the keyword scan so
/// a mislabeled "Tornado Warning" still classifies as extreme.
pub fn classify_severity(upstream: Option<&str>, title: &str) -> AlertSeverity {
    if let Some(value) = upstream {
        match value.to_lowercase().as_str() {
            "extreme" => return AlertSeverity::Extreme,
            "severe" => return AlertSeverity::Severe,
            _ => {}
        }
    }

    let title = title.to_lowercase();
    if EXTREME_KEYWORDS.iter().any(|k| title.contains(k)) {
        return AlertSeverity::Extreme;
    }
    if SEVERE_KEYWORDS.iter().any(|k| title.contains(k)) {
        return AlertSeverity::Severe;
    }
    if MODERATE_KEYWORDS.iter().any(|k| title.contains(k)) {
        return AlertSeverity::Moderate;
    }
    if MINOR_KEYWORDS.iter().any(|k| title.contains(k)) {
        return AlertSeverity::Minor;
    }
    if title.contains("warning") {
        return AlertSeverity::Severe;
    }
    if title.contains("watch") {
        return AlertSeverity::Moderate;
    }
    if title.contains("advisory") || title.contains("statement") {
        return AlertSeverity::Minor;
    }
    AlertSeverity::Moderate
}

macro_rules! hazard_re {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect("hazard pattern"));
    };
}

hazard_re!(TORNADO_RE, r"\btornado(es|s)?\b");
hazard_re!(HAIL_RE, r"\bhail(stones?)?\b");
hazard_re!(FLASH_FLOOD_RE, r"\bflash\s+flood(ing|s)?\b");
hazard_re!(FLOOD_RE, r"\bflood(ing|ed|s)?\b");
hazard_re!(THUNDER_RE, r"\b(thunderstorms?|thunder|tstm|lightning)\b");
hazard_re!(SNOW_RE, r"\bsnow(fall|storm|storms|s)?\b");
hazard_re!(ICE_RE, r"\b(ice|icy|sleet|freezing\s+(rain|drizzle|fog))\b");
hazard_re!(WIND_RE, r"\b(winds?|gusts?|gusty|blustery)\b");
hazard_re!(DUST_RE, r"\b(dust|sandstorm)\b");
hazard_re!(SMOKE_RE, r"\bsmoke\b");
hazard_re!(FOG_RE, r"\b(fog|mist)\b");
hazard_re!(HEAT_RE, r"\b(heat|hot|excessive\s+heat)\b");
hazard_re!(COLD_RE, r"\b(cold|wind\s+chill|freeze|frost)\b");
hazard_re!(RAIN_RE, r"\b(rain(fall|s)?|showers?|drizzle|downpours?)\b");
hazard_re!(HURRICANE_RE, r"\bhurricanes?\b");

/// Weather-register words that confirm a snow match is about weather.
hazard_re!(
    SNOW_CONTEXT_RE,
    r"\b(accumulat\w*|inch(es)?|heavy|blowing|blizzard|squalls?|flurr\w*|winter|wintry|storm|falling|fell|fall|mixed|total)\b"
);

/// Weather-register words that confirm a hurricane match.
hazard_re!(
    HURRICANE_CONTEXT_RE,
    r"\b(category|landfall|tropical|storm|surge|winds?|mph|cyclone|eye(wall)?)\b"
);

/// Tokens that mark the matched word as part of a place name.
hazard_re!(
    PLACE_RE,
    r"\b(road|rd|street|st|avenue|ave|drive|dr|lane|ln|creek|river|lake|county|valley|hills?|mountains?|mtn|canyon|ridge|park|city|town|hwy|highway|camp|fort|ft|mount|mt)\b"
);

/// Context window half-width in characters for contextual confirmation.
const CONTEXT_WINDOW: usize = 40;

/// How many following tokens are checked for place-name indicators.
const PLACE_TOKENS: usize = 2;

fn char_window(text: &str, start: usize, end: usize) -> &str {
    let mut lo = start.saturating_sub(CONTEXT_WINDOW);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + CONTEXT_WINDOW).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

/// True when one of the `PLACE_TOKENS` tokens following the match, or the
/// single token preceding it, is a place-name indicator.
fn adjacent_to_place_name(text: &str, start: usize, end: usize) -> bool {
    let following: Vec<&str> = text[end..].split_whitespace().take(PLACE_TOKENS).collect();
    if following.iter().any(|tok| PLACE_RE.is_match(tok)) {
        return true;
    }
    text[..start]
        .split_whitespace()
        .next_back()
        .is_some_and(|tok| PLACE_RE.is_match(tok))
}

/// A guarded hazard matches only when some occurrence has weather-register
/// context nearby and is not adjacent to a place-name indicator.
fn guarded_match(text: &str, word_re: &Regex, context_re: &Regex) -> bool {
    word_re.find_iter(text).any(|m| {
        if adjacent_to_place_name(text, m.start(), m.end()) {
            return false;
        }
        // The window still contains the matched word itself; context must
        // come from a different token.
        let window = char_window(text, m.start(), m.end());
        context_re
            .find_iter(window)
            .any(|c| c.as_str() != m.as_str())
    })
}

/// Scan alert text (title + short + full, lowercased by the caller contract)
/// and accumulate the hazard set.
pub fn extract_hazards(text: &str) -> BTreeSet<Hazard> {
    let text = text.to_lowercase();
    let mut hazards = BTreeSet::new();

    if TORNADO_RE.is_match(&text) {
        hazards.insert(Hazard::Tornado);
    }
    if HAIL_RE.is_match(&text) {
        hazards.insert(Hazard::Hail);
    }
    if FLASH_FLOOD_RE.is_match(&text) {
        hazards.insert(Hazard::FlashFlood);
    }
    if FLOOD_RE.is_match(&text) {
        hazards.insert(Hazard::Flood);
    }
    if THUNDER_RE.is_match(&text) {
        hazards.insert(Hazard::Thunderstorm);
    }
    if ICE_RE.is_match(&text) {
        hazards.insert(Hazard::Ice);
    }
    if WIND_RE.is_match(&text) {
        hazards.insert(Hazard::Wind);
    }
    if DUST_RE.is_match(&text) {
        hazards.insert(Hazard::Dust);
    }
    if SMOKE_RE.is_match(&text) {
        hazards.insert(Hazard::Smoke);
    }
    if FOG_RE.is_match(&text) {
        hazards.insert(Hazard::Fog);
    }
    if HEAT_RE.is_match(&text) {
        hazards.insert(Hazard::Heat);
    }
    if COLD_RE.is_match(&text) {
        hazards.insert(Hazard::Cold);
    }
    if RAIN_RE.is_match(&text) {
        hazards.insert(Hazard::Rain);
    }
    if guarded_match(&text, &SNOW_RE, &SNOW_CONTEXT_RE) {
        hazards.insert(Hazard::Snow);
    }
    if guarded_match(&text, &HURRICANE_RE, &HURRICANE_CONTEXT_RE) {
        hazards.insert(Hazard::Hurricane);
    }

    hazards
}

/// Fixed priority order for the primary hazard decision.
static PRIMARY_ORDER: &[(Hazard, &LazyLock<Regex>)] = &[
    (Hazard::Tornado, &TORNADO_RE),
    (Hazard::Hurricane, &HURRICANE_RE),
    (Hazard::FlashFlood, &FLASH_FLOOD_RE),
    (Hazard::Thunderstorm, &THUNDER_RE),
    (Hazard::Flood, &FLOOD_RE),
    (Hazard::Snow, &SNOW_RE),
    (Hazard::Ice, &ICE_RE),
    (Hazard::Wind, &WIND_RE),
    (Hazard::Heat, &HEAT_RE),
    (Hazard::Cold, &COLD_RE),
    (Hazard::Fog, &FOG_RE),
    (Hazard::Dust, &DUST_RE),
    (Hazard::Smoke, &SMOKE_RE),
    (Hazard::Rain, &RAIN_RE),
];

static GENERIC_TITLE_WORDS: &[&str] = &["watch", "warning", "advisory"];

/// Pick the headline hazard from the title alone; first match in priority
/// order wins. Snow and hurricane keep their place-name guard here too.
pub fn primary_hazard(title: &str) -> String {
    let lower = title.to_lowercase();
    for (hazard, re) in PRIMARY_ORDER {
        let hit = match hazard {
            Hazard::Snow => guarded_match(&lower, &SNOW_RE, &SNOW_CONTEXT_RE),
            Hazard::Hurricane => guarded_match(&lower, &HURRICANE_RE, &HURRICANE_CONTEXT_RE),
            _ => re.is_match(&lower),
        };
        if hit {
            return hazard.as_str().to_string();
        }
    }

    // No keyword hit: fall back to the leading title word, skipping a bare
    // generic qualifier.
    let mut words = lower.split_whitespace();
    match words.next() {
        Some(first) if GENERIC_TITLE_WORDS.contains(&first) => {
            words.next().unwrap_or(first).to_string()
        }
        Some(first) => first.to_string(),
        None => String::new(),
    }
}

/// Raw alert fields handed to the classifier by a normalizer.
#[derive(Debug, Clone, Default)]
pub struct RawAlert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub full_text: String,
    pub upstream_severity: Option<String>,
    pub urgency: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub geometry: Option<serde_json::Value>,
}

/// Build a canonical [`Alert`] from raw upstream fields.
pub fn classify(raw: RawAlert) -> Alert {
    let severity = classify_severity(raw.upstream_severity.as_deref(), &raw.title);
    let combined = format!("{} {} {}", raw.title, raw.description, raw.full_text);
    let hazard_types: Vec<Hazard> = extract_hazards(&combined).into_iter().collect();
    let primary = primary_hazard(&raw.title);

    Alert {
        id: raw.id,
        title: raw.title,
        description: raw.description,
        full_text: raw.full_text,
        severity,
        urgency: raw.urgency,
        expires: raw.expires,
        hazard_types,
        primary_hazard: primary,
        geometry: raw.geometry,
    }
}
