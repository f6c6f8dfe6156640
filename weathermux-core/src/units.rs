//! Unit conversions applied identically by every normalizer, plus
//! great-circle distance for station ranking.

use haversine::{Location, Units, distance};

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * 2.23694
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh * 0.621371
}

pub fn pa_to_hpa(pa: f64) -> f64 {
    pa / 100.0
}

pub fn meters_to_miles(m: f64) -> f64 {
    m * 0.000621371
}

/// Great-circle distance in miles between two coordinates.
pub fn distance_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    distance(
        Location { latitude: lat1, longitude: lon1 },
        Location { latitude: lat2, longitude: lon2 },
        Units::Miles,
    )
}
