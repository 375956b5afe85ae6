//! Domain model for forecasts.
//!
//! All of these are immutable value types: a new `Forecast` supersedes
//! an older one, nothing is mutated in place.

use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A known location from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Provider-assigned opaque id
    pub id: String,
    pub name: String,
    /// ISO country code
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    /// IANA timezone name, when known
    pub timezone: Option<String>,
}

/// Current conditions at a location. Temperatures in °C, wind in m/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    /// Free-text condition description from the provider
    pub condition: String,
    pub humidity_pct: Option<u8>,
    pub wind_speed_ms: Option<f64>,
    /// Opaque provider icon token
    pub icon: Option<String>,
}

/// One day of the multi-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyConditions {
    /// Epoch seconds of the day's first forecast sample
    pub date_epoch: i64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub condition: String,
    pub icon: Option<String>,
}

/// A merged forecast: current conditions plus the daily breakdown.
///
/// Invariant: `daily` holds at most 7 entries, strictly ascending by
/// date, one entry per distinct calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: Location,
    /// Epoch seconds at which this forecast was assembled (not provider time)
    pub updated_at: i64,
    pub current: CurrentConditions,
    pub daily: Vec<DailyConditions>,
}

/// Outcome of one forecast fetch, as emitted on the repository stream.
///
/// `Failure` is only ever produced when the cache held nothing for the
/// location; with a cached entry present, a remote failure becomes
/// `Degraded`.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A usable forecast, either fresh or from the durable cache
    Success { forecast: Forecast, from_cache: bool },
    /// Cached forecast returned because the remote refresh failed
    Degraded {
        forecast: Forecast,
        error: WeatherError,
    },
    /// Nothing to show: cold cache and the remote fetch failed
    Failure { error: WeatherError },
}

impl FetchOutcome {
    /// The forecast carried by this outcome, if any.
    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            FetchOutcome::Success { forecast, .. } | FetchOutcome::Degraded { forecast, .. } => {
                Some(forecast)
            }
            FetchOutcome::Failure { .. } => None,
        }
    }

    /// The fetch error carried by this outcome, if any.
    pub fn error(&self) -> Option<&WeatherError> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Degraded { error, .. } | FetchOutcome::Failure { error } => Some(error),
        }
    }
}
