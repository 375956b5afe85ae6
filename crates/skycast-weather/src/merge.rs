//! Merging remote responses into a domain `Forecast`.
//!
//! Pure functions: the aggregation timestamp is injected by the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};

use crate::client::{ConditionInfo, CurrentResponse, ForecastResponse, ForecastSample};
use crate::types::{CurrentConditions, DailyConditions, Forecast, Location};

/// Maximum number of daily entries carried by a forecast. The free-tier
/// provider horizon is 5 days; fewer days pass through as-is.
pub const MAX_DAILY_ENTRIES: usize = 7;

const UNKNOWN_CONDITION: &str = "Unknown";

/// Merge the current-conditions and forecast-samples responses for a
/// location into a `Forecast` stamped with `updated_at` (epoch seconds
/// of the aggregation, not provider time).
pub fn merge_to_forecast(
    location: Location,
    current: &CurrentResponse,
    forecast: &ForecastResponse,
    updated_at: i64,
) -> Forecast {
    Forecast {
        location,
        updated_at,
        current: current_from_response(current),
        daily: daily_from_samples(&forecast.list),
    }
}

/// Map the current-conditions response. When the provider lists several
/// simultaneous conditions, the first entry is authoritative.
fn current_from_response(response: &CurrentResponse) -> CurrentConditions {
    CurrentConditions {
        temp_c: response.main.temp,
        temp_min_c: response.main.temp_min,
        temp_max_c: response.main.temp_max,
        condition: primary_description(&response.weather),
        humidity_pct: response.main.humidity,
        wind_speed_ms: response.wind.as_ref().and_then(|w| w.speed),
        icon: primary_icon(&response.weather),
    }
}

/// Roll 3-hour samples up into per-day entries.
///
/// Samples are grouped by UTC calendar date. Per group: min of the
/// sample minimums, max of the sample maximums, condition and icon from
/// the sample at the midpoint index (integer division, approximating a
/// mid-day reading), date from the group's first sample. At most the
/// first `MAX_DAILY_ENTRIES` distinct dates are kept, ascending.
fn daily_from_samples(samples: &[ForecastSample]) -> Vec<DailyConditions> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&ForecastSample>> = BTreeMap::new();
    for sample in samples {
        match DateTime::from_timestamp(sample.dt, 0) {
            Some(instant) => by_day
                .entry(instant.date_naive())
                .or_default()
                .push(sample),
            None => tracing::warn!(dt = sample.dt, "skipping sample with out-of-range timestamp"),
        }
    }

    by_day
        .into_values()
        .take(MAX_DAILY_ENTRIES)
        .map(|group| {
            let temp_min = group
                .iter()
                .map(|s| s.main.temp_min)
                .fold(f64::INFINITY, f64::min);
            let temp_max = group
                .iter()
                .map(|s| s.main.temp_max)
                .fold(f64::NEG_INFINITY, f64::max);
            let representative = group[group.len() / 2];
            DailyConditions {
                date_epoch: group[0].dt,
                temp_min_c: temp_min,
                temp_max_c: temp_max,
                condition: primary_description(&representative.weather),
                icon: primary_icon(&representative.weather),
            }
        })
        .collect()
}

fn primary_description(conditions: &[ConditionInfo]) -> String {
    conditions
        .first()
        .map(|c| c.description.clone())
        .unwrap_or_else(|| UNKNOWN_CONDITION.to_string())
}

fn primary_icon(conditions: &[ConditionInfo]) -> Option<String> {
    conditions.first().map(|c| c.icon.clone())
}
