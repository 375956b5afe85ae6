//! Weather data services for Skycast
//!
//! Location catalog, OpenWeatherMap-compatible remote client, SQLite
//! forecast cache with reactive subscriptions, and the repository that
//! merges remote data and falls back to cache.

pub mod catalog;
pub mod client;
pub mod error;
pub mod merge;
pub mod repository;
pub mod store;
pub mod types;

pub use catalog::LocationCatalog;
pub use client::WeatherClient;
pub use error::WeatherError;
pub use repository::{ForecastRepository, ForecastStream};
pub use store::ForecastStore;
pub use types::{CurrentConditions, DailyConditions, FetchOutcome, Forecast, Location};
