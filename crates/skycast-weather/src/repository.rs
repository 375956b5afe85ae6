//! Forecast fetch pipeline with cache fallback.
//!
//! `fetch_forecast` emits any cached forecast first, then exactly one
//! terminal outcome for the remote refresh. The two remote resources
//! are fetched concurrently and merged; a remote failure degrades to
//! the cached value when one exists and only becomes a `Failure` on a
//! cold cache.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::client::WeatherClient;
use crate::error::WeatherError;
use crate::merge;
use crate::store::ForecastStore;
use crate::types::{FetchOutcome, Forecast, Location};

/// Repository coordinating the remote client and the forecast store.
pub struct ForecastRepository {
    client: WeatherClient,
    store: Arc<ForecastStore>,
    api_key: String,
}

/// Outcome stream for one fetch: at most two emissions, the optional
/// cache hit strictly before the terminal outcome.
///
/// Dropping the stream aborts the producing task at its next suspension
/// point, abandoning both remote calls together and skipping the cache
/// write.
pub struct ForecastStream {
    rx: mpsc::Receiver<FetchOutcome>,
    task: JoinHandle<()>,
}

impl ForecastStream {
    /// Next outcome, or `None` once the stream has terminated.
    pub async fn next(&mut self) -> Option<FetchOutcome> {
        self.rx.recv().await
    }

    /// Drain the stream to completion.
    pub async fn collect(mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}

impl Drop for ForecastStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ForecastRepository {
    pub fn new(client: WeatherClient, store: Arc<ForecastStore>, api_key: String) -> Self {
        Self {
            client,
            store,
            api_key,
        }
    }

    /// Fetch the forecast for a location.
    ///
    /// Must be called within a Tokio runtime. Overlapping calls for the
    /// same location are not ordered relative to each other; a caller
    /// that only wants the latest result should drop the stale stream
    /// before starting a new fetch.
    pub fn fetch_forecast(&self, location: &Location) -> ForecastStream {
        let (tx, rx) = mpsc::channel(2);
        let client = self.client.clone();
        let store = Arc::clone(&self.store);
        let api_key = self.api_key.clone();
        let location = location.clone();

        let task = tokio::spawn(async move {
            // A failed cache read is treated as a cold cache; the
            // remote path still runs.
            let cached = match store.get(&location.id) {
                Ok(cached) => cached,
                Err(e) => {
                    tracing::warn!("forecast cache read failed for {}: {}", location.id, e);
                    None
                }
            };
            if let Some(forecast) = cached.clone() {
                let _ = tx
                    .send(FetchOutcome::Success {
                        forecast,
                        from_cache: true,
                    })
                    .await;
            }

            let outcome = match fetch_and_store(&client, &store, &api_key, &location).await {
                Ok(forecast) => FetchOutcome::Success {
                    forecast,
                    from_cache: false,
                },
                Err(error) => {
                    tracing::warn!("remote refresh failed for {}: {}", location.id, error);
                    match cached {
                        Some(forecast) => FetchOutcome::Degraded { forecast, error },
                        None => FetchOutcome::Failure { error },
                    }
                }
            };
            let _ = tx.send(outcome).await;
        });

        ForecastStream { rx, task }
    }

    /// Silent background refresh: no cache read, no outcome wrapping.
    /// Writes through to the store on success and hands the failure to
    /// the caller otherwise.
    #[instrument(skip(self), level = "info")]
    pub async fn refresh_forecast(&self, location: &Location) -> Result<Forecast, WeatherError> {
        fetch_and_store(&self.client, &self.store, &self.api_key, location).await
    }
}

async fn fetch_and_store(
    client: &WeatherClient,
    store: &ForecastStore,
    api_key: &str,
    location: &Location,
) -> Result<Forecast, WeatherError> {
    // Reject a blank credential before any request goes out.
    let key = api_key.trim();
    if key.is_empty() {
        return Err(WeatherError::MissingCredential);
    }

    // Both requests in flight at once; the first error abandons the
    // other call.
    let (current, samples) = tokio::try_join!(
        client.current_conditions(location.lat, location.lon, key),
        client.forecast_samples(location.lat, location.lon, key),
    )?;

    let forecast = merge::merge_to_forecast(
        location.clone(),
        &current,
        &samples,
        Utc::now().timestamp(),
    );
    store
        .put(&forecast)
        .map_err(|e| WeatherError::Store(e.to_string()))?;
    Ok(forecast)
}
