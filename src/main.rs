use anyhow::{Context, Result};
use std::sync::Arc;

use skycast_core::Config;
use skycast_weather::{
    FetchOutcome, ForecastRepository, ForecastStore, LocationCatalog, WeatherClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    std::fs::create_dir_all(&config.data_dir).context("Failed to create data directory")?;

    // The storage handles are constructed here and injected; nothing
    // else opens connections.
    let store = Arc::new(ForecastStore::open(config.data_dir.join("forecasts.db"))?);
    let catalog = LocationCatalog::open(config.data_dir.join("prefs.db"))?;
    let client = WeatherClient::new(&config.weather.api_base_url, &config.weather.language)?;
    let repository =
        ForecastRepository::new(client, Arc::clone(&store), config.weather.api_key.clone());

    tracing::info!("Skycast started");

    let selected_id = catalog.selected().borrow().clone();
    let location = catalog
        .find(&selected_id)
        .cloned()
        .context("Selected location missing from catalog")?;

    println!(
        "Forecast for {}, {} ({} locations available)",
        location.name,
        location.country,
        catalog.list().len()
    );

    let mut stream = repository.fetch_forecast(&location);
    while let Some(outcome) = stream.next().await {
        match outcome {
            FetchOutcome::Success {
                forecast,
                from_cache,
            } => {
                let origin = if from_cache { "cached" } else { "fresh" };
                println!(
                    "[{}] {}  {:.1}°C ({:.1}..{:.1})",
                    origin,
                    forecast.current.condition,
                    forecast.current.temp_c,
                    forecast.current.temp_min_c,
                    forecast.current.temp_max_c,
                );
                for day in &forecast.daily {
                    println!(
                        "  day {}: {:.1}..{:.1}°C  {}",
                        day.date_epoch, day.temp_min_c, day.temp_max_c, day.condition
                    );
                }
            }
            FetchOutcome::Degraded { forecast, error } => {
                println!(
                    "[stale] {}  {:.1}°C ({})",
                    forecast.current.condition,
                    forecast.current.temp_c,
                    error.user_message()
                );
            }
            FetchOutcome::Failure { error } => {
                println!("Fetch failed: {}", error.user_message());
            }
        }
    }

    Ok(())
}
