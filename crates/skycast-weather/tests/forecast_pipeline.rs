//! Integration tests for the forecast pipeline using wiremock.
//!
//! These exercise the catalog, store, client and repository together
//! through the public API.

use std::sync::Arc;
use std::time::Duration;

use skycast_weather::{
    FetchOutcome, ForecastRepository, ForecastStore, LocationCatalog, WeatherClient, WeatherError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2024-03-10 00:00:00 UTC
const DAY_START: i64 = 1_710_028_800;

/// A port from the reserved range that nothing listens on.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

fn current_body(condition: &str) -> serde_json::Value {
    serde_json::json!({
        "dt": DAY_START,
        "main": {"temp": 18.4, "temp_min": 16.0, "temp_max": 21.2, "humidity": 62},
        "weather": [{"id": 500, "main": "Rain", "description": condition, "icon": "10d"}],
        "wind": {"speed": 3.6},
        "name": "Tokyo"
    })
}

fn forecast_body() -> serde_json::Value {
    let samples: Vec<serde_json::Value> = (0..40)
        .map(|i| {
            serde_json::json!({
                "dt": DAY_START + i * 10_800,
                "main": {"temp": 17.0, "temp_min": 15.0, "temp_max": 20.0, "humidity": 70},
                "weather": [{"id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d"}]
            })
        })
        .collect();
    serde_json::json!({ "list": samples })
}

async fn mount_success(server: &MockServer, condition: &str) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(condition)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(server)
        .await;
}

fn repository_with_store(base_url: &str, store: Arc<ForecastStore>) -> ForecastRepository {
    let client = WeatherClient::new(base_url, "en").unwrap();
    ForecastRepository::new(client, store, "test_key".to_string())
}

#[tokio::test]
async fn test_select_city_then_fetch_and_observe_cache() {
    let server = MockServer::start().await;
    mount_success(&server, "light rain").await;

    let dir = tempfile::tempdir().unwrap();
    let catalog = LocationCatalog::open(dir.path().join("prefs.db")).unwrap();
    let store = Arc::new(ForecastStore::open_in_memory().unwrap());
    let repo = repository_with_store(&server.uri(), Arc::clone(&store));

    catalog.select("1816670").unwrap();
    let selected_id = catalog.selected().borrow().clone();
    let location = catalog.find(&selected_id).cloned().unwrap();
    assert_eq!(location.name, "Tokyo");

    // Observe the cache reactively while the pipeline writes through.
    let mut subscription = store.subscribe(&location.id);
    assert!(subscription.borrow().is_none());

    let outcomes = repo.fetch_forecast(&location).collect().await;

    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        FetchOutcome::Success {
            forecast,
            from_cache,
        } => {
            assert!(!*from_cache);
            assert_eq!(forecast.location.id, "1816670");
            assert_eq!(forecast.current.condition, "light rain");
        }
        other => panic!("expected fresh success, got {:?}", other),
    }

    assert!(subscription.has_changed().unwrap());
    let observed = subscription.borrow_and_update().clone().unwrap();
    assert_eq!(observed.current.condition, "light rain");
}

#[tokio::test]
async fn test_pipeline_write_reads_back_losslessly() {
    let server = MockServer::start().await;
    mount_success(&server, "scattered clouds").await;

    let catalog = LocationCatalog::open_in_memory().unwrap();
    let store = Arc::new(ForecastStore::open_in_memory().unwrap());
    let repo = repository_with_store(&server.uri(), Arc::clone(&store));
    let location = catalog.find("1668341").cloned().unwrap();

    let fetched = repo.refresh_forecast(&location).await.unwrap();
    let stored = store.get(&location.id).unwrap().unwrap();

    assert_eq!(stored, fetched);
}

#[tokio::test]
async fn test_offline_falls_back_to_durable_cache() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("forecasts.db");

    // First run: online, populates the cache on disk.
    {
        let server = MockServer::start().await;
        mount_success(&server, "clear sky").await;
        let store = Arc::new(ForecastStore::open(&db_path).unwrap());
        let repo = repository_with_store(&server.uri(), Arc::clone(&store));
        let catalog = LocationCatalog::open_in_memory().unwrap();
        let location = catalog.find("1668341").cloned().unwrap();
        repo.refresh_forecast(&location).await.unwrap();
    }

    // Second run: provider unreachable, cached forecast still served.
    let store = Arc::new(ForecastStore::open(&db_path).unwrap());
    let repo = repository_with_store(DEAD_ENDPOINT, Arc::clone(&store));
    let catalog = LocationCatalog::open_in_memory().unwrap();
    let location = catalog.find("1668341").cloned().unwrap();

    let outcomes = repo.fetch_forecast(&location).collect().await;

    assert_eq!(outcomes.len(), 2);
    match &outcomes[0] {
        FetchOutcome::Success {
            forecast,
            from_cache,
        } => {
            assert!(*from_cache);
            assert_eq!(forecast.current.condition, "clear sky");
        }
        other => panic!("expected cached success first, got {:?}", other),
    }
    match &outcomes[1] {
        FetchOutcome::Degraded { forecast, error } => {
            assert_eq!(forecast.current.condition, "clear sky");
            assert!(matches!(error, WeatherError::Network(_)));
        }
        other => panic!("expected degraded outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_offline_cold_cache_is_pure_failure() {
    let store = Arc::new(ForecastStore::open_in_memory().unwrap());
    let repo = repository_with_store(DEAD_ENDPOINT, store);
    let catalog = LocationCatalog::open_in_memory().unwrap();
    let location = catalog.find("2643743").cloned().unwrap();

    let outcomes = repo.fetch_forecast(&location).collect().await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0],
        FetchOutcome::Failure {
            error: WeatherError::Network(_)
        }
    ));
}

#[tokio::test]
async fn test_stale_stream_dropped_before_new_selection() {
    // A UI switching cities drops the stale stream and starts a new
    // fetch; the abandoned fetch must not touch the cache.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_body("slow answer"))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body())
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let catalog = LocationCatalog::open_in_memory().unwrap();
    let store = Arc::new(ForecastStore::open_in_memory().unwrap());
    let repo = repository_with_store(&server.uri(), Arc::clone(&store));

    let old_location = catalog.find("1668341").cloned().unwrap();
    let stale = repo.fetch_forecast(&old_location);
    drop(stale);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(store.get("1668341").unwrap().is_none());
}
