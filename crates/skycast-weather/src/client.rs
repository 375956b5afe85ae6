//! Remote weather provider client (OpenWeatherMap wire contract).

use std::time::Duration;

use serde::Deserialize;
use tracing::instrument;

use crate::error::WeatherError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Current-conditions response.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentResponse {
    pub dt: i64,
    pub main: MainMeasurements,
    #[serde(default)]
    pub weather: Vec<ConditionInfo>,
    pub wind: Option<WindInfo>,
    /// Provider-reported location name; informational only, the catalog
    /// is authoritative for naming.
    #[serde(default)]
    pub name: Option<String>,
}

/// Multi-day forecast response: a list of timestamped samples, typically
/// at 3-hour resolution over 5 days.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSample {
    pub dt: i64,
    pub main: MainMeasurements,
    #[serde(default)]
    pub weather: Vec<ConditionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainMeasurements {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindInfo {
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// HTTP client for the weather provider.
///
/// Stateless per call; the credential is passed per request and the
/// caller is responsible for rejecting blank credentials before any
/// request is issued.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

impl WeatherClient {
    /// Create a client for the given provider base URL.
    ///
    /// `language` is the provider `lang` parameter used for condition
    /// descriptions. Units are fixed to metric.
    pub fn new(base_url: &str, language: &str) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }

    /// Fetch current conditions for a coordinate pair.
    #[instrument(skip(self, api_key), level = "info")]
    pub async fn current_conditions(
        &self,
        lat: f64,
        lon: f64,
        api_key: &str,
    ) -> Result<CurrentResponse, WeatherError> {
        let url = format!(
            "{}/weather?lat={}&lon={}&units=metric&lang={}&appid={}",
            self.base_url,
            lat,
            lon,
            urlencoding::encode(&self.language),
            urlencoding::encode(api_key),
        );

        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Fetch the forecast sample list (5-day/3-hour horizon) for a
    /// coordinate pair.
    #[instrument(skip(self, api_key), level = "info")]
    pub async fn forecast_samples(
        &self,
        lat: f64,
        lon: f64,
        api_key: &str,
    ) -> Result<ForecastResponse, WeatherError> {
        let url = format!(
            "{}/forecast?lat={}&lon={}&units=metric&lang={}&appid={}",
            self.base_url,
            lat,
            lon,
            urlencoding::encode(&self.language),
            urlencoding::encode(api_key),
        );

        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            if body.trim().is_empty() {
                return Err(WeatherError::Data("empty response body".to_string()));
            }
            serde_json::from_str(&body)
                .map_err(|e| WeatherError::Data(format!("undecodable response body: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(WeatherError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }
}
