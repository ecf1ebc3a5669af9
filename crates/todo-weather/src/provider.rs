//! OpenWeatherMap current-weather client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use todo_core::{NetworkError, ReqwestErrorExt, WeatherConfig, DEFAULT_WEATHER_API_URL};
use tracing::instrument;
use url::Url;

use crate::location::Location;
use crate::types::{CurrentWeatherResponse, Weather, WeatherError};

/// Source of current weather readings for a location.
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// Fetch the current reading for `location`.
    ///
    /// # Errors
    /// Any failure to obtain a usable reading. Transport errors and timeouts,
    /// non-200 statuses and unreadable bodies all arrive as `WeatherError::Network`.
    async fn fetch(&self, location: &Location) -> Result<Weather, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    api_url: Url,
    api_key: String,
}

impl WeatherProvider {
    /// Create a provider for the public OpenWeatherMap endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        Self::with_api_url(DEFAULT_WEATHER_API_URL, api_key, timeout)
    }

    /// Create a provider for an explicit endpoint (used against mock servers).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn with_api_url(
        api_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let api_url =
            Url::parse(api_url).map_err(|e| WeatherError::InvalidUrl(format!("{api_url}: {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            api_url,
            api_key: api_key.into(),
        })
    }

    /// # Errors
    /// Returns an error if the configured URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Self::with_api_url(
            &config.api_url,
            config.api_key.clone(),
            config.request_timeout(),
        )
    }
}

#[async_trait]
impl WeatherFetcher for WeatherProvider {
    #[instrument(skip(self, location), fields(lat = location.lat, lon = location.lon), level = "debug")]
    async fn fetch(&self, location: &Location) -> Result<Weather, WeatherError> {
        let response = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("lat", location.lat.to_string()),
                ("lon", location.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Weather provider returned status {}", status);
            return Err(NetworkError::Rejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        body.into_weather()
    }
}
