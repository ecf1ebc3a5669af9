use serde::{Deserialize, Serialize};
use todo_core::{AppError, ConfigError, NetworkError};

/// Latest weather reading attached to a task.
///
/// Replaced as a whole on every successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Primary condition group, e.g. "Snow", "Rain", "Clouds", "Clear"
    pub main: String,
    /// Degrees Celsius
    pub temperature: f64,
}

impl Weather {
    pub fn new(main: impl Into<String>, temperature: f64) -> Self {
        Self {
            main: main.into(),
            temperature,
        }
    }
}

/// Body of `GET /data/2.5/weather`, reduced to the fields we keep.
#[derive(Debug, Deserialize)]
pub(crate) struct CurrentWeatherResponse {
    pub weather: Vec<ConditionEntry>,
    pub main: MainReadings,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConditionEntry {
    pub main: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MainReadings {
    pub temp: f64,
}

impl CurrentWeatherResponse {
    /// The provider may report several simultaneous conditions; the first is primary.
    pub(crate) fn into_weather(self) -> Result<Weather, WeatherError> {
        let primary = self
            .weather
            .into_iter()
            .next()
            .ok_or(WeatherError::NoConditions)?;

        Ok(Weather {
            main: primary.main,
            temperature: self.main.temp,
        })
    }
}

/// Weather fetch failures.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Response contained no weather conditions")]
    NoConditions,
    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),
}

impl WeatherError {
    /// HTTP status reported by the provider, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(e) => e.status(),
            _ => None,
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::Network(e) => AppError::Network(e),
            WeatherError::NoConditions => {
                AppError::Network(NetworkError::Malformed(
                    "response contained no weather conditions".to_string(),
                ))
            }
            WeatherError::InvalidUrl(url) => {
                AppError::Config(ConfigError::Invalid(format!("weather.api_url: {url}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_first_condition_is_primary() {
        let body: CurrentWeatherResponse = serde_json::from_value(serde_json::json!({
            "weather": [{"main": "Rain"}, {"main": "Mist"}],
            "main": {"temp": 7.5, "humidity": 90},
            "name": "London"
        }))
        .unwrap();

        assert_eq!(body.into_weather().unwrap(), Weather::new("Rain", 7.5));
    }

    #[test]
    fn test_empty_condition_list() {
        let body: CurrentWeatherResponse = serde_json::from_value(serde_json::json!({
            "weather": [],
            "main": {"temp": 7.5}
        }))
        .unwrap();

        assert!(matches!(body.into_weather(), Err(WeatherError::NoConditions)));
    }

    #[test]
    fn test_missing_temperature_fails_to_parse() {
        let body = serde_json::from_value::<CurrentWeatherResponse>(serde_json::json!({
            "weather": [{"main": "Clear"}],
            "main": {}
        }));
        assert!(body.is_err());
    }

    #[test]
    fn test_status_accessor() {
        let rejected = WeatherError::Network(NetworkError::Rejected {
            status: 401,
            body: String::new(),
        });
        assert_eq!(rejected.status(), Some(401));
        assert_eq!(WeatherError::NoConditions.status(), None);
    }

    #[test]
    fn test_converts_into_app_error() {
        let timeout: AppError = WeatherError::Network(NetworkError::Timeout).into();
        assert!(matches!(timeout, AppError::Network(NetworkError::Timeout)));

        let empty: AppError = WeatherError::NoConditions.into();
        assert!(matches!(empty, AppError::Network(NetworkError::Malformed(_))));

        let url: AppError = WeatherError::InvalidUrl("nope".into()).into();
        assert!(matches!(url, AppError::Config(ConfigError::Invalid(_))));
    }
}
