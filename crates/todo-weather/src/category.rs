//! Display category for a task, derived from its latest weather reading.

use serde::{Deserialize, Serialize};

use crate::types::Weather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    /// No reading yet
    #[default]
    Neutral,
    Cold,
    Mild,
    Warm,
}

impl WeatherCategory {
    /// Classify a reading. Rules are checked in order and the first match wins,
    /// so a condition rule can override the temperature band: rain at 20°C is
    /// `Cold`, clouds at -5°C are `Cold` too.
    pub fn classify(weather: Option<&Weather>) -> Self {
        let Some(weather) = weather else {
            return Self::Neutral;
        };

        let temperature = weather.temperature;
        let main = weather.main.as_str();

        if temperature < 0.0 || main == "Rain" {
            return Self::Cold;
        }

        if (0.0..15.0).contains(&temperature) || main == "Clouds" {
            return Self::Mild;
        }

        if temperature >= 15.0 || main == "Clear" {
            return Self::Warm;
        }

        // Only reachable with a NaN temperature and an unrecognised condition.
        Self::Neutral
    }

    /// CSS classes used by the task list.
    pub fn css_classes(&self) -> &'static str {
        match self {
            Self::Neutral => "border",
            Self::Cold => "border-indigo bg-indigo-100",
            Self::Mild => "border-orange bg-orange-100",
            Self::Warm => "border-red bg-red-100",
        }
    }
}
