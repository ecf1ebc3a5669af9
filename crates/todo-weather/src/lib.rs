//! Weather support for tasks
//!
//! Location strings from the task form, the OpenWeatherMap current-weather
//! client, and the display category derived from a task's latest reading.

pub mod category;
pub mod location;
pub mod provider;
pub mod types;

pub use category::WeatherCategory;
pub use location::{Location, LocationParseError};
pub use provider::{WeatherFetcher, WeatherProvider};
pub use types::{Weather, WeatherError};
