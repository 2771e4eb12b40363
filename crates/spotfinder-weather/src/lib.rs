//! Weather service for spotfinder
//!
//! Current conditions from OpenWeatherMap or Open-Meteo, normalised into a
//! single [`CurrentWeather`] shape.

pub mod provider;
pub mod types;

pub use provider::{provider_for, OpenMeteoProvider, OpenWeatherMapProvider, WeatherProvider};
pub use types::*;
