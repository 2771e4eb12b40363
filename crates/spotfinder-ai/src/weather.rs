//! Fishing-condition commentary for the current weather.

use serde::{Deserialize, Serialize};
use spotfinder_geo::Coordinate;
use spotfinder_weather::WeatherProvider;
use std::sync::Arc;
use tracing::instrument;

use crate::client::TextGenerator;
use crate::error::AnalysisError;
use crate::prompts;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherAnalysis {
    /// Condition label, e.g. "Clear"
    pub weather: String,
    /// Degrees Celsius
    pub temperature: f64,
    pub fishing_conditions: String,
}

/// Fetches current weather and asks the generator for a two-sentence
/// commentary. Nothing is cached.
pub struct WeatherAnnotator {
    weather: Arc<dyn WeatherProvider>,
    generator: Arc<dyn TextGenerator>,
}

impl WeatherAnnotator {
    pub fn new(weather: Arc<dyn WeatherProvider>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { weather, generator }
    }

    /// # Errors
    /// `Weather` or `Provider` if either call fails; no partial result.
    #[instrument(skip(self), level = "info")]
    pub async fn analyze(&self, coord: Coordinate) -> Result<WeatherAnalysis, AnalysisError> {
        let current = self.weather.current_weather(coord).await?;
        tracing::debug!(
            "{} reports {} at {}°C",
            self.weather.name(),
            current.condition_label,
            current.temp_celsius
        );

        let commentary = self
            .generator
            .complete(
                prompts::WEATHER_SYSTEM,
                &prompts::weather_conditions(&current),
                None,
            )
            .await?;

        Ok(WeatherAnalysis {
            weather: current.condition_label,
            temperature: current.temp_celsius,
            fishing_conditions: commentary.trim().to_string(),
        })
    }
}
