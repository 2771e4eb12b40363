//! Current-weather providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use spotfinder_core::secrets::{self, CredentialProvider};
use spotfinder_core::WeatherProviderKind;
use spotfinder_geo::Coordinate;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::types::{CurrentWeather, WeatherCondition, WeatherError};

const OPENWEATHER_URL: &str = "https://api.openweathermap.org";
const OPEN_METEO_URL: &str = "https://api.open-meteo.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Source of current conditions for a coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn current_weather(&self, coord: Coordinate) -> Result<CurrentWeather, WeatherError>;
}

fn http_client() -> Result<Client, WeatherError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, WeatherError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(WeatherError::Status {
        status: status.as_u16(),
        message,
    })
}

// OpenWeatherMap

#[derive(Debug, Deserialize)]
struct OwmResponse {
    #[serde(default)]
    weather: Vec<OwmWeather>,
    main: OwmMain,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

/// OpenWeatherMap current weather, metric units.
pub struct OpenWeatherMapProvider {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenWeatherMapProvider {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, WeatherError> {
        Self::with_base_url(credentials, OPENWEATHER_URL)
    }

    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: &str,
    ) -> Result<Self, WeatherError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    fn name(&self) -> &'static str {
        "openweathermap"
    }

    #[instrument(skip(self), level = "info")]
    async fn current_weather(&self, coord: Coordinate) -> Result<CurrentWeather, WeatherError> {
        let key = self.credentials.credential(secrets::OPENWEATHER_API_KEY)?;

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("lat", coord.lat.to_string()),
                ("lon", coord.lng.to_string()),
                ("units", "metric".to_string()),
                ("appid", key),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let body: OwmResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;

        let label = body
            .weather
            .into_iter()
            .next()
            .map(|w| w.main)
            .ok_or_else(|| WeatherError::Parse("response has no weather entry".into()))?;

        Ok(CurrentWeather {
            condition: WeatherCondition::from_openweather_main(&label),
            condition_label: label,
            temp_celsius: body.main.temp,
            wind_speed: body.wind.speed,
            humidity: body.main.humidity.round().clamp(0.0, 100.0) as u8,
        })
    }
}

// Open-Meteo

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: OpenMeteoCurrent,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    weather_code: i32,
    wind_speed_10m: f64,
}

/// Open-Meteo current conditions. Needs no API key.
pub struct OpenMeteoProvider {
    client: Client,
    base_url: String,
}

impl OpenMeteoProvider {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(OPEN_METEO_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn name(&self) -> &'static str {
        "open_meteo"
    }

    #[instrument(skip(self), level = "info")]
    async fn current_weather(&self, coord: Coordinate) -> Result<CurrentWeather, WeatherError> {
        let response = self
            .client
            .get(format!("{}/v1/forecast", self.base_url))
            .query(&[
                ("latitude", coord.lat.to_string()),
                ("longitude", coord.lng.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m".to_string(),
                ),
                ("wind_speed_unit", "ms".to_string()),
            ])
            .send()
            .await?;
        let body: OpenMeteoResponse = check_status(response).await?.json().await?;
        let current = body.current;
        let condition = WeatherCondition::from_wmo_code(current.weather_code);

        Ok(CurrentWeather {
            condition_label: condition.description().to_string(),
            condition,
            temp_celsius: current.temperature_2m,
            wind_speed: current.wind_speed_10m,
            humidity: current.relative_humidity_2m.round().clamp(0.0, 100.0) as u8,
        })
    }
}

/// Build the configured provider.
pub fn provider_for(
    kind: WeatherProviderKind,
    credentials: Arc<dyn CredentialProvider>,
) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
    Ok(match kind {
        WeatherProviderKind::OpenWeatherMap => Arc::new(OpenWeatherMapProvider::new(credentials)?),
        WeatherProviderKind::OpenMeteo => Arc::new(OpenMeteoProvider::new()?),
    })
}
