use serde::{Deserialize, Serialize};
use spotfinder_core::{AppError, ReqwestErrorExt};

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Map the OpenWeatherMap `weather[0].main` group.
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_openweather_main(main: &str) -> Self {
        match main {
            "Clear" => Self::Clear,
            "Clouds" => Self::Cloudy,
            "Mist" | "Fog" | "Haze" | "Smoke" | "Dust" | "Sand" => Self::Fog,
            "Drizzle" => Self::Drizzle,
            "Rain" => Self::Rain,
            "Snow" => Self::Snow,
            "Thunderstorm" => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }
}

/// Current conditions at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    /// Provider's own label, e.g. "Clear" or "Partly Cloudy"
    pub condition_label: String,
    pub condition: WeatherCondition,
    pub temp_celsius: f64,
    /// Metres per second
    pub wind_speed: f64,
    /// Relative humidity, percent
    pub humidity: u8,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Credential missing: {0}")]
    Credential(String),
    #[error("Credential lookup failed: {0}")]
    CredentialLookup(String),
}

impl From<AppError> for WeatherError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::CredentialMissing(name) => WeatherError::Credential(name),
            other => WeatherError::CredentialLookup(other.to_string()),
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Credential(name) => AppError::CredentialMissing(name),
            WeatherError::CredentialLookup(msg) => AppError::StoreUnavailable(msg),
            WeatherError::Network(err) => err.into_network_error().into_app_error("weather"),
            other => AppError::provider("weather", other.to_string()),
        }
    }
}
