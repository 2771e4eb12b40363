use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Relay server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Persistent store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Generative analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Reverse geocoding settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Nearby search settings
    #[serde(default)]
    pub places: PlacesConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Geolocation settings
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the relay binds to
    pub bind_address: String,

    /// Port the relay listens on
    pub port: u16,

    /// Value of `Access-Control-Allow-Origin`
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

impl ServerConfig {
    /// `allowed_origin` as `scheme://host[:port]`, or `*`.
    ///
    /// A trailing slash in the configured value is dropped here.
    pub fn cors_origin(&self) -> String {
        if self.allowed_origin == "*" {
            return self.allowed_origin.clone();
        }
        match Url::parse(&self.allowed_origin) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.allowed_origin.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8787,
            allowed_origin: default_allowed_origin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// SQLite database path. Defaults to `<config_dir>/spotfinder.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Base URL of the OpenAI-compatible completion API
    pub api_base_url: String,

    /// Model used for every completion
    pub model: String,

    /// Cached spot analyses older than this are regenerated.
    /// `None` keeps them forever.
    #[serde(default)]
    pub cache_max_age_hours: Option<u64>,

    /// Longest user-supplied text (place name, chat message) put in a prompt
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

fn default_max_prompt_chars() -> usize {
    500
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            cache_max_age_hours: None,
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

/// Reverse geocoding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocoderKind {
    Nominatim,
    #[serde(rename = "opencage")]
    OpenCage,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Providers raced against each other; first success wins
    pub providers: Vec<GeocoderKind>,

    /// Upper bound on the whole race, in seconds
    pub race_timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            providers: vec![GeocoderKind::Google, GeocoderKind::OpenCage],
            race_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// Nearby search radius in meters
    pub radius_meters: u32,

    /// Search keyword
    pub keyword: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            radius_meters: 5000,
            keyword: "fishing spot".to_string(),
        }
    }
}

/// Current-weather backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProviderKind {
    #[default]
    #[serde(rename = "openweathermap")]
    OpenWeatherMap,
    OpenMeteo,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeatherConfig {
    /// Which provider answers current-weather requests
    pub provider: WeatherProviderKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// How long to wait for a position fix, in seconds
    pub timeout_secs: u64,

    /// Fixed position used by the CLI when no platform source is available
    #[serde(default)]
    pub home: Option<HomePosition>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HomePosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            home: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spotfinder");

        Self {
            config_dir,
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            analysis: AnalysisConfig::default(),
            geocoding: GeocodingConfig::default(),
            places: PlacesConfig::default(),
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating a default file if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(config_path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match config_path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.server.bind_address.trim().is_empty() {
            result.add_error("server.bind_address", "Bind address cannot be empty");
        } else if self.server.bind_address.parse::<std::net::IpAddr>().is_err() {
            result.add_error(
                "server.bind_address",
                format!("Not an IP address: {}", self.server.bind_address),
            );
        }
        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }
        if self.server.allowed_origin != "*" {
            self.validate_url(
                &self.server.allowed_origin,
                "server.allowed_origin",
                &mut result,
            );
            if let Ok(url) = Url::parse(&self.server.allowed_origin) {
                let bare = url.path() == "/"
                    && url.query().is_none()
                    && url.fragment().is_none()
                    && url.username().is_empty()
                    && url.password().is_none();
                if !bare {
                    result.add_error(
                        "server.allowed_origin",
                        "Origin must be scheme://host[:port] without a path or query",
                    );
                }
            }
        }

        self.validate_url(
            &self.analysis.api_base_url,
            "analysis.api_base_url",
            &mut result,
        );
        if self.analysis.model.trim().is_empty() {
            result.add_error("analysis.model", "Model name cannot be empty");
        }
        if self.analysis.cache_max_age_hours == Some(0) {
            result.add_warning(
                "analysis.cache_max_age_hours",
                "Cache age of 0 hours regenerates every analysis",
            );
        }

        if self.analysis.max_prompt_chars == 0 {
            result.add_error("analysis.max_prompt_chars", "Prompt length limit must be greater than 0");
        }

        match self.geocoding.providers.len() {
            0 => result.add_error("geocoding.providers", "At least one geocoder is required"),
            1 => result.add_warning(
                "geocoding.providers",
                "Only one geocoder configured; no fallback provider",
            ),
            _ => {}
        }
        if self.geocoding.race_timeout_secs == 0 {
            result.add_error("geocoding.race_timeout_secs", "Timeout must be greater than 0");
        }

        if self.places.radius_meters == 0 {
            result.add_error("places.radius_meters", "Radius must be greater than 0");
        } else if self.places.radius_meters > 50_000 {
            result.add_error(
                "places.radius_meters",
                "Radius exceeds the 50000 m nearby-search maximum",
            );
        }
        if self.places.keyword.trim().is_empty() {
            result.add_warning("places.keyword", "Empty keyword returns every nearby place");
        }

        if self.location.timeout_secs == 0 {
            result.add_error("location.timeout_secs", "Timeout must be greater than 0");
        }
        if let Some(home) = self.location.home {
            if !(-90.0..=90.0).contains(&home.latitude) {
                result.add_error("location.home.latitude", "Latitude must be within -90..90");
            }
            if !(-180.0..=180.0).contains(&home.longitude) {
                result.add_error("location.home.longitude", "Longitude must be within -180..180");
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Path of the SQLite database backing the store
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("spotfinder.db"))
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("spotfinder");

        Ok(config_dir.join("config.toml"))
    }
}
