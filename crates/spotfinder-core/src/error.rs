//! Centralized error types for spotfinder.
//!
//! Every crate in the workspace keeps its own narrow error enum and converts
//! into [`AppError`] at the boundary. `AppError` carries:
//! - the error taxonomy surfaced to callers (relay handlers, CLI)
//! - a user-friendly notification message
//! - the HTTP status the relay answers with

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` for the text shown in a dismissible notification and
/// `status_code()` for the relay response status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location information unavailable")]
    PositionUnavailable,

    #[error("Request timed out")]
    Timeout,

    #[error("Location capability not supported on this platform")]
    UnsupportedPlatform,

    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("Malformed analysis: {0}")]
    MalformedAnalysis(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Credential missing: {0}")]
    CredentialMissing(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The image-understanding provider found nothing usable in a photo.
    #[error("Nothing detected: {0}")]
    NotDetected(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a provider failure.
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Returns a user-friendly message suitable for a transient notification.
    ///
    /// These messages are designed to be actionable and non-technical.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::PermissionDenied => {
                "Location permission denied. Please enable location access in your browser settings."
            }
            AppError::PositionUnavailable => "Location information unavailable.",
            AppError::Timeout => "The request timed out. Please try again.",
            AppError::UnsupportedPlatform => "Geolocation is not supported by this browser.",
            AppError::ProviderUnavailable { .. } | AppError::MalformedAnalysis(_) => {
                "Could not complete analysis. Please try again."
            }
            AppError::StoreUnavailable(_) => "Saved data is unavailable right now. Please try again.",
            AppError::CredentialMissing(_) => {
                "A required API key is not configured. Check your settings."
            }
            AppError::InvalidRequest(_) => "The request was invalid. Please check your input.",
            AppError::NotDetected(_) => "No fish detected in the image. Please try another photo.",
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// HTTP status code the relay responds with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidRequest(_) => 400,
            AppError::PermissionDenied => 403,
            AppError::PositionUnavailable
            | AppError::UnsupportedPlatform
            | AppError::NotDetected(_) => 422,
            AppError::ProviderUnavailable { .. } | AppError::MalformedAnalysis(_) => 502,
            AppError::StoreUnavailable(_) => 503,
            AppError::Timeout => 504,
            AppError::CredentialMissing(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Other(_) => 500,
        }
    }

    /// Whether the failure came from the user's location permission or platform.
    pub fn is_location_error(&self) -> bool {
        matches!(
            self,
            AppError::PermissionDenied
                | AppError::PositionUnavailable
                | AppError::UnsupportedPlatform
        )
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    /// A timeout keeps its own kind; anything else means `provider` is unavailable.
    pub fn into_app_error(self, provider: &str) -> AppError {
        match self {
            NetworkError::Timeout => AppError::Timeout,
            other => AppError::provider(provider, other.to_string()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
