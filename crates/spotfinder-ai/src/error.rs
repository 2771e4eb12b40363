//! Analysis error types.

use spotfinder_core::{AppError, ReqwestErrorExt};
use spotfinder_store::StoreError;
use spotfinder_weather::WeatherError;
use thiserror::Error;

/// Generative text provider failures.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Provider response has no message content")]
    EmptyResponse,

    #[error("Credential missing: {0}")]
    Credential(String),

    #[error("Credential lookup failed: {0}")]
    CredentialLookup(String),
}

impl From<AppError> for ProviderError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::CredentialMissing(name) => ProviderError::Credential(name),
            other => ProviderError::CredentialLookup(other.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Credential(name) => AppError::CredentialMissing(name),
            ProviderError::CredentialLookup(msg) => AppError::StoreUnavailable(msg),
            ProviderError::Network(err) => err.into_network_error().into_app_error("openai"),
            other => AppError::provider("openai", other.to_string()),
        }
    }
}

/// Image-understanding provider failures.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Vision API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("No objects detected in the image")]
    NoObjectsDetected,

    #[error("No fish detected in the image")]
    NoFishDetected,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Credential missing: {0}")]
    Credential(String),

    #[error("Credential lookup failed: {0}")]
    CredentialLookup(String),
}

impl From<AppError> for VisionError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::CredentialMissing(name) => VisionError::Credential(name),
            other => VisionError::CredentialLookup(other.to_string()),
        }
    }
}

impl From<VisionError> for AppError {
    fn from(e: VisionError) -> Self {
        match e {
            not_found @ (VisionError::NoObjectsDetected | VisionError::NoFishDetected) => {
                AppError::NotDetected(not_found.to_string())
            }
            VisionError::InvalidImage(msg) => AppError::InvalidRequest(msg),
            VisionError::Credential(name) => AppError::CredentialMissing(name),
            VisionError::CredentialLookup(msg) => AppError::StoreUnavailable(msg),
            VisionError::Network(err) => err.into_network_error().into_app_error("vision"),
            other => AppError::provider("vision", other.to_string()),
        }
    }
}

/// Errors from the analysis services.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed analysis: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnalysisError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Provider(err) => err.into(),
            AnalysisError::Malformed(msg) => AppError::MalformedAnalysis(msg),
            AnalysisError::Store(err) => err.into(),
            AnalysisError::Weather(err) => err.into(),
            AnalysisError::Vision(err) => err.into(),
            AnalysisError::InvalidInput(msg) => AppError::InvalidRequest(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_analysis_error_taxonomy() {
        let app: AppError = AnalysisError::Malformed("not json".into()).into();
        assert!(matches!(app, AppError::MalformedAnalysis(_)));

        let app: AppError = AnalysisError::Provider(ProviderError::EmptyResponse).into();
        assert!(matches!(app, AppError::ProviderUnavailable { .. }));

        let app: AppError = AnalysisError::Provider(ProviderError::Credential("OPENAI_API_KEY".into())).into();
        assert!(matches!(app, AppError::CredentialMissing(_)));

        let app: AppError = AnalysisError::Store(StoreError::storage("locked")).into();
        assert!(matches!(app, AppError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_provider_unavailable() {
        let err = reqwest::get("http://127.0.0.1:9/v1/chat/completions")
            .await
            .unwrap_err();
        let app: AppError = ProviderError::Network(err).into();
        assert!(matches!(
            app,
            AppError::ProviderUnavailable { ref provider, ref reason }
                if provider == "openai" && reason.starts_with("Connection failed")
        ));
    }

    #[test]
    fn test_vision_errors_map_to_not_detected() {
        let app: AppError = VisionError::NoFishDetected.into();
        assert!(matches!(app, AppError::NotDetected(ref m) if m.contains("No fish")));
        assert_eq!(app.status_code(), 422);
    }
}
