//! Named API credentials.
//!
//! Clients never hold keys; they ask a [`CredentialProvider`] by name at call
//! time so a key rotated in the store is picked up on the next request.

use crate::error::AppError;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENWEATHER_API_KEY: &str = "OPENWEATHER_API_KEY";
pub const OPENCAGE_API_KEY: &str = "OPENCAGE_API_KEY";
pub const GOOGLE_MAPS_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
pub const GOOGLE_CLOUD_API_KEY: &str = "GOOGLE_CLOUD_API_KEY";

/// Source of named credentials.
pub trait CredentialProvider: Send + Sync {
    /// Look up a credential by name.
    ///
    /// # Errors
    /// `AppError::CredentialMissing` when no non-empty value exists,
    /// `AppError::StoreUnavailable` when the backing store can't be read.
    fn credential(&self, name: &str) -> Result<String, AppError>;
}

/// Credentials read from process environment variables of the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn credential(&self, name: &str) -> Result<String, AppError> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(AppError::CredentialMissing(name.to_string())),
        }
    }
}

/// Fixed credentials, mainly for tests and one-off CLI runs.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: Vec<(String, String)>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn credential(&self, name: &str) -> Result<String, AppError> {
        self.entries
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.clone())
            .ok_or_else(|| AppError::CredentialMissing(name.to_string()))
    }
}

/// Replace every occurrence of `secret` in a provider message.
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "HIDDEN")
}
