//! Credential lookup backed by the `secrets` table.

use spotfinder_core::secrets::{CredentialProvider, EnvCredentials};
use spotfinder_core::AppError;
use std::sync::Arc;

use crate::backend::SecretStore;

/// Resolves a named credential from the store first, then from a fallback
/// provider (the process environment by default).
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
    fallback: Arc<dyn CredentialProvider>,
}

impl SecretResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            fallback: Arc::new(EnvCredentials),
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn CredentialProvider>) -> Self {
        self.fallback = fallback;
        self
    }
}

impl CredentialProvider for SecretResolver {
    fn credential(&self, name: &str) -> Result<String, AppError> {
        match self.store.get_secret(name)? {
            Some(value) if !value.trim().is_empty() => {
                tracing::debug!("Credential {} resolved from store", name);
                Ok(value)
            }
            _ => self.fallback.credential(name),
        }
    }
}
