//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spotfinder_core::secrets::{self, CredentialProvider};
use spotfinder_core::AnalysisConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::error::ProviderError;

const OPENAI_API_BASE: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A remote text-generation endpoint.
///
/// The provider does not guarantee structured output; callers that need JSON
/// go through [`crate::structured::request_structured`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete one system + user exchange and return the reply text.
    ///
    /// # Errors
    /// `ProviderError` on transport failure, non-2xx status, a missing
    /// credential, or a reply without content.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenAiClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, ProviderError> {
        Self::with_base_url(credentials, OPENAI_API_BASE, DEFAULT_MODEL)
    }

    /// Build from the `[analysis]` config section.
    pub fn from_config(
        credentials: Arc<dyn CredentialProvider>,
        config: &AnalysisConfig,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(credentials, &config.api_base_url, &config.model)
    }

    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: &str,
        model: &str,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            credentials,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn handle_response(response: reqwest::Response) -> Result<String, ProviderError> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!("Completion request failed with {}", status);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatCompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip(self, system, user), level = "info", fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
    ) -> Result<String, ProviderError> {
        let key = self.credentials.credential(secrets::OPENAI_API_KEY)?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }
}
