//! Conversational regulations expert.

use std::sync::Arc;
use tracing::instrument;

use crate::client::TextGenerator;
use crate::error::AnalysisError;
use crate::prompts;

pub struct ExpertChat {
    generator: Arc<dyn TextGenerator>,
    max_message_chars: usize,
}

impl ExpertChat {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_message_chars: 500,
        }
    }

    #[must_use]
    pub fn with_max_message_chars(mut self, max: usize) -> Self {
        self.max_message_chars = max;
        self
    }

    /// Answer `message` about fishing in `region` in plain text.
    ///
    /// # Errors
    /// `InvalidInput` for an empty message, or a message or region over the
    /// limit. `Provider` when the generator fails.
    #[instrument(skip(self, message), level = "info")]
    pub async fn chat(&self, message: &str, region: &str) -> Result<String, AnalysisError> {
        if message.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("message is required".into()));
        }
        if message.chars().count() > self.max_message_chars {
            return Err(AnalysisError::InvalidInput(format!(
                "message exceeds {} characters",
                self.max_message_chars
            )));
        }
        if region.chars().count() > self.max_message_chars {
            return Err(AnalysisError::InvalidInput(format!(
                "region exceeds {} characters",
                self.max_message_chars
            )));
        }

        let region = match region.trim() {
            "" => "an unspecified region",
            r => r,
        };

        let reply = self
            .generator
            .complete(
                &prompts::expert_chat_system(region),
                message,
                Some(prompts::CHAT_TEMPERATURE),
            )
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::testing::ScriptedGenerator;

    #[tokio::test]
    async fn test_chat_passes_message_verbatim() {
        let generator = Arc::new(ScriptedGenerator::replying(
            " Yes, you need a license for anglers 16 and older. ",
        ));
        let chat = ExpertChat::new(generator.clone());

        let reply = chat.chat("Do I need a license?", "Ontario, Canada").await.unwrap();

        assert_eq!(reply, "Yes, you need a license for anglers 16 and older.");
        let (system, user) = generator.last_prompt().unwrap();
        assert!(system.contains("fishing in: Ontario, Canada"));
        assert_eq!(user, "Do I need a license?");
        assert_eq!(generator.last_temperature(), Some(0.7));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let generator = Arc::new(ScriptedGenerator::replying("unused"));
        let chat = ExpertChat::new(generator.clone());

        let result = chat.chat("   ", "Ontario").await;

        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_message_rejected() {
        let chat = ExpertChat::new(Arc::new(ScriptedGenerator::replying("unused")))
            .with_max_message_chars(5);
        let result = chat.chat("Is catch and release required?", "Ontario").await;
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_oversized_region_rejected() {
        let generator = Arc::new(ScriptedGenerator::replying("unused"));
        let chat = ExpertChat::new(generator.clone()).with_max_message_chars(10);

        let result = chat.chat("Limits?", &"Ontario ".repeat(5)).await;

        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let chat = ExpertChat::new(Arc::new(ScriptedGenerator::failing()));
        let result = chat.chat("Limits?", "Ontario").await;
        assert!(matches!(result, Err(AnalysisError::Provider(_))));
    }
}
