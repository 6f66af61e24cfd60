use crate::config::LlmConfig;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;

const SYSTEM_PROMPT: &str =
    "You write clear, well-structured lesson notes for secondary school students.";

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Invalid generation request: {0}")]
    Request(String),

    #[error("Generation provider error: {0}")]
    Provider(String),

    #[error("Generation provider returned no content")]
    EmptyResponse,
}

/// Text generation backend
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// Chat-completions client for any OpenAI-compatible endpoint, including the
/// Hugging Face inference router
pub struct OpenAiCompatibleGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleGenerator {
    pub fn from_config(config: &LlmConfig, api_key: &str) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(config.api_base()),
        );
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    #[allow(deprecated)]
    fn request(&self, prompt: &str) -> Result<CreateChatCompletionRequest, GenerationError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .messages([
                ChatCompletionRequestSystemMessage::from(SYSTEM_PROMPT).into(),
                ChatCompletionRequestUserMessage::from(prompt).into(),
            ])
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatibleGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = self.request(prompt)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_request_carries_sampling_settings() {
        let config = Config::default();
        let generator = OpenAiCompatibleGenerator::from_config(&config.llm, "test-token");
        let request = generator.request("Explain vectors").unwrap();

        assert_eq!(request.model, config.llm.model);
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(generator.model_name(), "mistralai/Mixtral-8x7B-Instruct-v0.1");
    }
}
