use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use tracing::{debug, info};

use crate::app::error::{PipelineError, Result};
use crate::app::models::DataAnalysisResponse;
use crate::app::prompts::{ChatMessage, ChatRole};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Thin wrapper around one hosted chat model. No retry, no streaming, no
/// rate-limit handling: transport and quota errors propagate to the caller.
pub struct LlmGateway {
    client: Client<OpenAIConfig>,
    model: String,
}

impl LlmGateway {
    pub fn new(api_key: &str, model: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    /// Send a message sequence and return the first choice's raw text.
    pub async fn send(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(convert_messages(messages)?)
            .temperature(0.0)
            .build()
            .map_err(|e| PipelineError::Gateway(e.to_string()))?;

        debug!("sending {} messages to {}", messages.len(), self.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PipelineError::Gateway(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PipelineError::Gateway("model returned no choices".to_string()))?;
        info!("received response from language model");
        Ok(content)
    }

    /// Send and validate the reply against the fixed `DataAnalysisResponse`
    /// shape. A parse failure surfaces as `MalformedResponse` carrying the
    /// raw text for debugging.
    pub async fn analyze(&self, messages: &[ChatMessage]) -> Result<DataAnalysisResponse> {
        let raw = self.send(messages).await?;
        parse_analysis(&raw)
    }
}

pub fn parse_analysis(raw: &str) -> Result<DataAnalysisResponse> {
    let cleaned = strip_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| PipelineError::MalformedResponse {
        message: e.to_string(),
        raw: raw.to_string(),
    })
}

// Models wrap JSON in markdown fences despite instructions; tolerate that.
fn strip_fences(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn convert_messages(
    messages: &[ChatMessage],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages
        .iter()
        .map(|msg| {
            let converted: ChatCompletionRequestMessage = match msg.role {
                ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(|e| PipelineError::Gateway(e.to_string()))?
                    .into(),
                ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(|e| PipelineError::Gateway(e.to_string()))?
                    .into(),
            };
            Ok(converted)
        })
        .collect()
}
