use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ResolvedEndpoint;
use crate::errors::{AgriError, AgriResult};
use crate::types::*;

/// A hosted text-generation endpoint
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate the assistant message for a role-tagged message list
    async fn complete(&self, request: CompletionRequest) -> AgriResult<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

/// Client for an OpenAI-compatible chat completion endpoint with bearer auth
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http_client: Client,
    url: String,
    model_name: String,
}

impl ChatCompletionClient {
    /// Create a new client for the given endpoint
    pub fn new(endpoint: &ResolvedEndpoint) -> AgriResult<Self> {
        if endpoint.api_key.is_empty() {
            return Err(AgriError::ConfigError(
                "API key cannot be empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", endpoint.api_key))
                .map_err(|e| AgriError::ConfigError(format!("Invalid API key format: {}", e)))?,
        );

        let http_client = Client::builder()
            .timeout(endpoint.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AgriError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: endpoint.url.clone(),
            model_name: endpoint.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> AgriResult<String> {
        debug!(
            "Calling {} with {} messages (max_tokens={})",
            self.model_name,
            request.messages.len(),
            request.params.max_tokens
        );

        let body = ChatCompletionRequest {
            model: &self.model_name,
            messages: &request.messages,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            top_p: request.params.top_p,
            stream: false,
        };

        let response = self.http_client.post(&self.url).json(&body).send().await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("Response status: {}", status);

        if !status.is_success() {
            let message = match serde_json::from_str::<ChatErrorResponse>(&response_text) {
                Ok(error_response) => match error_response.error.error_type {
                    Some(kind) => format!("{} ({})", error_response.error.message, kind),
                    None => error_response.error.message,
                },
                Err(_) => response_text,
            };
            return Err(AgriError::HttpError {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| AgriError::ParsingError(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgriError::ParsingError("No choices in response".to_string()))?;

        if let Some(reason) = choice.finish_reason.as_deref() {
            if reason != "stop" {
                warn!("{} finish reason: {}", self.model_name, reason);
            }
        }

        choice
            .message
            .content
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AgriError::ParsingError("No content in choice".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
