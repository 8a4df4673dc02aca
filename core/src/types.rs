use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Only used on outgoing requests, never stored in the conversation log
    System,
    User,
    Assistant,
}

/// One message in a chat exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    /// Parameters for the full farming answer
    pub const ANSWER: Self = Self {
        temperature: 0.7,
        top_p: 0.9,
        max_tokens: 600,
    };

    /// Parameters for the one-sentence summary
    pub const SUMMARY: Self = Self {
        temperature: 0.3,
        top_p: 0.9,
        max_tokens: 25,
    };
}

/// A completion request independent of the wire format
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ConversationTurn>,
    pub params: GenerationParams,
}

/// Answer pair handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub full_response: String,
    pub summary: String,
    pub from_cache: bool,
}

/// Request body for an OpenAI-compatible chat completion endpoint
#[derive(Serialize, Debug)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ConversationTurn],
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub stream: bool,
}

/// Response body from a chat completion endpoint
#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Error body returned by OpenAI-compatible endpoints
#[derive(Deserialize, Debug)]
pub(crate) struct ChatErrorResponse {
    pub error: ChatErrorDetail,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
