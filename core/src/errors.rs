use thiserror::Error;

/// Errors raised by the assistant and its integrations
#[derive(Error, Debug)]
pub enum AgriError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection Error: {0}")]
    Connection(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Serial Error: {0}")]
    SerialError(String),

    #[error("Speech Error: {0}")]
    SpeechError(String),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("No conversation to save yet")]
    NothingToSave,

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for AgriError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgriError::Timeout
        } else if err.is_decode() {
            AgriError::ParsingError(err.to_string())
        } else if let Some(status) = err.status() {
            AgriError::HttpError {
                status_code: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            AgriError::Connection(err.to_string())
        }
    }
}

impl AgriError {
    /// The single line shown in the transcript when a request fails.
    pub fn user_message(&self) -> String {
        match self {
            AgriError::Timeout => {
                "⏰ Request timed out. Please check your internet connection and try again."
                    .to_string()
            }
            AgriError::Connection(_) => {
                "🌐 Connection error. Please check your internet connection.".to_string()
            }
            AgriError::HttpError {
                status_code,
                message,
            } => format!(
                "⚠️ API Error {}: {}\n\nPlease check your API key or try again later.",
                status_code, message
            ),
            AgriError::ParsingError(_) | AgriError::SerdeError(_) => {
                "📊 Invalid response format from API. Please try again.".to_string()
            }
            AgriError::EmptyQuestion => "🌾 Please type a farming question first.".to_string(),
            AgriError::NothingToSave => "No conversation to save yet!".to_string(),
            AgriError::IoError(e) => format!("❌ Failed to save: {}", e),
            other => format!("❌ Unexpected error: {}", other),
        }
    }
}

/// Result type for assistant operations
pub type AgriResult<T> = Result<T, AgriError>;
