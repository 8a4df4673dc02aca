use crate::errors::{AgriError, AgriResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_SUMMARY_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_HISTORY_TURNS: usize = 6;
pub const DEFAULT_GEO_URL: &str = "http://ip-api.com/json/";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_SERIAL_BAUD: u32 = 9600;

#[cfg(target_os = "macos")]
pub const DEFAULT_SPEECH_ENGINE: &str = "say";
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_SPEECH_ENGINE: &str = "espeak";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are AgriGrok, an expert agricultural AI assistant for farmers and farming robots. \
You specialize in: crop management, pest identification and control, irrigation systems, weather-based farming decisions, \
soil health, fertilization, harvest timing, sustainable farming practices, and equipment maintenance. \
Give practical, actionable advice in a friendly but professional manner. Keep responses clear, helpful, and focused on farming.";

/// One hosted text-generation endpoint
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl EndpointConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            url: other.url.clone().or_else(|| self.url.clone()),
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model: other.model.clone().or_else(|| self.model.clone()),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }
}

/// Endpoint settings with every default applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    pub geo_url: Option<String>,
    pub weather_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: Option<bool>,
    pub engine: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub enabled: Option<bool>,
    pub port: Option<String>,
    pub baud: Option<u32>,
    /// Hardware button name -> quick question id
    pub buttons: Option<HashMap<String, String>>,
}

/// Configuration for the assistant and its integrations
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AgriConfig {
    pub system_prompt: Option<String>,
    pub history_turns: Option<usize>,
    pub save_dir: Option<PathBuf>,
    pub enable_context: Option<bool>,
    pub log_level: Option<String>,
    pub chat: EndpointConfig,
    pub summary: EndpointConfig,
    pub context: ContextConfig,
    pub speech: SpeechConfig,
    pub serial: SerialConfig,
}

impl AgriConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> AgriResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AgriError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| AgriError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Reads the API keys from the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.chat.api_key = non_empty_var("AGRIGROK_API_KEY");
        config.summary.api_key = non_empty_var("AGRIGROK_SUMMARY_API_KEY");
        config
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            history_turns: other.history_turns.or(self.history_turns),
            save_dir: other.save_dir.clone().or_else(|| self.save_dir.clone()),
            enable_context: other.enable_context.or(self.enable_context),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            chat: self.chat.merge(&other.chat),
            summary: self.summary.merge(&other.summary),
            context: ContextConfig {
                geo_url: other
                    .context
                    .geo_url
                    .clone()
                    .or_else(|| self.context.geo_url.clone()),
                weather_url: other
                    .context
                    .weather_url
                    .clone()
                    .or_else(|| self.context.weather_url.clone()),
            },
            speech: SpeechConfig {
                enabled: other.speech.enabled.or(self.speech.enabled),
                engine: other
                    .speech
                    .engine
                    .clone()
                    .or_else(|| self.speech.engine.clone()),
            },
            serial: SerialConfig {
                enabled: other.serial.enabled.or(self.serial.enabled),
                port: other.serial.port.clone().or_else(|| self.serial.port.clone()),
                baud: other.serial.baud.or(self.serial.baud),
                buttons: other
                    .serial
                    .buttons
                    .clone()
                    .or_else(|| self.serial.buttons.clone()),
            },
        }
    }

    /// The primary chat endpoint. Fails without an API key.
    pub fn chat_endpoint(&self) -> AgriResult<ResolvedEndpoint> {
        let api_key = self
            .chat
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AgriError::ConfigError(
                    "API key is required (set AGRIGROK_API_KEY or chat.api_key)".to_string(),
                )
            })?;

        Ok(ResolvedEndpoint {
            url: self
                .chat
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            api_key,
            model: self
                .chat
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            timeout: Duration::from_secs(
                self.chat.timeout_secs.unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS),
            ),
        })
    }

    /// The summarization endpoint. URL and key fall back to the chat endpoint's.
    pub fn summary_endpoint(&self) -> AgriResult<ResolvedEndpoint> {
        let chat = self.chat_endpoint()?;
        Ok(ResolvedEndpoint {
            url: self.summary.url.clone().unwrap_or(chat.url),
            api_key: self
                .summary
                .api_key
                .clone()
                .filter(|key| !key.is_empty())
                .unwrap_or(chat.api_key),
            model: self
                .summary
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            timeout: Duration::from_secs(
                self.summary
                    .timeout_secs
                    .unwrap_or(DEFAULT_SUMMARY_TIMEOUT_SECS),
            ),
        })
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns.unwrap_or(DEFAULT_HISTORY_TURNS)
    }

    pub fn save_dir(&self) -> PathBuf {
        self.save_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn context_enabled(&self) -> bool {
        self.enable_context.unwrap_or(true)
    }

    pub fn geo_url(&self) -> &str {
        self.context.geo_url.as_deref().unwrap_or(DEFAULT_GEO_URL)
    }

    pub fn weather_url(&self) -> &str {
        self.context
            .weather_url
            .as_deref()
            .unwrap_or(DEFAULT_WEATHER_URL)
    }

    pub fn speech_enabled(&self) -> bool {
        self.speech.enabled.unwrap_or(false)
    }

    pub fn speech_engine(&self) -> &str {
        self.speech.engine.as_deref().unwrap_or(DEFAULT_SPEECH_ENGINE)
    }

    pub fn serial_enabled(&self) -> bool {
        self.serial.enabled.unwrap_or(false)
    }

    pub fn serial_port(&self) -> &str {
        self.serial.port.as_deref().unwrap_or(DEFAULT_SERIAL_PORT)
    }

    pub fn serial_baud(&self) -> u32 {
        self.serial.baud.unwrap_or(DEFAULT_SERIAL_BAUD)
    }

    /// Quick question id bound to a hardware button, defaulting to the button name itself
    pub fn button_target<'a>(&'a self, button: &'a str) -> &'a str {
        self.serial
            .buttons
            .as_ref()
            .and_then(|map| {
                map.iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(button))
                    .map(|(_, id)| id.as_str())
            })
            .unwrap_or(button)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> AgriResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        AgriError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> AgriResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
