use agrigrok_core::config::get_default_config_file;
use agrigrok_core::speech::Speaker;
use agrigrok_core::{AgriConfig, Assistant, ChatCompletionClient, ContextClient};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::Args;
use crate::logging::{init_logging, log_error};

const APP_NAME: &str = "agrigrok";

/// Load config layers: defaults < file < environment < flags
fn load_config(args: &Args) -> Result<AgriConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME)?,
    };
    let file_config = AgriConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(file_config
        .merge(&AgriConfig::from_env())
        .merge(&args.overrides()))
}

fn build_assistant(config: &AgriConfig) -> Result<Assistant> {
    let chat = config.chat_endpoint()?;
    let summary = config.summary_endpoint()?;
    info!("Chat model {} at {}", chat.model, chat.url);
    debug!("Summary model {} at {}", summary.model, summary.url);

    Ok(Assistant::new(
        Arc::new(ChatCompletionClient::new(&chat)?),
        Arc::new(ChatCompletionClient::new(&summary)?),
        config.system_prompt(),
        config.history_turns(),
    ))
}

fn context_client(config: &AgriConfig) -> Option<ContextClient> {
    if !config.context_enabled() {
        return None;
    }
    match ContextClient::new(config.geo_url(), config.weather_url()) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Location lookup disabled: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(&args)?;
    init_logging(config.log_level.as_deref());

    let assistant = match build_assistant(&config) {
        Ok(assistant) => Arc::new(assistant),
        Err(e) => {
            log_error(&format!("{:#}", e));
            return Err(e);
        }
    };

    let question = match args.single_question() {
        Ok(question) => question,
        Err(e) => {
            log_error(&e.to_string());
            return Err(e);
        }
    };

    match question {
        Some(question) => {
            if let Some(client) = context_client(&config) {
                assistant.set_field_context(client.refresh().await);
            }
            let speaker = config
                .speech_enabled()
                .then(|| Speaker::new(config.speech_engine()));
            app::run_single_query(question, &assistant, speaker.as_ref()).await
        }
        None => {
            if let Some(client) = context_client(&config) {
                let assistant = Arc::clone(&assistant);
                tokio::spawn(async move {
                    assistant.set_field_context(client.refresh().await);
                });
            }
            app::run_interactive_chat(assistant, config).await
        }
    }
}
