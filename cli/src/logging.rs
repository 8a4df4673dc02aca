use colored::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(configured_level: Option<&str>) {
    let level = configured_level
        .map(str::to_lowercase)
        .filter(|level| matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error"))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("agrigrok={level},agrigrok_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn log_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
