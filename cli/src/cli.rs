use agrigrok_core::AgriConfig;
use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

/// AgriGrok smart farming assistant
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Ask a single question and exit
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode (the default without a prompt)
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Path to the config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API key for the chat endpoint
    #[arg(short = 'k', long, env = "AGRIGROK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Read summaries aloud
    #[arg(long, default_value_t = false)]
    pub speak: bool,

    /// Serial port of the display device; enables the serial bridge
    #[arg(long)]
    pub serial_port: Option<String>,

    /// Baud rate of the display device
    #[arg(long)]
    pub baud: Option<u32>,

    /// Skip location and weather lookup
    #[arg(long, default_value_t = false)]
    pub no_context: bool,

    /// Directory for saved conversations
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// The question to answer in one-shot mode, trimmed. `None` means
    /// interactive mode; a blank prompt is refused.
    pub fn single_question(&self) -> Result<Option<&str>> {
        if self.interactive {
            return Ok(None);
        }
        match self.prompt.as_deref().map(str::trim) {
            None => Ok(None),
            Some("") => bail!("Please type a farming question first."),
            Some(question) => Ok(Some(question)),
        }
    }

    /// Flags as a config layer; unset flags stay `None`
    pub fn overrides(&self) -> AgriConfig {
        let mut config = AgriConfig::default();
        config.chat.api_key = self.api_key.clone();
        config.chat.model = self.model.clone();
        config.save_dir = self.save_dir.clone();
        if self.speak {
            config.speech.enabled = Some(true);
        }
        if self.no_context {
            config.enable_context = Some(false);
        }
        if let Some(port) = &self.serial_port {
            config.serial.enabled = Some(true);
            config.serial.port = Some(port.clone());
        }
        config.serial.baud = self.baud;
        if self.verbose {
            config.log_level = Some("debug".to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_flags_override_nothing() {
        let args = Args::parse_from(["agrigrok"]);
        let mut overrides = args.overrides();
        // the key may come from the environment
        overrides.chat.api_key = None;
        assert_eq!(overrides, AgriConfig::default());
    }

    #[test]
    fn test_flags_become_overrides() {
        let args = Args::parse_from([
            "agrigrok",
            "--speak",
            "--serial-port",
            "/dev/ttyACM1",
            "--no-context",
            "-m",
            "llama-3.3-70b",
            "Is it too late to plant beans?",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.speech.enabled, Some(true));
        assert_eq!(overrides.serial.enabled, Some(true));
        assert_eq!(overrides.serial.port.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(overrides.enable_context, Some(false));
        assert_eq!(overrides.chat.model.as_deref(), Some("llama-3.3-70b"));
        assert_eq!(args.prompt.as_deref(), Some("Is it too late to plant beans?"));
    }

    #[test]
    fn test_single_question_is_trimmed() {
        let args = Args::parse_from(["agrigrok", "  When to harvest garlic?  "]);
        assert_eq!(
            args.single_question().unwrap(),
            Some("When to harvest garlic?")
        );
    }

    #[test]
    fn test_blank_prompt_is_refused() {
        let args = Args::parse_from(["agrigrok", "   "]);
        assert!(args.single_question().is_err());
    }

    #[test]
    fn test_interactive_ignores_prompt() {
        assert_eq!(Args::parse_from(["agrigrok"]).single_question().unwrap(), None);
        let args = Args::parse_from(["agrigrok", "-i", "   "]);
        assert_eq!(args.single_question().unwrap(), None);
    }
}
