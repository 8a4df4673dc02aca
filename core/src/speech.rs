use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

use crate::errors::{AgriError, AgriResult};

/// Plays text through a local text-to-speech command, one utterance at a time.
#[derive(Debug, Clone)]
pub struct Speaker {
    engine: String,
    speaking: Arc<AtomicBool>,
}

impl Speaker {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }

    /// Start speaking `text` in the background.
    ///
    /// Returns `false` without doing anything if an utterance is already
    /// playing; requests are dropped, not queued.
    pub fn speak(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        if self
            .speaking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Already speaking, dropping utterance");
            return false;
        }

        let engine = self.engine.clone();
        let text = text.to_string();
        let speaking = Arc::clone(&self.speaking);
        thread::spawn(move || {
            if let Err(e) = run_engine(&engine, &text) {
                warn!("{}", e);
            }
            speaking.store(false, Ordering::Release);
        });
        true
    }
}

fn run_engine(engine: &str, text: &str) -> AgriResult<()> {
    let status = Command::new(engine)
        .arg(text)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| AgriError::SpeechError(format!("Failed to run {}: {}", engine, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(AgriError::SpeechError(format!(
            "{} exited with {}",
            engine, status
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_until_idle(speaker: &Speaker) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while speaker.is_speaking() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_overlapping_utterance_is_dropped() {
        // `sleep 0.5` stands in for a half-second utterance
        let speaker = Speaker::new("sleep");
        assert!(speaker.speak("0.5"));
        assert!(speaker.is_speaking());
        assert!(!speaker.speak("0.5"));

        wait_until_idle(&speaker);
        assert!(!speaker.is_speaking());
        assert!(speaker.speak("0"));
        wait_until_idle(&speaker);
    }

    #[test]
    fn test_missing_engine_releases_flag() {
        let speaker = Speaker::new("agrigrok-no-such-tts-engine");
        assert!(speaker.speak("hello"));
        wait_until_idle(&speaker);
        assert!(!speaker.is_speaking());
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let speaker = Speaker::new("sleep");
        assert!(!speaker.speak("   "));
        assert!(!speaker.is_speaking());
    }
}
