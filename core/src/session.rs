use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::context::{LocationContext, WeatherContext};
use crate::errors::{AgriError, AgriResult};
use crate::types::ConversationTurn;

/// Everything written when the user saves the chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub saved_at: DateTime<Local>,
    pub conversation: Vec<ConversationTurn>,
    pub location: Option<LocationContext>,
    pub weather: Option<WeatherContext>,
    pub speech_enabled: bool,
    pub serial_connected: bool,
}

/// `agrigrok_conversation_<YYYYmmdd_HHMMSS>.json`
pub fn session_file_name(at: &DateTime<Local>) -> String {
    format!("agrigrok_conversation_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write the snapshot into `dir` and return the file path
pub fn save_session(dir: &Path, snapshot: &SessionSnapshot) -> AgriResult<PathBuf> {
    if snapshot.conversation.is_empty() {
        return Err(AgriError::NothingToSave);
    }

    fs::create_dir_all(dir)?;
    let path = dir.join(session_file_name(&snapshot.saved_at));
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(&path, json)?;
    info!("Saved conversation to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(conversation: Vec<ConversationTurn>) -> SessionSnapshot {
        SessionSnapshot {
            saved_at: Local.with_ymd_and_hms(2025, 4, 2, 9, 5, 7).unwrap(),
            conversation,
            location: None,
            weather: None,
            speech_enabled: true,
            serial_connected: false,
        }
    }

    #[test]
    fn test_file_name_uses_timestamp() {
        let at = Local.with_ymd_and_hms(2025, 4, 2, 9, 5, 7).unwrap();
        assert_eq!(
            session_file_name(&at),
            "agrigrok_conversation_20250402_090507.json"
        );
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let turns = vec![
            ConversationTurn::user("When to lime the field?"),
            ConversationTurn::assistant("In autumn."),
        ];
        let path = save_session(dir.path(), &snapshot(turns)).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["conversation"][0]["role"], "user");
        assert_eq!(written["conversation"][1]["content"], "In autumn.");
        assert_eq!(written["speech_enabled"], true);
        assert!(written["location"].is_null());
    }

    #[test]
    fn test_empty_conversation_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_session(dir.path(), &snapshot(Vec::new())).unwrap_err();
        assert!(matches!(err, AgriError::NothingToSave));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
