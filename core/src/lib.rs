// Core AgriGrok functionality:
// - Chat completion clients and the answer cache
// - Question orchestration and background dispatch
// - Field context, quick questions, session files
// - Serial display bridge and speech playback

pub mod assistant;
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod conversation;
pub mod dispatch;
pub mod errors;
pub mod quick;
pub mod serial;
pub mod session;
pub mod speech;
pub mod types;

pub use assistant::Assistant;
pub use cache::{CachedAnswer, ResponseCache};
pub use client::{ChatCompletionClient, LanguageModel};
pub use config::AgriConfig;
pub use context::{ContextClient, FieldContext, LocationContext, WeatherContext};
pub use conversation::Conversation;
pub use dispatch::{Dispatcher, Reply};
pub use errors::{AgriError, AgriResult};
pub use types::*;
