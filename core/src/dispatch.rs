use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::assistant::Assistant;
use crate::types::Answer;

/// Result of one dispatched question, posted back to the front end
#[derive(Debug, Clone)]
pub struct Reply {
    pub id: u64,
    pub question: String,
    /// The answer, or the user-facing error line
    pub outcome: Result<Answer, String>,
}

/// Runs each question on its own task and posts the reply on a channel
#[derive(Clone)]
pub struct Dispatcher {
    assistant: Arc<Assistant>,
    replies: UnboundedSender<Reply>,
    next_id: Arc<AtomicU64>,
}

impl Dispatcher {
    pub fn new(assistant: Arc<Assistant>) -> (Self, UnboundedReceiver<Reply>) {
        let (replies, rx) = mpsc::unbounded_channel();
        (
            Self {
                assistant,
                replies,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            rx,
        )
    }

    /// Start answering `question` in the background. Returns the request id.
    pub fn submit(&self, question: impl Into<String>) -> u64 {
        let question = question.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let assistant = Arc::clone(&self.assistant);
        let replies = self.replies.clone();

        debug!("Dispatching request #{}", id);
        tokio::spawn(async move {
            let outcome = assistant
                .ask(&question)
                .await
                .map_err(|e| e.user_message());
            if replies
                .send(Reply {
                    id,
                    question,
                    outcome,
                })
                .is_err()
            {
                warn!("Reply #{} dropped: front end is gone", id);
            }
        });
        id
    }

    pub fn assistant(&self) -> &Arc<Assistant> {
        &self.assistant
    }
}
