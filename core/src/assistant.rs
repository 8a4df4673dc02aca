use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, error, info};

use crate::cache::ResponseCache;
use crate::client::LanguageModel;
use crate::context::FieldContext;
use crate::conversation::Conversation;
use crate::errors::{AgriError, AgriResult};
use crate::types::{Answer, CompletionRequest, ConversationTurn, GenerationParams};

const SUMMARY_INSTRUCTION: &str = "Summarize the following farming advice in a single sentence \
of no more than 10 words. Reply with the sentence only.";

/// Owns the cache, the conversation log and the field context, and runs
/// one question through the language models.
pub struct Assistant {
    chat_model: Arc<dyn LanguageModel>,
    summary_model: Arc<dyn LanguageModel>,
    system_prompt: String,
    history_turns: usize,
    cache: Mutex<ResponseCache>,
    conversation: Mutex<Conversation>,
    field_context: RwLock<FieldContext>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Assistant {
    pub fn new(
        chat_model: Arc<dyn LanguageModel>,
        summary_model: Arc<dyn LanguageModel>,
        system_prompt: impl Into<String>,
        history_turns: usize,
    ) -> Self {
        Self {
            chat_model,
            summary_model,
            system_prompt: system_prompt.into(),
            history_turns,
            cache: Mutex::new(ResponseCache::new()),
            conversation: Mutex::new(Conversation::new()),
            field_context: RwLock::new(FieldContext::default()),
        }
    }

    /// Answer a question from the cache or the models.
    pub async fn ask(&self, question: &str) -> AgriResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgriError::EmptyQuestion);
        }

        let cached = lock(&self.cache).lookup(question);
        if let Some(hit) = cached {
            info!("Cache hit for question");
            return Ok(Answer {
                full_response: hit.full_response,
                summary: hit.summary,
                from_cache: true,
            });
        }

        let request = self.build_request(question);
        let full_response = self.chat_model.complete(request).await.map_err(|e| {
            error!("{} request failed: {}", self.chat_model.model_name(), e);
            e
        })?;

        let summary = self.summarize(&full_response).await.map_err(|e| {
            error!("{} summary failed: {}", self.summary_model.model_name(), e);
            e
        })?;

        lock(&self.cache).store(question, &full_response, &summary);
        lock(&self.conversation).push_exchange(question, &full_response);

        Ok(Answer {
            full_response,
            summary,
            from_cache: false,
        })
    }

    fn build_request(&self, question: &str) -> CompletionRequest {
        let mut system = self.system_prompt.clone();
        if let Some(enrichment) = self.field_context().enrichment() {
            system.push_str("\n\n");
            system.push_str(&enrichment);
        }

        let mut messages = vec![ConversationTurn::system(system)];
        messages.extend_from_slice(lock(&self.conversation).recent(self.history_turns));
        messages.push(ConversationTurn::user(question));
        debug!("Built request with {} messages", messages.len());

        CompletionRequest {
            messages,
            params: GenerationParams::ANSWER,
        }
    }

    async fn summarize(&self, full_response: &str) -> AgriResult<String> {
        let request = CompletionRequest {
            messages: vec![
                ConversationTurn::system(SUMMARY_INSTRUCTION),
                ConversationTurn::user(full_response),
            ],
            params: GenerationParams::SUMMARY,
        };
        self.summary_model.complete(request).await
    }

    /// Forget the conversation. The cache is kept.
    pub fn clear_conversation(&self) {
        lock(&self.conversation).clear();
    }

    pub fn conversation(&self) -> Conversation {
        lock(&self.conversation).clone()
    }

    pub fn cached_entries(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn field_context(&self) -> FieldContext {
        self.field_context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_field_context(&self, context: FieldContext) {
        *self
            .field_context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = context;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::context::LocationContext;
    use crate::types::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed text and records every request
    pub(crate) struct FakeModel {
        name: &'static str,
        reply: Option<String>,
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeModel {
        pub(crate) fn replying(name: &'static str, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, request: CompletionRequest) -> AgriResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(AgriError::HttpError {
                    status_code: 503,
                    message: "unavailable".to_string(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            self.name
        }
    }

    fn assistant(chat: Arc<FakeModel>, summary: Arc<FakeModel>) -> Assistant {
        Assistant::new(chat, summary, "You are a farming assistant.", 6)
    }

    #[tokio::test]
    async fn test_miss_calls_both_models_then_hit_calls_none() {
        let chat = FakeModel::replying("chat", "Plant peas and lettuce.");
        let summary = FakeModel::replying("summary", "Plant peas now.");
        let assistant = assistant(chat.clone(), summary.clone());

        let first = assistant.ask("What crops for spring?").await.unwrap();
        assert_eq!(first.full_response, "Plant peas and lettuce.");
        assert_eq!(first.summary, "Plant peas now.");
        assert!(!first.from_cache);

        let second = assistant.ask("  what crops for SPRING?").await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.summary, "Plant peas now.");

        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(assistant.conversation().len(), 2);
        assert_eq!(assistant.cached_entries(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_last_three_exchanges() {
        let chat = FakeModel::replying("chat", "answer");
        let summary = FakeModel::replying("summary", "short");
        let assistant = assistant(chat.clone(), summary.clone());

        for i in 0..5 {
            assistant.ask(&format!("question {}", i)).await.unwrap();
        }

        let requests = chat.requests.lock().unwrap();
        let last = requests.last().unwrap();
        // system + 6 history turns + new question
        assert_eq!(last.messages.len(), 8);
        assert_eq!(last.messages[0].role, Role::System);
        assert_eq!(last.messages[1], ConversationTurn::user("question 1"));
        assert_eq!(last.messages[7], ConversationTurn::user("question 4"));
        assert_eq!(last.params, GenerationParams::ANSWER);
    }

    #[tokio::test]
    async fn test_summary_request_uses_full_answer() {
        let chat = FakeModel::replying("chat", "Water deeply twice a week.");
        let summary = FakeModel::replying("summary", "Water twice weekly.");
        let assistant = assistant(chat, summary.clone());

        assistant.ask("irrigation?").await.unwrap();

        let requests = summary.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].messages[1],
            ConversationTurn::user("Water deeply twice a week.")
        );
        assert_eq!(requests[0].params.max_tokens, 25);
    }

    #[tokio::test]
    async fn test_failure_leaves_state_untouched() {
        let chat = FakeModel::replying("chat", "answer");
        let summary = FakeModel::failing("summary");
        let assistant = assistant(chat, summary);

        let err = assistant.ask("soil ph?").await.unwrap_err();
        assert!(err.user_message().contains("503"));
        assert!(assistant.conversation().is_empty());
        assert_eq!(assistant.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_field_context_enriches_system_prompt() {
        let chat = FakeModel::replying("chat", "answer");
        let summary = FakeModel::replying("summary", "short");
        let assistant = assistant(chat.clone(), summary);

        assistant.ask("first").await.unwrap();
        assistant.set_field_context(FieldContext {
            location: Some(LocationContext {
                city: "Ghent".to_string(),
                country: "Belgium".to_string(),
                latitude: 51.05,
                longitude: 3.72,
            }),
            weather: None,
        });
        assistant.ask("second").await.unwrap();

        let requests = chat.requests.lock().unwrap();
        assert!(!requests[0].messages[0].content.contains("Ghent"));
        assert!(requests[1].messages[0].content.contains("Ghent, Belgium"));
    }

    #[tokio::test]
    async fn test_blank_question_is_refused() {
        let chat = FakeModel::replying("chat", "answer");
        let summary = FakeModel::replying("summary", "short");
        let assistant = assistant(chat.clone(), summary.clone());

        let err = assistant.ask(" \n\t ").await.unwrap_err();
        assert!(matches!(err, AgriError::EmptyQuestion));
        assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
        assert_eq!(summary.calls.load(Ordering::SeqCst), 0);
        assert!(assistant.conversation().is_empty());
        assert_eq!(assistant.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_clear_keeps_cache() {
        let chat = FakeModel::replying("chat", "answer");
        let summary = FakeModel::replying("summary", "short");
        let assistant = assistant(chat.clone(), summary);

        assistant.ask("compost ratio?").await.unwrap();
        assistant.clear_conversation();
        assert!(assistant.conversation().is_empty());

        let again = assistant.ask("compost ratio?").await.unwrap();
        assert!(again.from_cache);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
    }
}
