//! Chat orchestration: answer a physics question and record the exchange.
//!
//! One request runs through these stages in order:
//! 1. primary completion, retried on rate limits (failure is fatal)
//! 2. follow-up questions, best effort
//! 3. session, user message, agent message and optional analysis result,
//!    each written through [`ResilientPersistence`] and then published
//!
//! Once the primary completion succeeds the request always gets a response.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use quanta_core::{
    is_placeholder_id, parse_follow_ups, Answer, ChatRequest, Message, NewMessage, NewResult,
    NewSession, ResearchResult, ResultKind, Session,
};

use crate::config::RuntimeConfig;
use crate::events::{EventHub, SessionEvent};
use crate::prompts;
use crate::providers::{LlmProvider, ProviderError};
use crate::resilience::{Persisted, ResilientPersistence};
use crate::store::ResearchStore;

/// Characters of the question kept as the title of a new session.
const TITLE_LENGTH: usize = 50;

/// Title given to the analysis result of an answer.
pub const ANALYSIS_TITLE: &str = "Physics Analysis";

/// Errors from the chat orchestrator.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Completion failed: {0}")]
    Provider(#[from] ProviderError),
}

impl ChatError {
    /// Rate-limit failure that survived every retry.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ChatError::Provider(e) if e.is_rate_limit())
    }

    /// No provider is configured at all.
    pub fn is_unconfigured(&self) -> bool {
        matches!(
            self,
            ChatError::NotConfigured(_) | ChatError::Provider(ProviderError::NotConfigured(_))
        )
    }

    /// Missing or rejected provider configuration.
    pub fn is_configuration(&self) -> bool {
        match self {
            ChatError::NotConfigured(_) => true,
            ChatError::Provider(e) => e.is_configuration(),
        }
    }

    /// Wait hinted by the provider, if it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ChatError::Provider(e) => e.retry_after(),
            ChatError::NotConfigured(_) => None,
        }
    }
}

/// Everything a chat turn produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub equations: Vec<String>,
    pub concepts: Vec<String>,
    pub follow_up_questions: Vec<String>,
    pub user_message: Message,
    pub agent_message: Message,
    pub results: Option<ResearchResult>,

    /// At least one write fell back to a placeholder
    pub degraded: bool,
}

/// Answers chat requests and records them.
pub struct ChatOrchestrator {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn ResearchStore>,
    hub: Arc<EventHub>,
    persistence: ResilientPersistence,
    config: RuntimeConfig,
}

impl ChatOrchestrator {
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run one chat turn.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let question = request.message();

        let completion = self
            .config
            .retry
            .execute("completion", || {
                self.provider
                    .complete(prompts::answer_messages(question), &self.config.completion)
            })
            .await?;
        let answer = Answer::from_completion(completion.content);

        let follow_ups = self.follow_ups(question, &answer.response).await;

        let mut degraded = false;

        let session = self.persist_session(request).await;
        degraded |= session.is_fallback();
        let session = session.into_inner();

        let user_message = self
            .persist_message(NewMessage::user(&session.id, question))
            .await;
        degraded |= user_message.is_fallback();

        let agent_message = self
            .persist_message(NewMessage::agent(&session.id, &answer.response))
            .await;
        degraded |= agent_message.is_fallback();

        let result = if answer.has_findings() || !follow_ups.is_empty() {
            let result = self.persist_result(&session.id, &answer, &follow_ups).await;
            degraded |= result.is_fallback();
            Some(result.into_inner())
        } else {
            None
        };

        tracing::info!(
            session_id = %session.id,
            equations = answer.equations.len(),
            concepts = answer.concepts.len(),
            follow_ups = follow_ups.len(),
            degraded,
            "chat turn complete"
        );

        Ok(ChatResponse {
            response: answer.response,
            session_id: session.id,
            equations: answer.equations,
            concepts: answer.concepts,
            follow_up_questions: follow_ups,
            user_message: user_message.into_inner(),
            agent_message: agent_message.into_inner(),
            results: result,
            degraded,
        })
    }

    /// Suggested next questions. Any failure yields none.
    async fn follow_ups(&self, question: &str, answer: &str) -> Vec<String> {
        let settings = &self.config.follow_ups;
        if !settings.enabled || settings.count == 0 {
            return Vec::new();
        }

        let outcome = self
            .config
            .retry
            .execute("follow_ups", || {
                self.provider.complete(
                    prompts::follow_up_messages(question, answer, settings.count),
                    &self.config.completion,
                )
            })
            .await;

        match outcome {
            Ok(completion) => parse_follow_ups(&completion.content, settings.count),
            Err(e) => {
                tracing::warn!(error = %e, "follow-up generation failed");
                Vec::new()
            }
        }
    }

    /// A supplied durable id is upserted. A supplied placeholder id is never
    /// written to the store: a fresh durable session replaces it, and only a
    /// fallback keeps it.
    async fn persist_session(&self, request: &ChatRequest) -> Persisted<Session> {
        let draft = NewSession::titled(session_title(request.message()));
        let fallback = match request.session_id() {
            Some(id) => draft.clone().with_id(id),
            None => draft.clone(),
        };

        let write = match request.session_id() {
            Some(id) if is_placeholder_id(id) => {
                tracing::info!(
                    session_id = id,
                    "placeholder session id supplied, starting a durable session"
                );
                self.store.create_session(draft)
            }
            Some(id) => self.store.ensure_session(draft.with_id(id)),
            None => self.store.create_session(draft),
        };

        self.persistence
            .write("session", write, move || Session::placeholder(fallback))
            .await
    }

    async fn persist_message(&self, draft: NewMessage) -> Persisted<Message> {
        let fallback = draft.clone();
        let persisted = self
            .persistence
            .write("message", self.store.create_message(draft), move || {
                Message::placeholder(fallback)
            })
            .await;
        self.hub.publish(
            &persisted.value.session_id,
            SessionEvent::MessageCreated {
                message: persisted.value.clone(),
            },
        );
        persisted
    }

    async fn persist_result(
        &self,
        session_id: &str,
        answer: &Answer,
        follow_ups: &[String],
    ) -> Persisted<ResearchResult> {
        let mut metadata = Map::new();
        metadata.insert("equations".into(), string_array(&answer.equations));
        metadata.insert("concepts".into(), string_array(&answer.concepts));
        metadata.insert("followUpQuestions".into(), string_array(follow_ups));

        let draft = NewResult {
            session_id: session_id.to_string(),
            kind: ResultKind::Analysis,
            title: ANALYSIS_TITLE.to_string(),
            content: answer.summary().to_string(),
            metadata,
        };
        let fallback = draft.clone();
        let persisted = self
            .persistence
            .write("result", self.store.create_result(draft), move || {
                ResearchResult::placeholder(fallback)
            })
            .await;
        self.hub.publish(
            &persisted.value.session_id,
            SessionEvent::ResultCreated {
                result: persisted.value.clone(),
            },
        );
        persisted
    }
}

/// First characters of the question, marked when cut short.
fn session_title(question: &str) -> String {
    let question = question.trim();
    let mut chars = question.chars();
    let head: String = chars.by_ref().take(TITLE_LENGTH).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

/// Builder for ChatOrchestrator.
pub struct ChatOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    store: Option<Arc<dyn ResearchStore>>,
    hub: Option<Arc<EventHub>>,
    persistence: ResilientPersistence,
    config: RuntimeConfig,
}

impl ChatOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            store: None,
            hub: None,
            persistence: ResilientPersistence::new(),
            config: RuntimeConfig::default(),
        }
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the store. Without one, every write falls back to a placeholder.
    pub fn store(mut self, store: Arc<dyn ResearchStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share an event hub with other publishers.
    pub fn hub(mut self, hub: Arc<EventHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Share the degraded-write counter with other writers.
    pub fn persistence(mut self, persistence: ResilientPersistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ChatOrchestrator, ChatError> {
        let provider = self
            .provider
            .ok_or_else(|| ChatError::NotConfigured("No provider set".to_string()))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(crate::store::UnavailableStore::default()));

        Ok(ChatOrchestrator {
            provider,
            store,
            hub: self.hub.unwrap_or_default(),
            persistence: self.persistence,
            config: self.config,
        })
    }
}

impl Default for ChatOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse};
    use crate::resilience::RetryPolicy;
    use crate::store::{MemoryStore, UnavailableStore};
    use async_trait::async_trait;
    use quanta_core::{placeholder_id, MessageRole, PageRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ANSWER: &str = "**Analysis**: A net force accelerates a mass.\n\n\
**Solution**: Newton's second law gives F = ma.\n\n\
**Explanation**: Momentum changes at the rate of the applied force.\n\n\
**Concepts**:\n- Newton's laws\n- Momentum";

    const FOLLOW_UPS: &str = "- What about friction?\n- How does mass affect it?\n- What is impulse?\n- Extra one";

    /// Answers the primary call with `answer` and follow-up calls with `follow_ups`.
    struct ScriptedProvider {
        answer: String,
        follow_ups: Result<String, ()>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(answer: &str, follow_ups: Result<&str, ()>) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                follow_ups: follow_ups.map(str::to_string),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if messages[0].content == prompts::FOLLOW_UP_SYSTEM_PROMPT {
                match &self.follow_ups {
                    Ok(text) => Ok(CompletionResponse::text(text.clone(), "scripted")),
                    Err(()) => Err(ProviderError::HttpError("connection reset".into())),
                }
            } else {
                Ok(CompletionResponse::text(self.answer.clone(), "scripted"))
            }
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Always rate limited.
    struct ThrottledProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ThrottledProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "throttled"
        }
    }

    fn fast_config() -> RuntimeConfig {
        RuntimeConfig {
            retry: RetryPolicy {
                max_retries: 2,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(40),
                backoff_multiplier: 2.0,
                jitter: false,
            },
            ..RuntimeConfig::default()
        }
    }

    fn orchestrator(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn ResearchStore>,
    ) -> ChatOrchestrator {
        ChatOrchestratorBuilder::new()
            .provider(provider)
            .store(store)
            .config(fast_config())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_provider() {
        let err = ChatOrchestratorBuilder::new().build().err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_session_title_truncation() {
        assert_eq!(session_title("What is entropy?"), "What is entropy?");
        let long = "x".repeat(60);
        let title = session_title(&long);
        assert_eq!(title, format!("{}...", "x".repeat(50)));
        assert_eq!(session_title(&"é".repeat(50)), "é".repeat(50));
    }

    #[tokio::test]
    async fn test_chat_persists_full_exchange() {
        let store = Arc::new(MemoryStore::new());
        let provider = ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS));
        let chat = orchestrator(provider.clone(), store.clone());

        let request = ChatRequest::new("Why does a force accelerate a mass?", None).unwrap();
        let response = chat.chat(&request).await.unwrap();

        assert!(!response.degraded);
        assert!(!is_placeholder_id(&response.session_id));
        assert_eq!(response.equations, vec!["F = ma".to_string()]);
        assert!(response.concepts.contains(&"Newton's laws".to_string()));
        assert_eq!(response.follow_up_questions.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        let result = response.results.unwrap();
        assert_eq!(result.title, ANALYSIS_TITLE);
        assert_eq!(result.kind, ResultKind::Analysis);
        assert!(result.content.starts_with("A net force"));
        assert_eq!(result.metadata["followUpQuestions"][0], "What about friction?");

        let detail = store.get_session(&response.session_id).await.unwrap();
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[0].role, MessageRole::User);
        assert_eq!(detail.messages[1].content, ANSWER);
        assert_eq!(detail.results.len(), 1);
    }

    #[tokio::test]
    async fn test_newtons_second_law_end_to_end() {
        let chat = orchestrator(
            ScriptedProvider::new("The net force is F = ma, so acceleration scales with force.", Err(())),
            Arc::new(MemoryStore::new()),
        );

        let request = ChatRequest::new("Explain Newton's second law", None).unwrap();
        let response = chat.chat(&request).await.unwrap();

        assert!(!response.session_id.is_empty());
        assert!(!is_placeholder_id(&response.session_id));
        assert_eq!(response.user_message.content, "Explain Newton's second law");
        assert!(response.agent_message.content.contains("F = ma"));
        assert!(response.equations.contains(&"F = ma".to_string()));
        assert_eq!(
            response.results.unwrap().content,
            "The net force is F = ma, so acceleration scales with force."
        );
    }

    #[tokio::test]
    async fn test_supplied_session_id_is_reused() {
        let store = Arc::new(MemoryStore::new());
        let chat = orchestrator(ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS)), store.clone());

        let request = ChatRequest::new("First", Some("lab-7".into())).unwrap();
        chat.chat(&request).await.unwrap();
        let request = ChatRequest::new("Second", Some("lab-7".into())).unwrap();
        let response = chat.chat(&request).await.unwrap();

        assert_eq!(response.session_id, "lab-7");
        let sessions = store.list_sessions(PageRequest::default()).await.unwrap();
        assert_eq!(sessions.total, 1);
        assert_eq!(sessions.items[0].counts.messages, 4);
        assert_eq!(sessions.items[0].session.title, "First");
    }

    #[tokio::test]
    async fn test_placeholder_session_id_is_not_stored() {
        let store = Arc::new(MemoryStore::new());
        let chat = orchestrator(ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS)), store.clone());
        let stale = placeholder_id("session");

        let request = ChatRequest::new("After the outage", Some(stale.clone())).unwrap();
        let response = chat.chat(&request).await.unwrap();

        assert!(!response.degraded);
        assert_ne!(response.session_id, stale);
        assert!(!is_placeholder_id(&response.session_id));
        assert!(store.get_session(&stale).await.is_err());
        assert_eq!(
            store.get_session(&response.session_id).await.unwrap().session.title,
            "After the outage"
        );
    }

    #[tokio::test]
    async fn test_placeholder_session_id_survives_outage() {
        let chat = ChatOrchestratorBuilder::new()
            .provider(ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS)))
            .store(Arc::new(UnavailableStore::default()))
            .config(fast_config())
            .build()
            .unwrap();
        let stale = placeholder_id("session");

        let request = ChatRequest::new("Still down?", Some(stale.clone())).unwrap();
        let response = chat.chat(&request).await.unwrap();

        assert!(response.degraded);
        assert_eq!(response.session_id, stale);
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_with_placeholders() {
        let persistence = ResilientPersistence::new();
        let chat = ChatOrchestratorBuilder::new()
            .provider(ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS)))
            .store(Arc::new(UnavailableStore::default()))
            .persistence(persistence.clone())
            .config(fast_config())
            .build()
            .unwrap();

        let request = ChatRequest::new("Why?", None).unwrap();
        let first = chat.chat(&request).await.unwrap();
        let second = chat.chat(&request).await.unwrap();

        assert!(first.degraded);
        assert!(is_placeholder_id(&first.session_id));
        assert!(is_placeholder_id(&first.user_message.id));
        assert!(is_placeholder_id(&first.results.as_ref().unwrap().id));
        assert_ne!(first.session_id, second.session_id);
        assert_ne!(first.agent_message.id, second.agent_message.id);
        assert_eq!(persistence.degraded_writes(), 8);
    }

    #[tokio::test]
    async fn test_unavailable_store_keeps_supplied_id() {
        let chat = orchestrator(
            ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS)),
            Arc::new(UnavailableStore::default()),
        );
        let request = ChatRequest::new("Why?", Some("kept".into())).unwrap();
        let response = chat.chat(&request).await.unwrap();
        assert_eq!(response.session_id, "kept");
        assert_eq!(response.user_message.session_id, "kept");
    }

    #[tokio::test]
    async fn test_no_result_without_findings() {
        let store = Arc::new(MemoryStore::new());
        let chat = orchestrator(ScriptedProvider::new("Hello there.", Err(())), store.clone());

        let response = chat
            .chat(&ChatRequest::new("Hi", None).unwrap())
            .await
            .unwrap();

        assert!(response.follow_up_questions.is_empty());
        assert!(response.results.is_none());
        assert!(!response.degraded);
        let detail = store.get_session(&response.session_id).await.unwrap();
        assert!(detail.results.is_empty());
    }

    #[tokio::test]
    async fn test_follow_ups_can_be_disabled() {
        let provider = ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS));
        let mut config = fast_config();
        config.follow_ups.enabled = false;
        let chat = ChatOrchestratorBuilder::new()
            .provider(provider.clone())
            .store(Arc::new(MemoryStore::new()))
            .config(config)
            .build()
            .unwrap();

        let response = chat
            .chat(&ChatRequest::new("Why?", None).unwrap())
            .await
            .unwrap();
        assert!(response.follow_up_questions.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_rate_limit_is_fatal() {
        let provider = Arc::new(ThrottledProvider {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::new());
        let chat = orchestrator(provider.clone(), store.clone());

        let err = chat
            .chat(&ChatRequest::new("Why?", None).unwrap())
            .await
            .unwrap_err();

        assert!(err.is_rate_limit());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        let sessions = store.list_sessions(PageRequest::default()).await.unwrap();
        assert_eq!(sessions.total, 0);
    }

    #[tokio::test]
    async fn test_messages_are_published() {
        let hub = Arc::new(EventHub::new());
        let chat = ChatOrchestratorBuilder::new()
            .provider(ScriptedProvider::new(ANSWER, Ok(FOLLOW_UPS)))
            .store(Arc::new(MemoryStore::new()))
            .hub(hub.clone())
            .config(fast_config())
            .build()
            .unwrap();

        let mut rx = hub.subscribe("live");
        chat.chat(&ChatRequest::new("Why?", Some("live".into())).unwrap())
            .await
            .unwrap();

        let kinds: Vec<&str> = (0..3)
            .map(|_| match rx.try_recv().unwrap() {
                SessionEvent::MessageCreated { message } if message.role == MessageRole::User => {
                    "user"
                }
                SessionEvent::MessageCreated { .. } => "agent",
                SessionEvent::ResultCreated { .. } => "result",
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(kinds, vec!["user", "agent", "result"]);
    }
}
