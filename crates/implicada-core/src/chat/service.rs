//! Chat orchestration.
//!
//! `ChatService` drives one turn through the full pipeline: resolve
//! session, shortcut check, retrieve context, fetch history, resolve
//! addressing mode, assemble prompt, generate, parse, guarantee
//! follow-ups, persist, back-fill the title.
//!
//! Generic over its five collaborators so tests can inject deterministic
//! fakes; concrete types are pinned in implicada-api.

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use implicada_types::chat::{Session, SessionOverview, Turn, TurnDraft};
use implicada_types::config::EngineConfig;
use implicada_types::error::{ChatError, RepositoryError};
use implicada_types::reply::{AddressingMode, StructuredReply};

use crate::addressing;
use crate::chat::repository::{SessionRepository, TurnRepository};
use crate::chat::shortcut;
use crate::chat::sort_chronological;
use crate::followup::{normalize_followups, FollowupGuarantor};
use crate::llm::provider::GenerationProvider;
use crate::parser::{parse_structured, FALLBACK_REPLY};
use crate::persona::PersonaProfile;
use crate::prompt::PromptAssembler;
use crate::retrieval::context::ContextRetriever;
use crate::retrieval::embedder::Embedder;
use crate::retrieval::index::{SearchIndex, TurnIndexEntry};

/// One chat request from an authenticated user.
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub message: String,
    /// Existing session to continue; absent or unowned ids start a fresh one.
    pub session_id: Option<Uuid>,
    /// Explicit addressing override; detection runs when absent.
    pub addressing_override: Option<String>,
    /// When false, the secondary follow-up generation call is skipped.
    pub want_followups: bool,
}

/// The shaped result returned to the caller.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub session_id: Uuid,
    pub addressing_mode: AddressingMode,
    pub followups: Vec<String>,
}

/// Orchestrates the response-shaping pipeline for chat turns.
pub struct ChatService<S, T, G, E, X> {
    sessions: S,
    turns: T,
    generator: G,
    embedder: E,
    index: X,
    persona: PersonaProfile,
    config: EngineConfig,
}

impl<S, T, G, E, X> ChatService<S, T, G, E, X>
where
    S: SessionRepository,
    T: TurnRepository,
    G: GenerationProvider,
    E: Embedder,
    X: SearchIndex,
{
    pub fn new(
        sessions: S,
        turns: T,
        generator: G,
        embedder: E,
        index: X,
        persona: PersonaProfile,
        config: EngineConfig,
    ) -> Self {
        Self {
            sessions,
            turns,
            generator,
            embedder,
            index,
            persona,
            config,
        }
    }

    /// Access the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Session lifecycle ---

    /// Create a session explicitly (e.g., from the sessions endpoint).
    pub async fn create_session(
        &self,
        user_id: Uuid,
        title: Option<String>,
    ) -> Result<Session, RepositoryError> {
        let session = Session {
            id: Uuid::now_v7(),
            user_id,
            title,
            created_at: Utc::now(),
        };
        self.sessions.create(&session).await
    }

    /// List the user's sessions, most recently active first.
    pub async fn list_sessions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SessionOverview>, RepositoryError> {
        self.sessions.list_by_activity(&user_id).await
    }

    /// Rename a session; returns None when the session is not owned.
    pub async fn rename_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        title: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        let Some(mut session) = self.sessions.get_if_owned(&session_id, &user_id).await? else {
            return Ok(None);
        };
        self.sessions.rename(&session_id, &user_id, title).await?;
        session.title = Some(title.to_string());
        Ok(Some(session))
    }

    /// Full chronological history for a session; None when not owned.
    pub async fn session_history(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<Vec<Turn>>, RepositoryError> {
        if self
            .sessions
            .get_if_owned(&session_id, &user_id)
            .await?
            .is_none()
        {
            return Ok(None);
        }
        let turns = self.turns.list_chronological(&user_id, &session_id).await?;
        Ok(Some(turns))
    }

    /// Resolve the session for a chat turn.
    ///
    /// A missing id, or an id the user does not own, yields a fresh
    /// session rather than an error: conversation continuity is preferable
    /// to a hard failure, and session creation is idempotent-safe to retry.
    pub async fn ensure_session(
        &self,
        user_id: Uuid,
        session_id: Option<Uuid>,
    ) -> Result<Uuid, RepositoryError> {
        if let Some(id) = session_id {
            if let Some(session) = self.sessions.get_if_owned(&id, &user_id).await? {
                return Ok(session.id);
            }
            info!(session_id = %id, "session not owned or unknown; creating a fresh one");
        }
        let created = self.create_session(user_id, None).await?;
        Ok(created.id)
    }

    // --- The pipeline ---

    /// Process one chat turn end to end.
    #[tracing::instrument(name = "process_chat", skip_all, fields(user_id = %user_id))]
    pub async fn process_chat(
        &self,
        user_id: Uuid,
        input: ChatInput,
    ) -> Result<ChatOutcome, ChatError> {
        let message = input.message.trim().to_string();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let session_id = self.ensure_session(user_id, input.session_id).await?;

        if let Some(request) = shortcut::detect_last_messages_request(&message) {
            return Ok(self
                .answer_last_messages(user_id, session_id, &message, &input, request)
                .await?);
        }

        let context = ContextRetriever::build_context(
            &self.embedder,
            &self.index,
            &self.turns,
            &self.config,
            &message,
            user_id,
            session_id,
        )
        .await;

        let mut history = self
            .turns
            .list_recent(&user_id, &session_id, self.config.history_window)
            .await?;
        sort_chronological(&mut history);

        let mode = match input.addressing_override.as_deref() {
            Some(raw) => addressing::normalize_override(raw),
            None => addressing::detect(&message, &history, &context),
        };

        let messages = PromptAssembler::assemble(
            &self.persona,
            mode,
            &context,
            &history,
            &message,
            self.config.history_window,
        );

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.generator.name(),
            gen_ai.request.model = %self.config.generation_model,
        );
        let raw = self
            .generator
            .generate(&self.config.generation_model, &messages)
            .instrument(span)
            .await
            .map_err(|e| {
                error!(error = %e, "generation call failed");
                ChatError::Generation(e.to_string())
            })?;

        let (mut structured, parse_path) = parse_structured(&raw, mode);
        debug!(?parse_path, "structured output parsed");

        if input.want_followups {
            FollowupGuarantor::ensure(&self.generator, &self.config, &mut structured, &message)
                .await;
        } else {
            structured.perguntas =
                normalize_followups(std::mem::take(&mut structured.perguntas), &self.config);
        }

        let reply = compose_reply(&structured);

        self.persist_turn(user_id, session_id, &message, &reply, mode, &structured)
            .await?;

        self.backfill_title(user_id, session_id, &message).await;

        Ok(ChatOutcome {
            reply,
            session_id,
            addressing_mode: mode,
            followups: structured.perguntas,
        })
    }

    /// The deterministic shortcut path: enumerate the user's own last
    /// messages, oldest first, with no generation call.
    async fn answer_last_messages(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        message: &str,
        input: &ChatInput,
        request: shortcut::LastMessagesRequest,
    ) -> Result<ChatOutcome, RepositoryError> {
        let mut recent = self
            .turns
            .list_recent(&user_id, &session_id, request.count)
            .await?;
        sort_chronological(&mut recent);
        let messages: Vec<String> = recent.into_iter().map(|t| t.message).collect();

        let mode = match input.addressing_override.as_deref() {
            Some(raw) => addressing::normalize_override(raw),
            None => addressing::classify(message),
        };

        Ok(ChatOutcome {
            reply: shortcut::format_last_messages(&messages),
            session_id,
            addressing_mode: mode,
            followups: Vec::new(),
        })
    }

    /// Persist the turn: rich write first (embedding + shaping metadata),
    /// minimal write (message + reply) when the rich write fails. The
    /// minimal write failing is unrecoverable. Indexing the turn into the
    /// retrieval service is best-effort.
    async fn persist_turn(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        message: &str,
        reply: &str,
        mode: AddressingMode,
        structured: &StructuredReply,
    ) -> Result<(), ChatError> {
        let index_text = format!("{message}\n{reply}");
        let embedding = match self.embedder.embed(&index_text).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "turn embedding failed; persisting without it");
                None
            }
        };

        let draft = TurnDraft {
            user_id,
            session_id,
            message: message.to_string(),
            reply: reply.to_string(),
            addressing_mode: Some(mode),
            base_reply: Some(structured.devolucao.clone()),
            followups: structured.perguntas.clone(),
            embedding: embedding.clone(),
        };

        let turn = match self.turns.append(&draft).await {
            Ok(turn) => turn,
            Err(e) => {
                warn!(error = %e, "rich turn write failed; falling back to minimal write");
                self.turns
                    .append_minimal(&user_id, &session_id, message, reply)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "minimal turn write failed");
                        ChatError::Storage(e.to_string())
                    })?
            }
        };

        if let Some(ref vector) = embedding {
            let entry = TurnIndexEntry {
                turn_id: turn.id,
                user_id,
                session_id,
                content: &index_text,
                embedding: vector,
            };
            if let Err(e) = self.index.index_turn(entry).await {
                warn!(error = %e, "turn indexing failed; history retrieval will miss it");
            }
        }

        Ok(())
    }

    /// Set the session title from the first user message once exactly one
    /// turn exists. Errors here never fail the turn.
    async fn backfill_title(&self, user_id: Uuid, session_id: Uuid, first_message: &str) {
        let count = match self.turns.count_for_session(&user_id, &session_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "turn count failed; skipping title backfill");
                return;
            }
        };
        if count != 1 {
            return;
        }

        match self.sessions.get_if_owned(&session_id, &user_id).await {
            Ok(Some(session))
                if session
                    .title
                    .as_deref()
                    .is_none_or(|t| t.trim().is_empty()) =>
            {
                let title: String = first_message.chars().take(self.config.title_char_cap).collect();
                if let Err(e) = self.sessions.rename(&session_id, &user_id, &title).await {
                    warn!(error = %e, "title backfill failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "session lookup failed during title backfill"),
        }
    }
}

/// Compose the final reply text: the shaped reply, with the first
/// follow-up appended on a blank line when the reply does not already
/// end in a question.
fn compose_reply(structured: &StructuredReply) -> String {
    let text = structured.devolucao.trim();
    let text = if text.is_empty() { FALLBACK_REPLY } else { text };

    let ends_in_question =
        text.ends_with('?') || text.ends_with('？') || text.ends_with('！');
    if !ends_in_question {
        if let Some(first) = structured.perguntas.first() {
            return format!("{text}\n\n{first}");
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    use implicada_types::llm::{LlmError, PromptMessage};
    use implicada_types::retrieval::{RetrievalError, RetrievedItem, RetrievedKind};

    use crate::retrieval::index::SearchRequest;

    // --- Fakes ---

    #[derive(Default)]
    struct MemSessions {
        sessions: Mutex<Vec<Session>>,
    }

    impl SessionRepository for MemSessions {
        async fn create(&self, session: &Session) -> Result<Session, RepositoryError> {
            self.sessions.lock().unwrap().push(session.clone());
            Ok(session.clone())
        }

        async fn get_if_owned(
            &self,
            session_id: &Uuid,
            user_id: &Uuid,
        ) -> Result<Option<Session>, RepositoryError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == *session_id && s.user_id == *user_id)
                .cloned())
        }

        async fn rename(
            &self,
            session_id: &Uuid,
            user_id: &Uuid,
            title: &str,
        ) -> Result<(), RepositoryError> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .iter_mut()
                .find(|s| s.id == *session_id && s.user_id == *user_id)
                .ok_or(RepositoryError::NotFound)?;
            session.title = Some(title.to_string());
            Ok(())
        }

        async fn list_by_activity(
            &self,
            _user_id: &Uuid,
        ) -> Result<Vec<SessionOverview>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MemTurns {
        turns: Mutex<Vec<Turn>>,
        next_id: AtomicI64,
        fail_rich: bool,
    }

    impl MemTurns {
        fn push(&self, user_id: Uuid, session_id: Uuid, message: &str, reply: &str) -> Turn {
            let turn = Turn {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                user_id,
                session_id,
                message: message.to_string(),
                reply: reply.to_string(),
                addressing_mode: None,
                base_reply: None,
                followups: Vec::new(),
                created_at: Utc::now(),
            };
            self.turns.lock().unwrap().push(turn.clone());
            turn
        }
    }

    impl TurnRepository for MemTurns {
        async fn append(&self, draft: &TurnDraft) -> Result<Turn, RepositoryError> {
            if self.fail_rich {
                return Err(RepositoryError::Query("rich write rejected".to_string()));
            }
            let turn = Turn {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                user_id: draft.user_id,
                session_id: draft.session_id,
                message: draft.message.clone(),
                reply: draft.reply.clone(),
                addressing_mode: draft.addressing_mode,
                base_reply: draft.base_reply.clone(),
                followups: draft.followups.clone(),
                created_at: Utc::now(),
            };
            self.turns.lock().unwrap().push(turn.clone());
            Ok(turn)
        }

        async fn append_minimal(
            &self,
            user_id: &Uuid,
            session_id: &Uuid,
            message: &str,
            reply: &str,
        ) -> Result<Turn, RepositoryError> {
            Ok(self.push(*user_id, *session_id, message, reply))
        }

        async fn list_recent(
            &self,
            user_id: &Uuid,
            session_id: &Uuid,
            limit: usize,
        ) -> Result<Vec<Turn>, RepositoryError> {
            let mut turns: Vec<Turn> = self
                .turns
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == *user_id && t.session_id == *session_id)
                .cloned()
                .collect();
            turns.sort_by_key(|t| std::cmp::Reverse(t.id));
            turns.truncate(limit);
            Ok(turns)
        }

        async fn list_chronological(
            &self,
            user_id: &Uuid,
            session_id: &Uuid,
        ) -> Result<Vec<Turn>, RepositoryError> {
            let mut turns: Vec<Turn> = self
                .turns
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == *user_id && t.session_id == *session_id)
                .cloned()
                .collect();
            turns.sort_by_key(|t| t.id);
            Ok(turns)
        }

        async fn count_for_session(
            &self,
            user_id: &Uuid,
            session_id: &Uuid,
        ) -> Result<u64, RepositoryError> {
            Ok(self
                .turns
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == *user_id && t.session_id == *session_id)
                .count() as u64)
        }
    }

    #[derive(Default)]
    struct FakeGenerator {
        responses: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<Vec<Vec<PromptMessage>>>,
    }

    impl FakeGenerator {
        fn with(responses: Vec<Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn first_call(&self) -> Vec<PromptMessage> {
            self.calls.lock().unwrap().first().cloned().unwrap_or_default()
        }
    }

    impl GenerationProvider for FakeGenerator {
        fn name(&self) -> &str {
            "fake"
        }

        async fn generate(
            &self,
            _model: &str,
            messages: &[PromptMessage],
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(LlmError::Provider { message }),
                None => Err(LlmError::Provider {
                    message: "no scripted response".to_string(),
                }),
            }
        }
    }

    struct FakeEmbedder {
        fail: bool,
    }

    impl Embedder for FakeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            if self.fail {
                Err(LlmError::EmptyEmbedding)
            } else {
                Ok(vec![0.0; 768])
            }
        }

        fn model_name(&self) -> &str {
            "fake-embedding"
        }

        fn dimension(&self) -> usize {
            768
        }
    }

    struct FakeIndex {
        combined_fails: bool,
        docs: Vec<RetrievedItem>,
    }

    impl SearchIndex for FakeIndex {
        async fn search_docs_and_history(
            &self,
            _request: SearchRequest<'_>,
        ) -> Result<Vec<RetrievedItem>, RetrievalError> {
            if self.combined_fails {
                Err(RetrievalError::Unavailable("simulated outage".to_string()))
            } else {
                Ok(self.docs.clone())
            }
        }

        async fn match_documents(
            &self,
            _query_embedding: &[f32],
            _limit: usize,
            _min_similarity: f32,
        ) -> Result<Vec<RetrievedItem>, RetrievalError> {
            Ok(self.docs.clone())
        }

        async fn index_turn(&self, _entry: TurnIndexEntry<'_>) -> Result<(), RetrievalError> {
            Ok(())
        }
    }

    type TestService = ChatService<MemSessions, MemTurns, FakeGenerator, FakeEmbedder, FakeIndex>;

    fn service(generator: FakeGenerator, turns: MemTurns, index: FakeIndex) -> TestService {
        ChatService::new(
            MemSessions::default(),
            turns,
            generator,
            FakeEmbedder { fail: false },
            index,
            PersonaProfile::default(),
            EngineConfig::default(),
        )
    }

    fn quiet_index() -> FakeIndex {
        FakeIndex {
            combined_fails: false,
            docs: Vec::new(),
        }
    }

    fn json_reply(devolucao: &str, perguntas: &[&str]) -> String {
        serde_json::json!({
            "devolucao": devolucao,
            "perguntas": perguntas,
            "apontamentos_nao_compreendidos": [],
            "limite": { "fora_de_escopo": false, "observacao": "" },
            "silencio": { "sugerido": false, "duracao_s": 0 },
            "posicao": "direct",
            "etica": { "tensoes": [], "nota": "" }
        })
        .to_string()
    }

    fn input(message: &str) -> ChatInput {
        ChatInput {
            message: message.to_string(),
            session_id: None,
            addressing_override: None,
            want_followups: true,
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_pipeline() {
        let svc = service(FakeGenerator::default(), MemTurns::default(), quiet_index());
        let err = svc
            .process_chat(Uuid::now_v7(), input("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }

    #[tokio::test]
    async fn test_full_turn_persists_and_returns_shaped_reply() {
        let generator = FakeGenerator::with(vec![Ok(json_reply(
            "Eu noto o que trazes. O que muda agora?",
            &["Onde sentes isso?"],
        ))]);
        let svc = service(generator, MemTurns::default(), quiet_index());
        let user_id = Uuid::now_v7();

        let outcome = svc.process_chat(user_id, input("tu percebes isso?")).await.unwrap();

        assert_eq!(outcome.reply, "Eu noto o que trazes. O que muda agora?");
        assert_eq!(outcome.addressing_mode, AddressingMode::Direct);
        assert_eq!(outcome.followups, vec!["Onde sentes isso?"]);

        let history = svc
            .session_history(user_id, outcome.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reply, outcome.reply);
        assert_eq!(history[0].followups, vec!["Onde sentes isso?"]);
    }

    #[tokio::test]
    async fn test_detected_mode_overrides_model_self_report() {
        // The model self-reports "direct"; the message is collective.
        let generator =
            FakeGenerator::with(vec![Ok(json_reply("Refletimos juntos?", &["E agora?"]))]);
        let svc = service(generator, MemTurns::default(), quiet_index());

        let outcome = svc
            .process_chat(Uuid::now_v7(), input("vamos pensar nisso juntos?"))
            .await
            .unwrap();

        assert_eq!(outcome.addressing_mode, AddressingMode::Collective);
    }

    #[tokio::test]
    async fn test_explicit_override_wins_over_detection() {
        let generator = FakeGenerator::with(vec![Ok(json_reply("Descrevo.", &["?"]))]);
        let svc = service(generator, MemTurns::default(), quiet_index());

        let mut req = input("vamos pensar juntos?");
        req.addressing_override = Some("ELE".to_string());
        let outcome = svc.process_chat(Uuid::now_v7(), req).await.unwrap();

        assert_eq!(outcome.addressing_mode, AddressingMode::Descriptive);
    }

    #[tokio::test]
    async fn test_shortcut_returns_exact_count_oldest_first_without_generation() {
        let generator = FakeGenerator::default();
        let turns = MemTurns::default();
        let svc = service(generator, turns, quiet_index());
        let user_id = Uuid::now_v7();

        let session = svc.create_session(user_id, None).await.unwrap();
        for i in 1..=5 {
            svc.turns
                .append_minimal(&user_id, &session.id, &format!("mensagem {i}"), "r")
                .await
                .unwrap();
        }

        let mut req = input("quais foram as últimas 3 mensagens que te enviei?");
        req.session_id = Some(session.id);
        let outcome = svc.process_chat(user_id, req).await.unwrap();

        assert_eq!(svc.generator.call_count(), 0);
        assert!(outcome.followups.is_empty());
        assert!(outcome.reply.contains("últimas 3 mensagens"));
        // The newest three, enumerated oldest first.
        assert!(outcome.reply.contains("1. \"mensagem 3\""));
        assert!(outcome.reply.contains("2. \"mensagem 4\""));
        assert!(outcome.reply.contains("3. \"mensagem 5\""));
        assert!(!outcome.reply.contains("mensagem 2"));
    }

    #[tokio::test]
    async fn test_retrieval_outage_still_completes_with_fallback_context() {
        let generator = FakeGenerator::with(vec![Ok(json_reply("Sigo contigo. E tu?", &["?"]))]);
        let index = FakeIndex {
            combined_fails: true,
            docs: vec![RetrievedItem {
                content: "trecho do livro".to_string(),
                kind: RetrievedKind::Document,
                similarity: 0.9,
            }],
        };
        let svc = service(generator, MemTurns::default(), index);
        let user_id = Uuid::now_v7();

        let outcome = svc.process_chat(user_id, input("tu percebes?")).await.unwrap();

        // Turn persisted despite the outage.
        let history = svc
            .session_history(user_id, outcome.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.len(), 1);

        // The prompt carried the fallback document context.
        let prompt = svc.generator.first_call();
        assert!(prompt.iter().any(|m| m.text.contains("trecho do livro")));
    }

    #[tokio::test]
    async fn test_generation_failure_is_unrecoverable() {
        let generator = FakeGenerator::with(vec![Err("model down".to_string())]);
        let svc = service(generator, MemTurns::default(), quiet_index());

        let err = svc
            .process_chat(Uuid::now_v7(), input("tu percebes?"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));
    }

    #[tokio::test]
    async fn test_rich_write_failure_falls_back_to_minimal() {
        let generator = FakeGenerator::with(vec![Ok(json_reply("Eu noto. O que muda?", &["?"]))]);
        let turns = MemTurns {
            fail_rich: true,
            ..Default::default()
        };
        let svc = service(generator, turns, quiet_index());
        let user_id = Uuid::now_v7();

        let outcome = svc.process_chat(user_id, input("tu percebes?")).await.unwrap();

        let history = svc
            .session_history(user_id, outcome.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.len(), 1);
        // Minimal write: no shaping metadata.
        assert!(history[0].base_reply.is_none());
        assert!(history[0].followups.is_empty());
    }

    #[tokio::test]
    async fn test_followup_guarantee_fills_empty_list() {
        let generator = FakeGenerator::with(vec![
            Ok(json_reply("Eu noto uma tensão", &[])),
            Ok("O que muda no corpo?".to_string()),
        ]);
        let svc = service(generator, MemTurns::default(), quiet_index());

        let outcome = svc
            .process_chat(Uuid::now_v7(), input("tu percebes?"))
            .await
            .unwrap();

        assert_eq!(svc.generator.call_count(), 2);
        assert_eq!(outcome.followups, vec!["O que muda no corpo?"]);
        // The reply did not end in a question, so the follow-up is appended.
        assert_eq!(outcome.reply, "Eu noto uma tensão\n\nO que muda no corpo?");
    }

    #[tokio::test]
    async fn test_want_followups_false_skips_secondary_call() {
        let generator = FakeGenerator::with(vec![Ok(json_reply("Eu noto. E tu?", &[]))]);
        let svc = service(generator, MemTurns::default(), quiet_index());

        let mut req = input("tu percebes?");
        req.want_followups = false;
        let outcome = svc.process_chat(Uuid::now_v7(), req).await.unwrap();

        assert_eq!(svc.generator.call_count(), 1);
        assert!(outcome.followups.is_empty());
    }

    #[tokio::test]
    async fn test_unowned_session_gets_fresh_one() {
        let generator = FakeGenerator::with(vec![Ok(json_reply("Eu te escuto. O que trazes?", &["?"]))]);
        let svc = service(generator, MemTurns::default(), quiet_index());
        let user_id = Uuid::now_v7();
        let foreign = Uuid::now_v7();

        let mut req = input("tu percebes?");
        req.session_id = Some(foreign);
        let outcome = svc.process_chat(user_id, req).await.unwrap();

        assert_ne!(outcome.session_id, foreign);
    }

    #[tokio::test]
    async fn test_title_backfilled_on_first_turn_only() {
        let long_message = "a".repeat(80);
        let generator = FakeGenerator::with(vec![
            Ok(json_reply("Primeira. E tu?", &["?"])),
            Ok(json_reply("Segunda. E tu?", &["?"])),
        ]);
        let svc = service(generator, MemTurns::default(), quiet_index());
        let user_id = Uuid::now_v7();

        let outcome = svc.process_chat(user_id, input(&long_message)).await.unwrap();
        let session = svc
            .sessions
            .get_if_owned(&outcome.session_id, &user_id)
            .await
            .unwrap()
            .unwrap();
        let title = session.title.unwrap();
        assert_eq!(title.chars().count(), 60);
        assert_eq!(title, "a".repeat(60));

        // Second turn must not alter the title.
        let mut req = input("tu percebes outra coisa?");
        req.session_id = Some(outcome.session_id);
        svc.process_chat(user_id, req).await.unwrap();
        let session = svc
            .sessions
            .get_if_owned(&outcome.session_id, &user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.title.unwrap(), "a".repeat(60));
    }

    #[test]
    fn test_compose_reply_appends_first_followup_when_no_question() {
        let mut structured =
            StructuredReply::from_text("Eu noto uma pausa".to_string(), AddressingMode::Direct);
        structured.perguntas = vec!["O que muda?".to_string()];
        assert_eq!(compose_reply(&structured), "Eu noto uma pausa\n\nO que muda?");
    }

    #[test]
    fn test_compose_reply_keeps_text_already_ending_in_question() {
        let mut structured =
            StructuredReply::from_text("O que muda?".to_string(), AddressingMode::Direct);
        structured.perguntas = vec!["Outra?".to_string()];
        assert_eq!(compose_reply(&structured), "O que muda?");
    }

    #[test]
    fn test_compose_reply_empty_text_uses_fallback_sentence() {
        let structured = StructuredReply::from_text(String::new(), AddressingMode::Direct);
        assert_eq!(compose_reply(&structured), FALLBACK_REPLY);
    }
}
