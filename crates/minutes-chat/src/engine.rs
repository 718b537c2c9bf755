//! Conversation engine: asks questions on behalf of the current session.
//!
//! One question may be in flight at a time. The question is shown before the
//! request resolves and removed again if no answer arrives. The engine never
//! holds on to the credential; it reads it from the session for every request.
//!
//! The engine tracks the session generation it last saw. When the session
//! changes (logout, invalidation, another login) the conversation, error,
//! scope and meeting catalog all start over, and a question in flight is
//! abandoned.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tokio::sync::watch;

use minutes_api::{ApiClient, AskRequest};
use minutes_core::{MeetingSummary, ScopeFilter, Turn};
use minutes_session::{SessionContext, SessionSnapshot};

use crate::conversation::{Conversation, Exchange};
use crate::error::ChatError;
use crate::scope;
use crate::state::AskState;

const ASK_FAILED: &str = "Failed to get answer";

#[derive(Debug, Default)]
struct EngineState {
    conversation: Conversation,
    last_error: Option<String>,
    scope: ScopeFilter,
    /// Meetings offered for scoping, newest first as listed by the server.
    catalog: Vec<MeetingSummary>,
    generation: u64,
}

impl EngineState {
    /// Start over if the session moved to another generation.
    fn observe(&mut self, generation: u64) {
        if self.generation == generation {
            return;
        }
        if !self.conversation.is_empty() || self.last_error.is_some() {
            tracing::debug!(
                from = self.generation,
                to = generation,
                "Session changed; conversation reset"
            );
        }
        *self = EngineState {
            generation,
            ..EngineState::default()
        };
    }
}

/// Owns the conversation for one session activation.
pub struct ConversationEngine {
    session: Arc<dyn SessionContext>,
    api: ApiClient,
    state: Mutex<EngineState>,
}

impl ConversationEngine {
    pub fn new(session: Arc<dyn SessionContext>, api: ApiClient) -> Self {
        let generation = session.snapshot().generation;
        Self {
            session,
            api,
            state: Mutex::new(EngineState {
                generation,
                ..EngineState::default()
            }),
        }
    }

    // -- Asking --

    /// Ask `question` within the current scope.
    ///
    /// Returns `Ok(None)` without doing anything when the trimmed question is
    /// empty or another question is still pending. On success the answered
    /// exchange has been appended. On failure the question has been removed;
    /// only [`ChatError::RequestFailed`] also sets [`last_error`].
    ///
    /// [`last_error`]: Self::last_error
    pub async fn ask(&self, question: &str) -> Result<Option<Exchange>, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let mut updates = self.session.subscribe();
        let generation = updates.borrow_and_update().generation;

        let (ticket, request, credential) = {
            let mut state = self.lock();
            state.observe(generation);
            if state.conversation.is_pending() {
                tracing::debug!("Question dropped; another is pending");
                return Ok(None);
            }
            let Some(credential) = self.session.credential() else {
                return Err(ChatError::NotAuthenticated);
            };
            state.last_error = None;
            let Some(ticket) = state.conversation.begin(question) else {
                return Ok(None);
            };
            let request = AskRequest::scoped(question, &state.scope);
            (ticket, request, credential)
        };

        tracing::debug!(
            meeting_id = ?request.meeting_id,
            date = ?request.date,
            "Sending question"
        );

        let outcome = tokio::select! {
            biased;
            _ = session_change(&mut updates, generation) => None,
            result = self.api.ask(&credential, &request) => Some(result),
        };

        match outcome {
            None => {
                let mut state = self.lock();
                state.conversation.rollback(ticket);
                state.observe(self.session.snapshot().generation);
                tracing::info!("Session ended while a question was pending; question dropped");
                Err(ChatError::SessionEnded)
            }
            Some(Ok(response)) => {
                let mut state = self.lock();
                match state
                    .conversation
                    .commit(ticket, response.answer, response.sources)
                {
                    Some(exchange) => {
                        tracing::info!(sources = exchange.sources.len(), "Answer received");
                        Ok(Some(exchange))
                    }
                    None => Err(ChatError::SessionEnded),
                }
            }
            Some(Err(e)) if e.is_auth_invalid() => {
                self.lock().conversation.rollback(ticket);
                // A rejection of an older credential must not end a newer session.
                if self.session.snapshot().generation == generation {
                    self.session.invalidate();
                }
                let current = self.session.snapshot().generation;
                self.lock().observe(current);
                Err(ChatError::SessionInvalidated)
            }
            Some(Err(e)) => {
                let message = e.detail_or(ASK_FAILED);
                tracing::warn!(error = %e, "Question failed");
                let mut state = self.lock();
                if state.conversation.rollback(ticket).is_some() {
                    state.last_error = Some(message.clone());
                }
                Err(ChatError::RequestFailed(message))
            }
        }
    }

    // -- Scope --

    pub fn scope(&self) -> ScopeFilter {
        self.current().scope.clone()
    }

    /// Select a meeting, or clear the meeting selection with `None`.
    pub fn set_meeting(&self, meeting_id: Option<i64>) {
        self.current().scope.meeting_id = meeting_id;
    }

    /// Select a date, dropping a selected meeting not recorded on it.
    /// `None` clears the date and keeps the meeting.
    pub fn set_date(&self, date: Option<NaiveDate>) {
        let mut state = self.current();
        let EngineState { scope: filter, catalog, .. } = &mut *state;
        scope::apply_date(filter, date, catalog);
    }

    /// Set both filters; the date is applied after the meeting.
    pub fn set_scope(&self, meeting_id: Option<i64>, date: Option<NaiveDate>) {
        let mut state = self.current();
        let EngineState { scope: filter, catalog, .. } = &mut *state;
        filter.meeting_id = meeting_id;
        scope::apply_date(filter, date, catalog);
    }

    pub fn clear_scope(&self) {
        self.current().scope = ScopeFilter::default();
    }

    // -- Meeting catalog --

    /// Reload the meetings offered for scoping.
    ///
    /// Failures are logged and otherwise ignored; the previous catalog stays.
    /// A rejected credential still ends the session.
    pub async fn refresh_meetings(&self) {
        let generation = self.session.snapshot().generation;
        let Some(credential) = self.session.credential() else {
            tracing::debug!("Not authenticated; meeting catalog not refreshed");
            return;
        };

        match self.api.list_meetings(&credential).await {
            Ok(meetings) => {
                let mut state = self.current();
                if state.generation == generation {
                    tracing::debug!(count = meetings.len(), "Meeting catalog refreshed");
                    state.catalog = meetings;
                }
            }
            Err(e) if e.is_auth_invalid() => {
                if self.session.snapshot().generation == generation {
                    self.session.invalidate();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh meeting catalog");
            }
        }
    }

    pub fn meetings(&self) -> Vec<MeetingSummary> {
        self.current().catalog.clone()
    }

    /// Distinct dates of catalog meetings, newest first.
    pub fn available_dates(&self) -> Vec<NaiveDate> {
        scope::available_dates(&self.current().catalog)
    }

    /// Catalog meetings matching the current date filter.
    pub fn meeting_options(&self) -> Vec<MeetingSummary> {
        let state = self.current();
        scope::meetings_on(&state.catalog, state.scope.date)
            .into_iter()
            .cloned()
            .collect()
    }

    // -- Reads --

    pub fn turns(&self) -> Vec<Turn> {
        self.current().conversation.turns()
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.current().conversation.exchanges().to_vec()
    }

    pub fn state(&self) -> AskState {
        self.current().conversation.state()
    }

    pub fn is_pending(&self) -> bool {
        self.current().conversation.is_pending()
    }

    pub fn last_error(&self) -> Option<String> {
        self.current().last_error.clone()
    }

    /// Plain-text export of the answered exchanges.
    pub fn transcript(&self) -> String {
        self.current().conversation.transcript()
    }

    /// Forget the conversation and error; scope and catalog are kept.
    pub fn clear(&self) {
        let mut state = self.current();
        state.conversation.clear();
        state.last_error = None;
    }

    // -- Private helpers --

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("conversation mutex poisoned")
    }

    /// Lock the state after bringing it up to the current session generation.
    fn current(&self) -> MutexGuard<'_, EngineState> {
        let generation = self.session.snapshot().generation;
        let mut state = self.lock();
        state.observe(generation);
        state
    }
}

/// Resolves once the session moves past `generation`.
async fn session_change(updates: &mut watch::Receiver<SessionSnapshot>, generation: u64) {
    loop {
        if updates.borrow_and_update().generation != generation {
            return;
        }
        if updates.changed().await.is_err() {
            // The session is gone; nothing will change any more.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use minutes_core::User;
    use minutes_session::{SessionError, SessionStatus};

    /// Session stub whose credential is set directly.
    struct FakeSession {
        credential: Mutex<Option<String>>,
        updates: watch::Sender<SessionSnapshot>,
    }

    impl FakeSession {
        fn new(credential: Option<&str>) -> Arc<Self> {
            let snapshot = SessionSnapshot {
                status: if credential.is_some() {
                    SessionStatus::Authenticated
                } else {
                    SessionStatus::Anonymous
                },
                identity: None,
                generation: 1,
            };
            Arc::new(Self {
                credential: Mutex::new(credential.map(str::to_string)),
                updates: watch::channel(snapshot).0,
            })
        }

        fn end(&self) {
            *self.credential.lock().unwrap() = None;
            self.updates.send_modify(|s| {
                s.status = SessionStatus::Anonymous;
                s.generation += 1;
            });
        }
    }

    #[async_trait]
    impl SessionContext for FakeSession {
        fn snapshot(&self) -> SessionSnapshot {
            self.updates.borrow().clone()
        }

        fn credential(&self) -> Option<String> {
            self.credential.lock().unwrap().clone()
        }

        fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
            self.updates.subscribe()
        }

        async fn login(&self, _email: &str, _password: &str) -> Result<User, SessionError> {
            Err(SessionError::RequestFailed("unsupported".to_string()))
        }

        async fn register(&self, _email: &str, _password: &str) -> Result<User, SessionError> {
            Err(SessionError::RequestFailed("unsupported".to_string()))
        }

        fn logout(&self) {
            self.end();
        }

        fn invalidate(&self) {
            self.end();
        }
    }

    fn engine(session: Arc<FakeSession>) -> ConversationEngine {
        // Nothing listens on port 9; tests here never reach the network.
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        ConversationEngine::new(session, api)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let engine = engine(FakeSession::new(Some("t1")));
        assert_eq!(engine.ask("   \n\t").await, Ok(None));
        assert!(engine.turns().is_empty());
        assert_eq!(engine.state(), AskState::Idle);
    }

    #[tokio::test]
    async fn test_ask_without_credential() {
        let engine = engine(FakeSession::new(None));
        assert_eq!(engine.ask("Q").await, Err(ChatError::NotAuthenticated));
        assert!(engine.turns().is_empty());
        assert!(engine.last_error().is_none());
    }

    #[tokio::test]
    async fn test_pending_question_blocks_second_ask() {
        let engine = engine(FakeSession::new(Some("t1")));
        engine.lock().conversation.begin("first");

        assert_eq!(engine.ask("second").await, Ok(None));
        assert_eq!(engine.turns(), vec![Turn::user("first")]);
    }

    #[tokio::test]
    async fn test_unreachable_server_rolls_back_with_error() {
        let engine = engine(FakeSession::new(Some("t1")));
        let err = engine.ask("Q").await.unwrap_err();
        assert!(matches!(err, ChatError::RequestFailed(_)));
        assert!(engine.turns().is_empty());
        assert_eq!(engine.last_error().as_deref(), Some("Failed to get answer"));
        assert!(!engine.is_pending());
    }

    #[test]
    fn test_session_change_resets_everything() {
        let session = FakeSession::new(Some("t1"));
        let engine = engine(Arc::clone(&session));
        {
            let mut state = engine.lock();
            let ticket = state.conversation.begin("Q").unwrap();
            state.conversation.commit(ticket, "A", vec![]);
            state.last_error = Some("boom".to_string());
            state.scope.meeting_id = Some(3);
        }
        assert_eq!(engine.turns().len(), 2);

        session.end();

        assert!(engine.turns().is_empty());
        assert!(engine.last_error().is_none());
        assert!(engine.scope().is_empty());
    }

    #[test]
    fn test_scope_updates() {
        let engine = engine(FakeSession::new(Some("t1")));
        engine.lock().catalog = vec![MeetingSummary {
            id: 7,
            title: None,
            created_at: day(2).and_hms_opt(9, 0, 0).unwrap(),
            task_count: 1,
        }];

        engine.set_meeting(Some(7));
        engine.set_date(Some(day(2)));
        assert_eq!(engine.scope().meeting_id, Some(7));

        engine.set_date(Some(day(3)));
        assert_eq!(engine.scope().meeting_id, None);
        assert_eq!(engine.scope().date, Some(day(3)));

        engine.set_scope(Some(7), Some(day(2)));
        assert_eq!(
            engine.scope(),
            ScopeFilter {
                meeting_id: Some(7),
                date: Some(day(2)),
            }
        );

        engine.set_date(None);
        assert_eq!(engine.scope().meeting_id, Some(7));

        engine.clear_scope();
        assert!(engine.scope().is_empty());
    }

    #[test]
    fn test_projections_follow_date_filter() {
        let engine = engine(FakeSession::new(Some("t1")));
        engine.lock().catalog = vec![
            MeetingSummary {
                id: 2,
                title: Some("Retro".to_string()),
                created_at: day(4).and_hms_opt(15, 0, 0).unwrap(),
                task_count: 0,
            },
            MeetingSummary {
                id: 1,
                title: Some("Kickoff".to_string()),
                created_at: day(1).and_hms_opt(9, 0, 0).unwrap(),
                task_count: 3,
            },
        ];

        assert_eq!(engine.available_dates(), vec![day(4), day(1)]);
        assert_eq!(engine.meeting_options().len(), 2);

        engine.set_date(Some(day(1)));
        let options = engine.meeting_options();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].id, 1);
    }

    #[tokio::test]
    async fn test_refresh_without_credential_keeps_catalog() {
        let engine = engine(FakeSession::new(None));
        engine.refresh_meetings().await;
        assert!(engine.meetings().is_empty());
    }

    #[test]
    fn test_clear_keeps_scope() {
        let engine = engine(FakeSession::new(Some("t1")));
        engine.set_meeting(Some(1));
        engine.lock().last_error = Some("x".to_string());
        engine.clear();
        assert!(engine.last_error().is_none());
        assert_eq!(engine.scope().meeting_id, Some(1));
    }
}
