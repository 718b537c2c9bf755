//! Session manager owning the bearer credential and current identity.
//!
//! State transitions:
//! - Initializing -> Authenticated (persisted credential accepted by `/api/auth/me`)
//! - Initializing -> Anonymous (no persisted credential, or it was rejected)
//! - Anonymous -> Authenticated (login)
//! - any -> Anonymous (logout, invalidation)
//!
//! Every change of the held credential bumps a generation counter and is
//! published on a watch channel so dependents can drop state tied to the old
//! credential and abandon work in flight.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use minutes_api::ApiClient;
use minutes_core::User;

use crate::error::SessionError;
use crate::store::CredentialStore;

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Lifecycle status of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Startup: a persisted credential may be under validation.
    Initializing,
    /// A validated credential and its identity are held.
    Authenticated,
    /// No usable credential.
    Anonymous,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Initializing => write!(f, "Initializing"),
            SessionStatus::Authenticated => write!(f, "Authenticated"),
            SessionStatus::Anonymous => write!(f, "Anonymous"),
        }
    }
}

/// Read-only view of the session published to observers.
///
/// Never carries the credential itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub identity: Option<User>,
    /// Incremented on every change of the held credential.
    pub generation: u64,
}

/// Internal state. Identity exists only alongside a validated credential.
#[derive(Debug, Clone)]
enum SessionState {
    Initializing { credential: Option<String> },
    Authenticated { credential: String, identity: User },
    Anonymous,
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        match self {
            SessionState::Initializing { .. } => SessionStatus::Initializing,
            SessionState::Authenticated { .. } => SessionStatus::Authenticated,
            SessionState::Anonymous => SessionStatus::Anonymous,
        }
    }

    fn credential(&self) -> Option<&str> {
        match self {
            SessionState::Initializing { credential } => credential.as_deref(),
            SessionState::Authenticated { credential, .. } => Some(credential),
            SessionState::Anonymous => None,
        }
    }

    fn identity(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }
}

struct Inner {
    state: SessionState,
    generation: u64,
}

impl Inner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.state.status(),
            identity: self.state.identity().cloned(),
            generation: self.generation,
        }
    }

    /// Replace the state, bumping the generation if the credential changed.
    fn replace(&mut self, next: SessionState) {
        let credential_changed = self.state.credential() != next.credential();
        tracing::debug!("Session state: {} -> {}", self.state.status(), next.status());
        self.state = next;
        if credential_changed {
            self.generation += 1;
        }
    }
}

/// Owns the credential lifecycle. The credential store's sole writer.
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
    inner: Mutex<Inner>,
    updates: watch::Sender<SessionSnapshot>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.api.base_url())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl SessionManager {
    /// Create a manager in the `Initializing` state. Call
    /// [`initialize`](Self::initialize) before use.
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        let inner = Inner {
            state: SessionState::Initializing { credential: None },
            generation: 0,
        };
        let (updates, _) = watch::channel(inner.snapshot());
        Self {
            api,
            store,
            inner: Mutex::new(inner),
            updates,
        }
    }

    /// The API client this session authenticates against.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // -- Reads --

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().state.status()
    }

    pub fn identity(&self) -> Option<User> {
        self.lock().state.identity().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// The credential to attach to protected requests.
    ///
    /// Only a validated credential is handed out; a persisted one still under
    /// validation is not.
    pub fn credential(&self) -> Option<String> {
        match &self.lock().state {
            SessionState::Authenticated { credential, .. } => Some(credential.clone()),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Watch session changes. The receiver starts at the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    // -- Operations --

    /// Restore the session from the persisted credential.
    ///
    /// Without a persisted credential the session becomes anonymous with no
    /// network call. A credential the backend does not accept, or a failed
    /// check, is discarded silently: this never returns an error.
    pub async fn initialize(&self) {
        let persisted = match self.store.load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted credential");
                None
            }
        };

        let Some(credential) = persisted else {
            self.commit(SessionState::Anonymous);
            tracing::info!("No persisted credential; session is anonymous");
            return;
        };

        let generation = self.commit(SessionState::Initializing {
            credential: Some(credential.clone()),
        });

        match self.api.current_user(&credential).await {
            Ok(identity) => {
                let user_id = identity.id;
                let next = SessionState::Authenticated {
                    credential,
                    identity,
                };
                if self.commit_if(generation, next) {
                    tracing::info!(user_id, "Session restored from persisted credential");
                } else {
                    tracing::debug!("Session changed during validation; result discarded");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persisted credential not accepted; signing out");
                self.end_session(Some(generation));
            }
        }
    }

    /// Authenticate with email and password.
    ///
    /// On success the credential is persisted and the session becomes
    /// authenticated. On failure the state is left untouched and the error
    /// carries the message to display.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let token = self.api.login(email, password).await.map_err(|e| {
            tracing::warn!(error = %e, "Login rejected");
            SessionError::RequestFailed(e.detail_or(LOGIN_FAILED))
        })?;

        let identity = self
            .api
            .current_user(&token.access_token)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Identity lookup after login failed");
                SessionError::RequestFailed(LOGIN_FAILED.to_string())
            })?;

        self.store.save(&token.access_token)?;
        let user_id = identity.id;
        self.commit(SessionState::Authenticated {
            credential: token.access_token,
            identity: identity.clone(),
        });
        tracing::info!(user_id, "Session authenticated");
        Ok(identity)
    }

    /// Create an account. Does not log in; call [`login`](Self::login) next.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let user = self.api.register(email, password).await.map_err(|e| {
            tracing::warn!(error = %e, "Registration rejected");
            SessionError::RequestFailed(e.detail_or(REGISTRATION_FAILED))
        })?;
        tracing::info!(user_id = user.id, "Account registered");
        Ok(user)
    }

    /// Discard the credential and identity. Never fails.
    pub fn logout(&self) {
        self.end_session(None);
        tracing::info!("Logged out");
    }

    /// Discard a credential the backend rejected. Same end-state as `logout`.
    pub fn invalidate(&self) {
        tracing::warn!("Credential rejected by server; session invalidated");
        self.end_session(None);
    }

    // -- Private helpers --

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session mutex poisoned")
    }

    /// Apply `next` unconditionally; returns the resulting generation.
    fn commit(&self, next: SessionState) -> u64 {
        let snapshot = {
            let mut inner = self.lock();
            inner.replace(next);
            inner.snapshot()
        };
        let generation = snapshot.generation;
        self.updates.send_replace(snapshot);
        generation
    }

    /// Apply `next` only if nothing changed the credential since `generation`.
    fn commit_if(&self, generation: u64, next: SessionState) -> bool {
        let snapshot = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return false;
            }
            inner.replace(next);
            inner.snapshot()
        };
        self.updates.send_replace(snapshot);
        true
    }

    /// Clear the persisted credential and move to `Anonymous`.
    ///
    /// With `if_generation`, does nothing when the credential has changed since.
    fn end_session(&self, if_generation: Option<u64>) {
        let snapshot = {
            let mut inner = self.lock();
            if if_generation.is_some_and(|g| g != inner.generation) {
                return;
            }
            if let Err(e) = self.store.clear() {
                tracing::warn!(error = %e, "Failed to remove persisted credential");
            }
            inner.replace(SessionState::Anonymous);
            inner.snapshot()
        };
        self.updates.send_replace(snapshot);
    }
}
