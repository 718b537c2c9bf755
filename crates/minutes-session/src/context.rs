//! Capability interface handed to session consumers.
//!
//! Consumers get read access plus the session operations, never a handle to
//! the credential store.

use async_trait::async_trait;
use tokio::sync::watch;

use minutes_core::User;

use crate::error::SessionError;
use crate::manager::{SessionManager, SessionSnapshot, SessionStatus};

/// What a view or engine may do with the session.
#[async_trait]
pub trait SessionContext: Send + Sync {
    fn snapshot(&self) -> SessionSnapshot;

    /// The latest validated credential. Read it per request; never cache it.
    fn credential(&self) -> Option<String>;

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot>;

    async fn login(&self, email: &str, password: &str) -> Result<User, SessionError>;

    async fn register(&self, email: &str, password: &str) -> Result<User, SessionError>;

    fn logout(&self);

    /// Report that the backend rejected the credential.
    fn invalidate(&self);

    fn status(&self) -> SessionStatus {
        self.snapshot().status
    }

    fn identity(&self) -> Option<User> {
        self.snapshot().identity
    }

    fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }
}

#[async_trait]
impl SessionContext for SessionManager {
    fn snapshot(&self) -> SessionSnapshot {
        SessionManager::snapshot(self)
    }

    fn credential(&self) -> Option<String> {
        SessionManager::credential(self)
    }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        SessionManager::subscribe(self)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        SessionManager::login(self, email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<User, SessionError> {
        SessionManager::register(self, email, password).await
    }

    fn logout(&self) {
        SessionManager::logout(self)
    }

    fn invalidate(&self) {
        SessionManager::invalidate(self)
    }
}
