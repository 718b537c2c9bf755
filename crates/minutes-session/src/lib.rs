//! Client-side session management for Meeting Notes.
//!
//! Owns the bearer credential lifecycle: silent re-authentication from the
//! persisted credential at startup, login, registration, logout and
//! invalidation when the backend rejects the credential.

pub mod context;
pub mod error;
pub mod manager;
pub mod store;

pub use context::SessionContext;
pub use error::SessionError;
pub use manager::{SessionManager, SessionSnapshot, SessionStatus};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
