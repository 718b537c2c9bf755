//! Error types for the conversation engine.

/// Errors from [`ConversationEngine::ask`](crate::ConversationEngine::ask).
///
/// Only `RequestFailed` is meant for an error banner. The other variants
/// report that the session went away and need no message of their own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("not logged in")]
    NotAuthenticated,
    #[error("session expired; log in again")]
    SessionInvalidated,
    #[error("session ended before the answer arrived")]
    SessionEnded,
    /// Carries the server detail or the generic fallback.
    #[error("{0}")]
    RequestFailed(String),
}

impl ChatError {
    /// Whether this error belongs in `last_error`.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, ChatError::RequestFailed(_))
    }
}
