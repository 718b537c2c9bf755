//! Error types for session operations.

use minutes_core::MinutesError;

/// Errors surfaced by `login` and `register`.
///
/// `initialize` and `logout` never fail; rejected or unreadable credentials
/// end in the anonymous state instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend refused the request or could not be reached. Carries the
    /// message to show the user.
    #[error("{0}")]
    RequestFailed(String),
    #[error("credential storage error: {0}")]
    Storage(String),
}

impl From<MinutesError> for SessionError {
    fn from(err: MinutesError) -> Self {
        SessionError::Storage(err.to_string())
    }
}
