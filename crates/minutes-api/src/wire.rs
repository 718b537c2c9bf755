//! Request and response bodies exchanged with the backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use minutes_core::ScopeFilter;

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /api/ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<i64>,
    /// Serialized as `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl AskRequest {
    /// Build a request for `question` scoped by `scope`.
    pub fn scoped(question: impl Into<String>, scope: &ScopeFilter) -> Self {
        Self {
            question: question.into(),
            meeting_id: scope.meeting_id,
            date: scope.date,
        }
    }
}

/// Answer to a question, with the titles of the meetings used as context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Stored memory count from `GET /api/ask/memories`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryCount {
    pub count: u64,
    pub status: String,
}
