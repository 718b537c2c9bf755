//! Error types for backend requests.

/// Maximum number of characters of a non-JSON error body kept for display.
const BODY_EXCERPT_CHARS: usize = 100;

/// Errors from a backend request.
///
/// `Unauthorized` is the credential-rejection class: callers treat it as a
/// session-invalidating event. Every other variant is an ordinary request
/// failure to be shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized: {}", .detail.as_deref().unwrap_or("credential rejected"))]
    Unauthorized { detail: Option<String> },
    #[error("request failed with status {status}")]
    Status {
        status: u16,
        detail: Option<String>,
        /// Raw body, kept only when the server did not answer with JSON.
        body: Option<String>,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Whether the server rejected the bearer credential.
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// The server-supplied `detail` text, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail } | ApiError::Status { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }

    /// User-facing message: the server detail when present, else `fallback`.
    ///
    /// Client-side validation failures carry their own message.
    pub fn detail_or(&self, fallback: &str) -> String {
        match self {
            ApiError::InvalidInput(msg) => msg.clone(),
            _ => self.detail().unwrap_or(fallback).to_string(),
        }
    }

    /// Like [`detail_or`](Self::detail_or), but reports non-JSON error bodies
    /// as `Server Error (<status>): <excerpt>...`.
    pub fn detail_or_body(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                status,
                detail: None,
                body: Some(body),
            } => {
                let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
                format!("Server Error ({}): {}...", status, excerpt)
            }
            _ => self.detail_or(fallback),
        }
    }

    /// Build an error from a non-success status and its raw body.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
        let detail = parsed.as_ref().and_then(extract_detail);
        if status == 401 {
            return ApiError::Unauthorized { detail };
        }
        let body = match parsed {
            Some(_) => None,
            None if body.trim().is_empty() => None,
            None => Some(body.to_string()),
        };
        ApiError::Status {
            status,
            detail,
            body,
        }
    }
}

/// Pull the `detail` field out of an error body.
///
/// FastAPI sends either `{"detail": "text"}` or, for validation failures,
/// `{"detail": [{"msg": "..."}, ...]}`.
fn extract_detail(value: &serde_json::Value) -> Option<String> {
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}
