//! Typed client for the Meeting Notes REST API.
//!
//! Every protected call takes the bearer credential as an argument instead of
//! caching it, so callers always send the latest value they hold.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use minutes_core::{MeetingDetail, MeetingSummary, User};

use crate::error::ApiError;
use crate::input::MeetingInput;
use crate::wire::{AskRequest, AskResponse, MemoryCount, RegisterRequest, TokenResponse};

/// HTTP client bound to one backend base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with no request timeout.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, None)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- Authentication --

    /// Exchange email and password for a bearer credential.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let request = self
            .client
            .post(self.url("/api/auth/login"))
            .form(&[("username", email), ("password", password)]);
        self.send_json(request).await
    }

    /// Create an account. Does not establish a session.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&RegisterRequest { email, password });
        self.send_json(request).await
    }

    /// Resolve the identity behind `token`.
    pub async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        let request = self
            .client
            .get(self.url("/api/auth/me"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    // -- Questions --

    /// Ask a question answered from past meetings.
    pub async fn ask(&self, token: &str, body: &AskRequest) -> Result<AskResponse, ApiError> {
        let request = self
            .client
            .post(self.url("/api/ask"))
            .bearer_auth(token)
            .json(body);
        self.send_json(request).await
    }

    /// Number of meeting memories stored for the current user.
    pub async fn memory_count(&self, token: &str) -> Result<MemoryCount, ApiError> {
        let request = self
            .client
            .get(self.url("/api/ask/memories"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    // -- Meetings --

    /// List processed meetings, newest first.
    pub async fn list_meetings(&self, token: &str) -> Result<Vec<MeetingSummary>, ApiError> {
        let request = self
            .client
            .get(self.url("/api/meetings/conversations"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    /// Fetch one meeting with its transcript and tasks.
    pub async fn get_meeting(&self, token: &str, id: i64) -> Result<MeetingDetail, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/api/meetings/conversations/{}", id)))
            .bearer_auth(token);
        self.send_json(request).await
    }

    /// Submit a meeting for task extraction.
    ///
    /// The input is validated locally first; invalid input never reaches the
    /// network.
    pub async fn process_meeting(
        &self,
        token: &str,
        input: &MeetingInput,
    ) -> Result<MeetingDetail, ApiError> {
        input.validate()?;
        let request = self
            .client
            .post(self.url("/api/meetings/process"))
            .bearer_auth(token)
            .json(&input.body());
        self.send_json(request).await
    }

    // -- Private helpers --

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Turn a non-success response into an `ApiError` carrying its detail.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), path = %url, "Request rejected");
    Err(ApiError::from_response(status.as_u16(), &body))
}
