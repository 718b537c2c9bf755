//! Meeting submission input and its client-side validation.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ApiError;

/// Where the meeting content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingSource {
    /// Raw transcript text.
    Text(String),
    /// URL of a recording or document the server fetches.
    Link(String),
    /// Path of a file on the server's filesystem.
    File(String),
}

/// A meeting to submit for task extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingInput {
    pub source: MeetingSource,
    pub title: Option<String>,
    pub meeting_date: Option<NaiveDate>,
}

/// Wire body of `POST /api/meetings/process`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct ProcessBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_date: Option<NaiveDate>,
}

impl MeetingInput {
    pub fn new(source: MeetingSource) -> Self {
        Self {
            source,
            title: None,
            meeting_date: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.meeting_date = Some(date);
        self
    }

    /// Check the input before anything is sent.
    ///
    /// The source must be non-blank. Text transcripts carry no metadata of
    /// their own, so they also need a title and a date.
    pub fn validate(&self) -> Result<(), ApiError> {
        let content = match &self.source {
            MeetingSource::Text(s) | MeetingSource::Link(s) | MeetingSource::File(s) => s,
        };
        if content.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "Meeting input cannot be empty".to_string(),
            ));
        }
        if let MeetingSource::Text(_) = self.source {
            let has_title = self.title.as_deref().is_some_and(|t| !t.trim().is_empty());
            if !has_title || self.meeting_date.is_none() {
                return Err(ApiError::InvalidInput(
                    "Title and Date are required for text transcripts.".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn body(&self) -> ProcessBody<'_> {
        let (transcript, file_url, file_path) = match &self.source {
            MeetingSource::Text(s) => (Some(s.as_str()), None, None),
            MeetingSource::Link(s) => (None, Some(s.as_str()), None),
            MeetingSource::File(s) => (None, None, Some(s.as_str())),
        };
        ProcessBody {
            transcript,
            file_url,
            file_path,
            title: self.title.as_deref().filter(|t| !t.trim().is_empty()),
            meeting_date: self.meeting_date,
        }
    }
}
