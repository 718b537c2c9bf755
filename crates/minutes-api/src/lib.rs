//! HTTP plumbing for the Meeting Notes backend.
//!
//! Wraps every REST endpoint the client talks to behind a typed `ApiClient`
//! and classifies failures into credential rejections and ordinary request
//! failures carrying the server's `detail` text.

pub mod client;
pub mod error;
pub mod input;
pub mod wire;

pub use client::ApiClient;
pub use error::ApiError;
pub use input::{MeetingInput, MeetingSource};
pub use wire::{AskRequest, AskResponse, MemoryCount, TokenResponse};
