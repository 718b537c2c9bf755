//! Conversational question answering over past meetings.
//!
//! Keeps an ordered, scope-filtered conversation against the backend's
//! retrieval service. Questions are shown optimistically and rolled back when
//! the answer fails; losing the session ends any conversation in progress.

pub mod conversation;
pub mod engine;
pub mod error;
pub mod scope;
pub mod state;

pub use conversation::{AskTicket, Conversation, Exchange};
pub use engine::ConversationEngine;
pub use error::ChatError;
pub use scope::{available_dates, meeting_within_date, meetings_on};
pub use state::AskState;
