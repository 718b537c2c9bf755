//! Conversation as a list of answered exchanges plus one optional pending
//! question.
//!
//! A question only becomes part of the history together with its answer, so
//! the displayed turns can never hold an unanswered question once the pending
//! one settles.

use minutes_core::Turn;

use crate::state::{AskOutcome, AskState};

/// Identifies one pending question.
///
/// Commits and rollbacks carrying a ticket from before a [`clear`] or from an
/// earlier question are ignored.
///
/// [`clear`]: Conversation::clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskTicket(u64);

/// A question paired with its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    /// Titles of the meetings the answer was drawn from, in server order.
    pub sources: Vec<String>,
}

impl Exchange {
    /// The user turn followed by the assistant turn.
    pub fn turns(&self) -> [Turn; 2] {
        [
            Turn::user(self.question.clone()),
            Turn::assistant(self.answer.clone(), self.sources.clone()),
        ]
    }
}

#[derive(Debug, Clone)]
struct PendingQuestion {
    ticket: AskTicket,
    question: String,
}

/// In-memory conversation. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    exchanges: Vec<Exchange>,
    pending: Option<PendingQuestion>,
    next_ticket: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AskState {
        if self.pending.is_some() {
            AskState::Pending
        } else {
            AskState::Idle
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_question(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.question.as_str())
    }

    /// Answered exchanges in the order they were asked.
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty() && self.pending.is_none()
    }

    /// Show `question` as pending. Returns `None` if a question is already
    /// pending.
    pub fn begin(&mut self, question: impl Into<String>) -> Option<AskTicket> {
        if !self.state().can_transition_to(&AskState::Pending) {
            return None;
        }
        let ticket = AskTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(PendingQuestion {
            ticket,
            question: question.into(),
        });
        tracing::debug!("Ask state: {} -> {}", AskState::Idle, AskState::Pending);
        Some(ticket)
    }

    /// Pair the pending question with its answer and append the exchange.
    pub fn commit(
        &mut self,
        ticket: AskTicket,
        answer: impl Into<String>,
        sources: Vec<String>,
    ) -> Option<Exchange> {
        let pending = self.settle(ticket, AskOutcome::Committed)?;
        let exchange = Exchange {
            question: pending.question,
            answer: answer.into(),
            sources,
        };
        self.exchanges.push(exchange.clone());
        Some(exchange)
    }

    /// Drop the pending question. Returns its text.
    pub fn rollback(&mut self, ticket: AskTicket) -> Option<String> {
        self.settle(ticket, AskOutcome::RolledBack)
            .map(|pending| pending.question)
    }

    /// Forget every exchange and any pending question.
    pub fn clear(&mut self) {
        self.exchanges.clear();
        self.pending = None;
    }

    /// Turns for display: each exchange as a user/assistant pair, then the
    /// pending question, if any, as a lone user turn.
    pub fn turns(&self) -> Vec<Turn> {
        let mut turns: Vec<Turn> = self
            .exchanges
            .iter()
            .flat_map(|exchange| exchange.turns())
            .collect();
        if let Some(pending) = &self.pending {
            turns.push(Turn::user(pending.question.clone()));
        }
        turns
    }

    /// Plain-text export of the answered exchanges.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for (i, exchange) in self.exchanges.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("You: {}\n", exchange.question));
            out.push_str(&format!("Assistant: {}\n", exchange.answer));
            if !exchange.sources.is_empty() {
                out.push_str(&format!("Sources: {}\n", exchange.sources.join(", ")));
            }
        }
        out
    }

    fn settle(&mut self, ticket: AskTicket, outcome: AskOutcome) -> Option<PendingQuestion> {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {}
            _ => {
                tracing::debug!(%outcome, "Ignoring stale ask ticket");
                return None;
            }
        }
        tracing::debug!(
            "Ask state: {} -> {} ({})",
            AskState::Pending,
            AskState::Idle,
            outcome
        );
        self.pending.take()
    }
}
