//! Events that drive the session

use crate::history::Message;
use crate::moderation::Verdict;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Terminal events
    Input {
        text: String,
        received_at: DateTime<Utc>,
    },
    EndOfInput,
    Interrupt,

    // Moderation events
    ModerationChecked {
        verdict: Verdict,
    },
    ModerationCancelled,

    // Completion events
    CompletionSucceeded {
        reply: Message,
    },
    CompletionFailed {
        message: String,
        /// Whether the failure was transient (already retried by the client)
        transient: bool,
    },
    CompletionCancelled,
}

/// Session commands recognised at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
}

impl Command {
    /// Match a trimmed input line, ignoring case
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("exit") {
            Some(Command::Exit)
        } else if text.eq_ignore_ascii_case("clear") {
            Some(Command::Clear)
        } else {
            None
        }
    }
}
