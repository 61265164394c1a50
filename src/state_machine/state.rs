//! Session state types

use crate::history::Message;

/// Where the session is within a turn
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Prompt shown, waiting for the next line
    #[default]
    AwaitingInput,

    /// User message sent to the moderation gate
    Moderating { message: Message },

    /// Message accepted and appended; completion request in flight
    Completing { message: Message },

    /// Session over, no further events accepted
    Exited,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Exited)
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::AwaitingInput => "awaiting_input",
            TurnState::Moderating { .. } => "moderating",
            TurnState::Completing { .. } => "completing",
            TurnState::Exited => "exited",
        }
    }
}
