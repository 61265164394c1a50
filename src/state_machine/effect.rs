//! Effects produced by state transitions

use crate::history::Message;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run the moderation gate over the text
    Moderate { text: String },

    /// Append a message to the conversation history
    AppendHistory(Message),

    /// Reset the history to the persona message
    ClearHistory,

    /// Snapshot the history and call the completion client
    RequestCompletion,

    /// Append a record to the transcript
    RecordTranscript(Message),

    /// Show something to the user
    Display(Notice),

    /// Leave the session loop
    Exit,
}

impl Effect {
    pub fn display(notice: Notice) -> Self {
        Effect::Display(notice)
    }
}

/// User-facing output, rendered by the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Greeting,
    EmptyInput,
    HistoryCleared,
    Rejected { reason: String },
    Thinking,
    Reply { text: String },
    CompletionFailed { message: String, transient: bool },
    Cancelled,
    Farewell,
}
