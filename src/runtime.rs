//! Runtime for the chat session
//!
//! The executor drives the pure state machine: it reads input from a
//! [`Terminal`], feeds events through `transition`, and performs the
//! resulting effects against the history, moderation gate, completion
//! client and transcript.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use traits::*;

use crate::terminal::ReadlineTerminal;
use crate::transcript::FileTranscript;

/// Type alias for the production runtime with concrete implementations
pub type ProductionRuntime = ChatRuntime<ReadlineTerminal, FileTranscript, CtrlC>;
