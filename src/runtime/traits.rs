//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::state_machine::Notice;
use async_trait::async_trait;

/// Result of reading one line at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C at the prompt
    Interrupted,
    /// Ctrl-D or closed stdin
    Eof,
}

/// Interactive input and output for a session
#[async_trait]
pub trait Terminal: Send {
    /// Prompt for and read the next line
    async fn read_line(&mut self) -> ReadOutcome;

    /// Render a notice to the user
    fn show(&mut self, notice: &Notice);
}

/// Source of user interrupts while a completion is in flight
#[async_trait]
pub trait InterruptSignal: Send + Sync {
    /// Resolves when the user asks to cancel
    async fn interrupted(&self);
}

/// Process Ctrl-C (SIGINT)
#[derive(Debug, Default, Clone, Copy)]
pub struct CtrlC;

#[async_trait]
impl InterruptSignal for CtrlC {
    async fn interrupted(&self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C, cancellation disabled");
            std::future::pending::<()>().await;
        }
    }
}
