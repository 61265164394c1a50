//! Line-editing terminal for the interactive session

use crate::runtime::{ReadOutcome, Terminal};
use crate::state_machine::Notice;
use async_trait::async_trait;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "You: ";
const BANNER_WIDTH: usize = 40;

/// Production terminal: rustyline for input, colored text for output
pub struct ReadlineTerminal {
    editor: DefaultEditor,
}

impl ReadlineTerminal {
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

#[async_trait]
impl Terminal for ReadlineTerminal {
    async fn read_line(&mut self) -> ReadOutcome {
        // The editor blocks on stdin; keep the runtime's other workers free
        let read = tokio::task::block_in_place(|| self.editor.readline(PROMPT));

        match read {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        tracing::debug!(error = %e, "Failed to add line to input history");
                    }
                }
                ReadOutcome::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadOutcome::Interrupted,
            Err(ReadlineError::Eof) => ReadOutcome::Eof,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input, ending session");
                ReadOutcome::Eof
            }
        }
    }

    fn show(&mut self, notice: &Notice) {
        println!("{}", render(notice));
    }
}

/// Colored text for a notice
pub fn render(notice: &Notice) -> String {
    match notice {
        Notice::Greeting => {
            let rule = "=".repeat(BANNER_WIDTH);
            format!(
                "{rule}\n{}\n{rule}\n\n{}\n{}\n{}",
                "Wayfarer Travel Assistant".bright_magenta().bold(),
                "Hi! I'm your travel assistant. Ask me anything about travel!",
                "Type 'exit' to quit, 'clear' to clear conversation history".bright_black(),
                "-".repeat(BANNER_WIDTH),
            )
        }
        Notice::EmptyInput => "Please enter a message!".yellow().to_string(),
        Notice::HistoryCleared => "Conversation history cleared!".green().to_string(),
        Notice::Rejected { reason } => format!(
            "{} ({reason})",
            "Sorry, your message can't be sent. Please try again.".yellow()
        ),
        Notice::Thinking => format!("\n{}", "Thinking...".bright_black()),
        Notice::Reply { text } => format!("\n{} {text}\n", "Assistant:".bright_blue().bold()),
        Notice::CompletionFailed { message, transient } => {
            let hint = if *transient {
                "The service is having trouble; please try again in a moment."
            } else {
                "Please check your settings and try again."
            };
            format!(
                "{}\n{}",
                format!("An error occurred: {message}").red(),
                hint.bright_black()
            )
        }
        Notice::Cancelled => "Request cancelled.".yellow().to_string(),
        Notice::Farewell => format!("\n{}", "Thanks for chatting! Have a great trip!".bright_green()),
    }
}
