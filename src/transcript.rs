//! Append-only conversation transcript
//!
//! One human-readable record per message:
//!
//! ```text
//! [2026-10-19T09:30:12.345Z] User: Suggest a weekend trip near Bangalore.
//! [2026-10-19T09:30:14.012Z] Assistant: Coorg is a great choice.
//!   Continuation lines are indented by two spaces.
//! --------------------------------------------------
//! ```
//!
//! A dashed rule closes every assistant record. Each record is written with a
//! single `write_all`; a crash mid-write can still leave one torn record.

use crate::history::Message;
use crate::llm::MessageRole;
use chrono::SecondsFormat;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const EXCHANGE_RULE_WIDTH: usize = 50;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("failed to open transcript {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write transcript record: {0}")]
    Write(#[from] io::Error),
}

/// Write-only audit sink for exchanged messages
pub trait TranscriptSink: Send {
    fn append(&mut self, message: &Message) -> Result<(), TranscriptError>;
}

/// Transcript backed by a file opened in append mode
pub struct FileTranscript {
    file: File,
    path: PathBuf,
}

impl FileTranscript {
    /// Open (creating if needed) the transcript file for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TranscriptError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source| TranscriptError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_error)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_error)?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptSink for FileTranscript {
    fn append(&mut self, message: &Message) -> Result<(), TranscriptError> {
        let record = format_record(message);
        self.file.write_all(record.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Render a single message as a transcript record
pub fn format_record(message: &Message) -> String {
    let timestamp = message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut lines = message.content.lines();
    let first = lines.next().unwrap_or_default();

    let mut record = format!("[{timestamp}] {}: {first}\n", message.role.label());
    for line in lines {
        record.push_str("  ");
        record.push_str(line);
        record.push('\n');
    }
    if message.role == MessageRole::Assistant {
        record.push_str(&"-".repeat(EXCHANGE_RULE_WIDTH));
        record.push('\n');
    }
    record
}
