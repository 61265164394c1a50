//! Bounded conversation history
//!
//! Holds the rolling context window sent with each completion request.
//! The optional leading system message is exempt from eviction; every
//! other message is evicted oldest-first once the window is full.

use crate::llm::{LlmMessage, MessageRole};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// A single message exchanged in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Creation time; only used for transcript records
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content, Utc::now())
    }

    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::User, content, timestamp)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content, Utc::now())
    }
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        LlmMessage::new(message.role, message.content.clone())
    }
}

/// Ordered, size-bounded conversation window
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    system: Option<Message>,
    window: VecDeque<Message>,
    capacity: NonZeroUsize,
}

impl ConversationHistory {
    pub fn new(system: Option<Message>, capacity: NonZeroUsize) -> Self {
        Self {
            system,
            window: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Append a message, evicting the oldest non-exempt messages past capacity.
    ///
    /// A system-role message replaces the exempt persona slot instead of
    /// entering the window. Returns the evicted messages, oldest first.
    pub fn append(&mut self, message: Message) -> Vec<Message> {
        if message.role == MessageRole::System {
            self.system = Some(message);
            return Vec::new();
        }

        self.window.push_back(message);

        let mut evicted = Vec::new();
        while self.window.len() > self.capacity.get() {
            if let Some(oldest) = self.window.pop_front() {
                evicted.push(oldest);
            }
        }
        if !evicted.is_empty() {
            tracing::debug!(
                evicted = evicted.len(),
                retained = self.window.len(),
                "Evicted oldest history messages"
            );
        }
        evicted
    }

    /// Current window in chronological order, system message first
    pub fn snapshot(&self) -> Vec<Message> {
        self.system
            .iter()
            .chain(self.window.iter())
            .cloned()
            .collect()
    }

    /// Reset to the exempt system message only
    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Number of non-exempt messages
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.system.as_ref()
    }
}
