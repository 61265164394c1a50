//! Mock implementations for testing
//!
//! These mocks enable integration testing of the session without real I/O.

use super::traits::*;
use super::ChatRuntime;
use crate::history::{ConversationHistory, Message};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::moderation::{
    CategoryPolicy, Classification, ModerationError, ModerationGate, ModerationService,
};
use crate::state_machine::Notice;
use crate::transcript::{TranscriptError, TranscriptSink};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a successful plain-text reply
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse {
            text: text.to_string(),
            finish_reason: Some("stop".to_string()),
            usage: Usage::default(),
        });
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// LLM client whose requests never finish
#[derive(Default)]
pub struct PendingLlmClient {
    started: Mutex<usize>,
}

impl PendingLlmClient {
    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }
}

#[async_trait]
impl LlmService for PendingLlmClient {
    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        *self.started.lock().unwrap() += 1;
        std::future::pending().await
    }

    fn model_id(&self) -> &str {
        "pending-model"
    }
}

// ============================================================================
// Mock Moderation Service
// ============================================================================

/// Moderation service returning queued classifications; clean when the queue is empty
#[derive(Default)]
pub struct MockModerationService {
    results: Mutex<VecDeque<Result<Classification, ModerationError>>>,
    inputs: Mutex<Vec<String>>,
}

impl MockModerationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_classification(&self, classification: Classification) {
        self.results.lock().unwrap().push_back(Ok(classification));
    }

    /// Queue a classification flagging the given categories
    pub fn queue_flagged(&self, categories: &[&str]) {
        self.queue_classification(Classification {
            flagged: true,
            categories: categories.iter().map(|c| ((*c).to_string(), true)).collect(),
            scores: categories.iter().map(|c| ((*c).to_string(), 0.9)).collect(),
        });
    }

    pub fn queue_error(&self, error: ModerationError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    /// Texts sent for classification, in order
    pub fn recorded_inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModerationService for MockModerationService {
    async fn classify(&self, text: &str) -> Result<Classification, ModerationError> {
        self.inputs.lock().unwrap().push(text.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Classification::default()))
    }
}

/// Moderation service that never answers
#[derive(Default)]
pub struct PendingModerationService {
    started: Mutex<usize>,
}

impl PendingModerationService {
    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }
}

#[async_trait]
impl ModerationService for PendingModerationService {
    async fn classify(&self, _text: &str) -> Result<Classification, ModerationError> {
        *self.started.lock().unwrap() += 1;
        std::future::pending().await
    }
}

// ============================================================================
// Transcript sinks
// ============================================================================

/// In-memory transcript; clones share the same records
#[derive(Clone, Default)]
pub struct MemoryTranscript {
    records: Arc<Mutex<Vec<Message>>>,
}

impl MemoryTranscript {
    pub fn records(&self) -> Vec<Message> {
        self.records.lock().unwrap().clone()
    }
}

impl TranscriptSink for MemoryTranscript {
    fn append(&mut self, message: &Message) -> Result<(), TranscriptError> {
        self.records.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Transcript whose every write fails
pub struct FailingTranscript;

impl TranscriptSink for FailingTranscript {
    fn append(&mut self, _message: &Message) -> Result<(), TranscriptError> {
        Err(TranscriptError::Write(std::io::Error::other("disk full")))
    }
}

// ============================================================================
// Terminal and interrupts
// ============================================================================

/// Terminal fed from a script; reports EOF once the script runs out
#[derive(Clone, Default)]
pub struct ScriptedTerminal {
    script: Arc<Mutex<VecDeque<ReadOutcome>>>,
    shown: Arc<Mutex<Vec<Notice>>>,
}

impl ScriptedTerminal {
    pub fn lines(lines: &[&str]) -> Self {
        let terminal = Self::default();
        for line in lines {
            terminal.push(ReadOutcome::Line((*line).to_string()));
        }
        terminal
    }

    pub fn push(&self, outcome: ReadOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    async fn read_line(&mut self) -> ReadOutcome {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ReadOutcome::Eof)
    }

    fn show(&mut self, notice: &Notice) {
        self.shown.lock().unwrap().push(notice.clone());
    }
}

pub struct NeverInterrupt;

#[async_trait]
impl InterruptSignal for NeverInterrupt {
    async fn interrupted(&self) {
        std::future::pending::<()>().await;
    }
}

/// Fires a fixed time after something starts waiting on it
pub struct InterruptAfter(pub Duration);

#[async_trait]
impl InterruptSignal for InterruptAfter {
    async fn interrupted(&self) {
        tokio::time::sleep(self.0).await;
    }
}

// ============================================================================
// Test session builder
// ============================================================================

pub const TEST_PERSONA: &str = "You are a test travel assistant.";

/// Build a session over mocks with the test persona
pub fn test_session<S: TranscriptSink, I: InterruptSignal>(
    llm: Arc<dyn LlmService>,
    moderation: Arc<dyn ModerationService>,
    terminal: ScriptedTerminal,
    transcript: S,
    interrupt: I,
    max_history: usize,
) -> ChatRuntime<ScriptedTerminal, S, I> {
    let history = ConversationHistory::new(
        Some(Message::system(TEST_PERSONA)),
        NonZeroUsize::new(max_history).unwrap(),
    );
    ChatRuntime::new(
        history,
        ModerationGate::new(moderation, CategoryPolicy::default()),
        llm,
        crate::llm::Sampling::default(),
        transcript,
        terminal,
        interrupt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use crate::state_machine::TurnState;

    struct Harness {
        llm: Arc<MockLlmClient>,
        moderation: Arc<MockModerationService>,
        terminal: ScriptedTerminal,
        transcript: MemoryTranscript,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                llm: Arc::new(MockLlmClient::new("test-model")),
                moderation: Arc::new(MockModerationService::new()),
                terminal: ScriptedTerminal::default(),
                transcript: MemoryTranscript::default(),
            }
        }

        fn runtime(
            &self,
            lines: &[&str],
            max_history: usize,
        ) -> ChatRuntime<ScriptedTerminal, MemoryTranscript, NeverInterrupt> {
            for line in lines {
                self.terminal.push(ReadOutcome::Line((*line).to_string()));
            }
            test_session(
                self.llm.clone(),
                self.moderation.clone(),
                self.terminal.clone(),
                self.transcript.clone(),
                NeverInterrupt,
                max_history,
            )
        }
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_mock_llm_client() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_text("Hello!");

        let request = LlmRequest {
            messages: vec![],
            sampling: crate::llm::Sampling::default(),
        };
        let response = llm.complete(&request).await.unwrap();
        assert_eq!(response.text, "Hello!");

        // Empty queue surfaces a network error
        assert!(llm.complete(&request).await.is_err());
        assert_eq!(llm.request_count(), 2);
    }

    /// Accepted message: one user and one assistant message in history, two transcript records
    #[tokio::test]
    async fn test_accepted_turn_updates_history_and_transcript() {
        let h = Harness::new();
        h.llm.queue_text("Coorg is a lovely weekend trip from Bangalore.");
        let mut rt = h.runtime(&["Suggest a weekend trip near Bangalore."], 20);

        rt.run().await;

        assert_eq!(rt.state(), &TurnState::Exited);
        assert_eq!(rt.history().len(), 2);
        let snapshot = rt.history().snapshot();
        assert_eq!(
            contents(&snapshot),
            vec![
                TEST_PERSONA,
                "Suggest a weekend trip near Bangalore.",
                "Coorg is a lovely weekend trip from Bangalore."
            ]
        );

        let records = h.transcript.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role, MessageRole::User);
        assert_eq!(records[1].role, MessageRole::Assistant);

        // The completion saw persona then user message
        let requests = h.llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        let roles: Vec<MessageRole> = requests[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::System, MessageRole::User]);

        let notices = h.terminal.notices();
        assert_eq!(notices.first(), Some(&Notice::Greeting));
        assert!(notices.contains(&Notice::Thinking));
        assert!(notices.contains(&Notice::Reply {
            text: "Coorg is a lovely weekend trip from Bangalore.".to_string()
        }));
        assert_eq!(notices.last(), Some(&Notice::Farewell));
    }

    #[tokio::test]
    async fn test_flagged_message_never_reaches_completion() {
        let h = Harness::new();
        h.moderation.queue_flagged(&["hate"]);
        let mut rt = h.runtime(&["something hateful"], 20);

        rt.run().await;

        assert!(rt.history().is_empty());
        assert!(h.transcript.records().is_empty());
        assert_eq!(h.llm.request_count(), 0);
        assert!(h.terminal.notices().contains(&Notice::Rejected {
            reason: "flagged for hate".to_string()
        }));
    }

    #[tokio::test]
    async fn test_rejected_message_absent_from_later_snapshots() {
        let h = Harness::new();
        h.moderation.queue_flagged(&["violence"]);
        h.llm.queue_text("Sure, here are some ideas.");
        let mut rt = h.runtime(&["violent text", "Ideas for Goa?"], 20);

        rt.run().await;

        let requests = h.llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .messages
            .iter()
            .all(|m| m.content != "violent text"));
    }

    #[tokio::test]
    async fn test_moderation_timeout_fails_closed() {
        let h = Harness::new();
        h.moderation
            .queue_error(ModerationError::Timeout("10s elapsed".to_string()));
        let mut rt = h.runtime(&["Is Paris nice in spring?"], 20);

        rt.run().await;

        assert!(rt.history().is_empty());
        assert_eq!(h.llm.request_count(), 0);
        assert!(h.terminal.notices().contains(&Notice::Rejected {
            reason: "moderation unavailable".to_string()
        }));
    }

    #[tokio::test]
    async fn test_full_history_evicts_oldest() {
        let h = Harness::new();
        h.llm.queue_text("r1");
        h.llm.queue_text("r2");
        h.llm.queue_text("r3");
        let mut rt = h.runtime(&["m1", "m2", "m3"], 4);

        rt.run().await;

        assert_eq!(rt.history().len(), 4);
        let snapshot = rt.history().snapshot();
        assert_eq!(contents(&snapshot), vec![TEST_PERSONA, "m2", "r2", "m3", "r3"]);

        // The transcript keeps everything
        assert_eq!(h.transcript.records().len(), 6);
    }

    #[tokio::test]
    async fn test_completion_failure_appends_no_reply() {
        let h = Harness::new();
        h.llm.queue_error(LlmError::auth("Authentication failed: bad key"));
        let mut rt = h.runtime(&["hello"], 20);

        rt.run().await;

        let snapshot = rt.history().snapshot();
        assert_eq!(contents(&snapshot), vec![TEST_PERSONA, "hello"]);
        assert!(snapshot.iter().all(|m| m.role != MessageRole::Assistant));

        let records = h.transcript.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].role, MessageRole::User);

        assert!(h.terminal.notices().contains(&Notice::CompletionFailed {
            message: "Authentication failed: bad key".to_string(),
            transient: false
        }));
    }

    #[tokio::test]
    async fn test_transcript_order_matches_turns() {
        let h = Harness::new();
        h.llm.queue_text("a1");
        h.llm.queue_error(LlmError::server_error("down"));
        h.llm.queue_text("a3");
        let mut rt = h.runtime(&["q1", "q2", "q3"], 20);

        rt.run().await;

        let records = h.transcript.records();
        assert_eq!(contents(&records), vec!["q1", "a1", "q2", "q3", "a3"]);
    }

    #[tokio::test]
    async fn test_clear_resets_history_but_not_transcript() {
        let h = Harness::new();
        h.llm.queue_text("a1");
        h.llm.queue_text("a2");
        let mut rt = h.runtime(&["q1", "Clear", "q2"], 20);

        rt.run().await;

        let snapshot = rt.history().snapshot();
        assert_eq!(contents(&snapshot), vec![TEST_PERSONA, "q2", "a2"]);
        assert_eq!(h.transcript.records().len(), 4);
        assert!(h.terminal.notices().contains(&Notice::HistoryCleared));

        // The second request no longer carries the first turn
        let requests = h.llm.recorded_requests();
        assert_eq!(requests[1].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_input_reprompts_without_moderation() {
        let h = Harness::new();
        let mut rt = h.runtime(&["", "   "], 20);

        rt.run().await;

        assert!(h.moderation.recorded_inputs().is_empty());
        let empties = h
            .terminal
            .notices()
            .into_iter()
            .filter(|n| *n == Notice::EmptyInput)
            .count();
        assert_eq!(empties, 2);
    }

    #[tokio::test]
    async fn test_exit_command_stops_reading() {
        let h = Harness::new();
        let mut rt = h.runtime(&["EXIT", "never read"], 20);

        rt.run().await;

        assert_eq!(rt.state(), &TurnState::Exited);
        assert!(h.moderation.recorded_inputs().is_empty());
        assert_eq!(h.terminal.notices().last(), Some(&Notice::Farewell));
    }

    #[tokio::test]
    async fn test_interrupt_at_prompt_exits() {
        let h = Harness::new();
        h.terminal.push(ReadOutcome::Interrupted);
        let mut rt = h.runtime(&["never read"], 20);

        rt.run().await;

        assert_eq!(rt.state(), &TurnState::Exited);
        assert!(h.moderation.recorded_inputs().is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_cancels_inflight_completion() {
        let llm = Arc::new(PendingLlmClient::default());
        let moderation = Arc::new(MockModerationService::new());
        let terminal = ScriptedTerminal::lines(&["Plan a trip to Kyoto"]);
        let transcript = MemoryTranscript::default();
        let mut rt = test_session(
            llm.clone(),
            moderation,
            terminal.clone(),
            transcript.clone(),
            InterruptAfter(Duration::from_millis(20)),
            20,
        );

        rt.run().await;

        assert_eq!(llm.started(), 1);
        assert!(terminal.notices().contains(&Notice::Cancelled));
        // The user message stays; no reply was added
        assert_eq!(rt.history().len(), 1);
        assert_eq!(transcript.records().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_cancels_pending_moderation() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        let moderation = Arc::new(PendingModerationService::default());
        let terminal = ScriptedTerminal::lines(&["Plan a trip to Kyoto"]);
        let transcript = MemoryTranscript::default();
        let mut rt = test_session(
            llm.clone(),
            moderation.clone(),
            terminal.clone(),
            transcript.clone(),
            InterruptAfter(Duration::from_millis(20)),
            20,
        );

        rt.run().await;

        assert_eq!(moderation.started(), 1);
        assert!(terminal.notices().contains(&Notice::Cancelled));
        assert_eq!(llm.request_count(), 0);
        // Never accepted, so nothing was kept
        assert!(rt.history().is_empty());
        assert!(transcript.records().is_empty());
        assert_eq!(rt.state(), &TurnState::Exited);
    }

    #[tokio::test]
    async fn test_transcript_failure_does_not_end_session() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("a1");
        llm.queue_text("a2");
        let terminal = ScriptedTerminal::lines(&["q1", "q2"]);
        let mut rt = test_session(
            llm.clone(),
            Arc::new(MockModerationService::new()),
            terminal.clone(),
            FailingTranscript,
            NeverInterrupt,
            20,
        );

        rt.run().await;

        assert_eq!(llm.request_count(), 2);
        assert_eq!(rt.history().len(), 4);
        assert_eq!(
            terminal
                .notices()
                .iter()
                .filter(|n| matches!(n, Notice::Reply { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let first = Harness::new();
        let second = Harness::new();
        first.llm.queue_text("one");
        let mut rt_a = first.runtime(&["hello"], 20);
        let mut rt_b = second.runtime(&[], 20);

        rt_a.run().await;
        rt_b.run().await;

        assert_eq!(rt_a.history().len(), 2);
        assert!(rt_b.history().is_empty());
        assert!(second.transcript.records().is_empty());
    }
}
