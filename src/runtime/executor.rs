//! Chat session executor

use super::traits::{InterruptSignal, ReadOutcome, Terminal};
use crate::history::{ConversationHistory, Message};
use crate::llm::{LlmMessage, LlmRequest, LlmService, Sampling};
use crate::moderation::ModerationGate;
use crate::state_machine::{transition, Effect, Event, Notice, TransitionError, TurnState};
use crate::transcript::TranscriptSink;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;

/// Chat runtime, generic over its terminal, transcript and interrupt source
pub struct ChatRuntime<T, S, I>
where
    T: Terminal,
    S: TranscriptSink,
    I: InterruptSignal,
{
    state: TurnState,
    history: ConversationHistory,
    gate: ModerationGate,
    llm: Arc<dyn LlmService>,
    sampling: Sampling,
    transcript: S,
    terminal: T,
    interrupt: I,
}

impl<T, S, I> ChatRuntime<T, S, I>
where
    T: Terminal,
    S: TranscriptSink,
    I: InterruptSignal,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        history: ConversationHistory,
        gate: ModerationGate,
        llm: Arc<dyn LlmService>,
        sampling: Sampling,
        transcript: S,
        terminal: T,
        interrupt: I,
    ) -> Self {
        Self {
            state: TurnState::default(),
            history,
            gate,
            llm,
            sampling,
            transcript,
            terminal,
            interrupt,
        }
    }

    #[allow(dead_code)] // Inspected by tests
    pub fn state(&self) -> &TurnState {
        &self.state
    }

    #[allow(dead_code)] // Inspected by tests
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Run the session until the user exits
    pub async fn run(&mut self) {
        tracing::info!(
            model = %self.llm.model_id(),
            max_history = self.history.capacity(),
            persona = self.history.system_message().is_some(),
            "Starting chat session"
        );
        self.terminal.show(&Notice::Greeting);

        while !self.state.is_terminal() {
            let event = match self.terminal.read_line().await {
                ReadOutcome::Line(text) => Event::Input {
                    text,
                    received_at: Utc::now(),
                },
                ReadOutcome::Interrupted => Event::Interrupt,
                ReadOutcome::Eof => Event::EndOfInput,
            };
            self.process_event(event).await;
        }

        tracing::info!("Chat session ended");
    }

    async fn process_event(&mut self, event: Event) {
        // Effects may generate follow-up events; handle them in order, no recursion
        let mut events = VecDeque::from([event]);

        while let Some(current) = events.pop_front() {
            let result = match transition(&self.state, current) {
                Ok(r) => r,
                Err(TransitionError::SessionClosed) => {
                    tracing::debug!("Event after exit ignored");
                    return;
                }
                Err(e) => {
                    tracing::error!(state = self.state.name(), error = %e, "Invalid transition");
                    self.state = TurnState::AwaitingInput;
                    return;
                }
            };

            let old_state = std::mem::replace(&mut self.state, result.new_state);
            if old_state.name() != self.state.name() {
                tracing::debug!(from = old_state.name(), to = self.state.name(), "State change");
            }

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    events.push_back(generated);
                }
            }
        }
    }

    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Moderate { text } => Some(self.moderate(&text).await),

            Effect::AppendHistory(message) => {
                self.history.append(message);
                None
            }

            Effect::ClearHistory => {
                if self.history.is_empty() {
                    tracing::debug!("Clear requested on empty history");
                } else {
                    let dropped = self.history.len();
                    self.history.clear();
                    tracing::info!(dropped, "Conversation history cleared");
                }
                None
            }

            Effect::RequestCompletion => Some(self.request_completion().await),

            Effect::RecordTranscript(message) => {
                // Transcript failures never end the session
                if let Err(e) = self.transcript.append(&message) {
                    tracing::error!(error = %e, role = message.role.as_str(), "Failed to record transcript");
                }
                None
            }

            Effect::Display(notice) => {
                self.terminal.show(&notice);
                None
            }

            Effect::Exit => {
                tracing::info!(messages = self.history.len(), "User ended the session");
                None
            }
        }
    }

    /// Run the moderation gate, racing Ctrl-C
    async fn moderate(&self, text: &str) -> Event {
        tokio::select! {
            biased;

            () = self.interrupt.interrupted() => {
                tracing::info!("Moderation cancelled by user");
                Event::ModerationCancelled
            }

            verdict = self.gate.check(text) => Event::ModerationChecked { verdict },
        }
    }

    /// Snapshot the history and call the completion client, racing Ctrl-C
    async fn request_completion(&self) -> Event {
        let request = LlmRequest {
            messages: self.history.snapshot().iter().map(LlmMessage::from).collect(),
            sampling: self.sampling,
        };

        tokio::select! {
            biased;

            () = self.interrupt.interrupted() => {
                tracing::info!("Completion cancelled by user");
                Event::CompletionCancelled
            }

            result = self.llm.complete(&request) => match result {
                Ok(response) => Event::CompletionSucceeded {
                    reply: Message::assistant(response.text),
                },
                Err(e) => Event::CompletionFailed {
                    message: e.message,
                    transient: e.kind.is_retryable(),
                },
            },
        }
    }
}
