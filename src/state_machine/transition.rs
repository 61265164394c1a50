//! Pure state transition function

use super::{Command, Effect, Event, Notice, TurnState};
use crate::history::Message;
use crate::moderation::Verdict;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Session has already exited")]
    SessionClosed,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same state and event it always produces the same result and
/// performs no I/O. Timestamps arrive inside events.
pub fn transition(state: &TurnState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (TurnState::Exited, _) => Err(TransitionError::SessionClosed),

        // ============================================================
        // Prompt
        // ============================================================
        (TurnState::AwaitingInput, Event::Input { text, received_at }) => {
            let text = text.trim();
            match Command::parse(text) {
                Some(Command::Exit) => Ok(farewell()),
                Some(Command::Clear) => Ok(TransitionResult::new(TurnState::AwaitingInput)
                    .with_effect(Effect::ClearHistory)
                    .with_effect(Effect::display(Notice::HistoryCleared))),
                None if text.is_empty() => Ok(TransitionResult::new(TurnState::AwaitingInput)
                    .with_effect(Effect::display(Notice::EmptyInput))),
                None => {
                    let message = Message::user(text, received_at);
                    Ok(TransitionResult::new(TurnState::Moderating { message })
                        .with_effect(Effect::Moderate {
                            text: text.to_string(),
                        }))
                }
            }
        }

        (TurnState::AwaitingInput, Event::EndOfInput | Event::Interrupt) => Ok(farewell()),

        // ============================================================
        // Moderation
        // ============================================================
        (TurnState::Moderating { message }, Event::ModerationChecked { verdict }) => match verdict
        {
            Verdict::Accepted => Ok(TransitionResult::new(TurnState::Completing {
                message: message.clone(),
            })
            .with_effects([
                Effect::AppendHistory(message.clone()),
                Effect::display(Notice::Thinking),
                Effect::RequestCompletion,
            ])),
            Verdict::Rejected(rejection) => Ok(TransitionResult::new(TurnState::AwaitingInput)
                .with_effect(Effect::display(Notice::Rejected {
                    reason: rejection.reason(),
                }))),
        },

        // Never accepted, so nothing reaches history or the transcript
        (TurnState::Moderating { .. }, Event::ModerationCancelled) => {
            Ok(TransitionResult::new(TurnState::AwaitingInput)
                .with_effect(Effect::display(Notice::Cancelled)))
        }

        // ============================================================
        // Completion
        // ============================================================
        (TurnState::Completing { message }, Event::CompletionSucceeded { reply }) => {
            let text = reply.content.clone();
            Ok(TransitionResult::new(TurnState::AwaitingInput).with_effects([
                Effect::AppendHistory(reply.clone()),
                Effect::RecordTranscript(message.clone()),
                Effect::RecordTranscript(reply),
                Effect::display(Notice::Reply { text }),
            ]))
        }

        // The user message stays in history, so the transcript records it too
        (
            TurnState::Completing { message },
            Event::CompletionFailed {
                message: error,
                transient,
            },
        ) => Ok(TransitionResult::new(TurnState::AwaitingInput).with_effects([
            Effect::RecordTranscript(message.clone()),
            Effect::display(Notice::CompletionFailed {
                message: error,
                transient,
            }),
        ])),

        (TurnState::Completing { message }, Event::CompletionCancelled) => {
            Ok(TransitionResult::new(TurnState::AwaitingInput).with_effects([
                Effect::RecordTranscript(message.clone()),
                Effect::display(Notice::Cancelled),
            ]))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} on {}",
            state.name(),
            event_name(&event)
        ))),
    }
}

fn farewell() -> TransitionResult {
    TransitionResult::new(TurnState::Exited)
        .with_effect(Effect::display(Notice::Farewell))
        .with_effect(Effect::Exit)
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Input { .. } => "input",
        Event::EndOfInput => "end_of_input",
        Event::Interrupt => "interrupt",
        Event::ModerationChecked { .. } => "moderation_checked",
        Event::ModerationCancelled => "moderation_cancelled",
        Event::CompletionSucceeded { .. } => "completion_succeeded",
        Event::CompletionFailed { .. } => "completion_failed",
        Event::CompletionCancelled => "completion_cancelled",
    }
}
