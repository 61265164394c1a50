//! Persona system prompt
//!
//! The assistant is seeded with a single system message that fixes its
//! persona. It is exempt from history eviction and survives `clear`.

use crate::history::Message;

/// Default persona for the travel assistant
pub const TRAVEL_PERSONA: &str = "You are a helpful travel assistant. Provide friendly, informative advice about travel destinations, planning, and tips.";

/// Build the exempt system message for a configured persona.
///
/// Returns `None` when the persona is absent or blank, in which case the
/// conversation starts empty.
pub fn persona_message(prompt: Option<&str>) -> Option<Message> {
    let prompt = prompt.map(str::trim).filter(|p| !p.is_empty())?;
    Some(Message::system(prompt))
}
