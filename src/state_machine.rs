//! Session state machine
//!
//! Elm-style: a pure `transition(state, event)` returns the next state plus
//! a list of effects. The runtime executor performs the effects and feeds
//! their outcomes back in as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, Notice};
pub use event::{Command, Event};
pub use state::TurnState;
pub use transition::{transition, TransitionError, TransitionResult};
