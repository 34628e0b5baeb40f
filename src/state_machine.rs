//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! user and network events go in, a new state plus a list of effects comes
//! out, and the runtime performs the effects.

mod effect;
pub mod event;
pub mod funnel;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Event, UserAction};
pub use funnel::{advance, advance_named, feedback_step, FeedbackAction, NextAction, ValidationFailure};
pub use state::{
    ConversationContext, ConversationState, DetailView, Difficulty, ExpandControl,
    FeedbackStatus, FieldName, Latch, Offer, Step, UnknownField,
};
pub use transition::{transition, TransitionError, TransitionResult};
