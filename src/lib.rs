//! Grace - a conversational recipe assistant
//!
//! A conversation walks the user through ingredients, cuisine and
//! difficulty, fetches suggestion cards from the recipe backend, and then
//! handles the recipe detail view and feedback. The core is a pure state
//! machine; the runtime performs its effects against a [`gateway::RecipeGateway`]
//! and a [`presenter::Presenter`].

pub mod config;
pub mod gateway;
pub mod presenter;
pub mod runtime;
pub mod state_machine;
pub mod terminal;
pub mod voice;
