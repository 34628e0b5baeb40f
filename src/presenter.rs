//! Rendering boundary
//!
//! The conversation never touches a screen directly. Everything it shows
//! goes through a [`Presenter`], and every control the presenter renders
//! answers back through the runtime handle.

use crate::gateway::Recipe;
use crate::state_machine::{FieldName, UserAction, ValidationFailure};
use std::fmt;
use std::sync::Arc;

pub use crate::state_machine::ExpandControl;

/// Shown for a card whose image could not be resolved
pub const PLACEHOLDER_IMAGE: &str = "/static/images/spaghetti.jpg";

/// Backend operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchSuggestions,
    LoadRecipe,
    ExpandRecipe,
    SubmitFeedback,
}

impl Operation {
    fn describe(self) -> &'static str {
        match self {
            Operation::FetchSuggestions => "getting recipes",
            Operation::LoadRecipe => "loading the recipe",
            Operation::ExpandRecipe => "loading the full recipe",
            Operation::SubmitFeedback => "saving your feedback",
        }
    }
}

/// Why something the user asked for did not happen.
///
/// A search that matched nothing is not a failure and has no variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Transport {
        operation: Operation,
        message: String,
    },
    Validation(ValidationFailure),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport { operation, .. } => {
                write!(f, "Sorry, there was an error {}.", operation.describe())
            }
            FailureKind::Validation(failure) => write!(f, "{failure}"),
        }
    }
}

/// Recovery controls offered after something went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Broaden,
    StartOver,
    Retry,
    BackToCards,
}

impl Choice {
    pub fn label(self) -> &'static str {
        match self {
            Choice::Broaden => "Broaden ingredients",
            Choice::StartOver => "Start over",
            Choice::Retry => "Try again",
            Choice::BackToCards => "Back to recipes",
        }
    }

    pub fn action(self) -> UserAction {
        match self {
            Choice::Broaden => UserAction::Broaden,
            Choice::StartOver => UserAction::StartOver,
            Choice::Retry => UserAction::Retry,
            Choice::BackToCards => UserAction::BackToCards,
        }
    }
}

/// Renders the conversation.
///
/// Calls arrive in the order the conversation decided on them and must not
/// block; a presenter that needs to do I/O should queue it.
pub trait Presenter: Send + Sync {
    /// Remove every message, prompt, card and detail view
    fn clear(&self);

    /// A message from Grace
    fn say(&self, text: &str);

    /// Buttons for a field; picking one completes the field with its label
    fn prompt_choice(&self, field: FieldName, options: &[String]);

    /// A text input for a field
    fn prompt_text(&self, field: FieldName, placeholder: &str);

    fn set_loading(&self, loading: bool);

    fn show_cards(&self, cards: &[Recipe]);

    fn show_detail(&self, recipe: &Recipe, expand: ExpandControl);

    fn hide_detail(&self);

    fn set_expand_control(&self, control: ExpandControl);

    fn show_error(&self, failure: &FailureKind);

    fn offer_choices(&self, choices: &[Choice]);

    /// Short transient status line
    fn notice(&self, text: &str);
}

impl<T: Presenter + ?Sized> Presenter for Arc<T> {
    fn clear(&self) {
        (**self).clear();
    }

    fn say(&self, text: &str) {
        (**self).say(text);
    }

    fn prompt_choice(&self, field: FieldName, options: &[String]) {
        (**self).prompt_choice(field, options);
    }

    fn prompt_text(&self, field: FieldName, placeholder: &str) {
        (**self).prompt_text(field, placeholder);
    }

    fn set_loading(&self, loading: bool) {
        (**self).set_loading(loading);
    }

    fn show_cards(&self, cards: &[Recipe]) {
        (**self).show_cards(cards);
    }

    fn show_detail(&self, recipe: &Recipe, expand: ExpandControl) {
        (**self).show_detail(recipe, expand);
    }

    fn hide_detail(&self) {
        (**self).hide_detail();
    }

    fn set_expand_control(&self, control: ExpandControl) {
        (**self).set_expand_control(control);
    }

    fn show_error(&self, failure: &FailureKind) {
        (**self).show_error(failure);
    }

    fn offer_choices(&self, choices: &[Choice]) {
        (**self).offer_choices(choices);
    }

    fn notice(&self, text: &str) {
        (**self).notice(text);
    }
}

/// Image to render for a card
pub fn card_image(recipe: &Recipe) -> &str {
    if recipe.image.trim().is_empty() {
        PLACEHOLDER_IMAGE
    } else {
        &recipe.image
    }
}
