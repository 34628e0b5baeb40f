//! Effects produced by state transitions

use super::state::{ExpandControl, FieldName};
use crate::gateway::{FeedbackPayload, Recipe, SuggestionCriteria};
use crate::presenter::{Choice, FailureKind};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Abort every in-flight gateway task
    CancelPending,

    // Presentation
    Clear,
    Say(String),
    PromptChoice {
        field: FieldName,
        options: Vec<String>,
    },
    PromptText {
        field: FieldName,
        placeholder: String,
    },
    SetLoading(bool),
    ShowCards(Vec<Recipe>),
    ShowDetail {
        recipe: Recipe,
        expand: ExpandControl,
    },
    HideDetail,
    SetExpandControl(ExpandControl),
    ShowError(FailureKind),
    OfferChoices(Vec<Choice>),
    Notice(String),

    // Gateway calls (spawned as background tasks)
    FetchSuggestions {
        generation: u64,
        criteria: SuggestionCriteria,
    },
    /// Resolve card images, then report back with every card at once
    PrepareCards {
        generation: u64,
        cards: Vec<Recipe>,
        cuisine: String,
    },
    LoadRecipe {
        generation: u64,
        id: String,
    },
    ExpandRecipe {
        generation: u64,
        id: String,
    },
    SubmitFeedback {
        generation: u64,
        payload: FeedbackPayload,
    },
    /// Timestamped by the runtime when sent
    SubmitRecipeFeedback {
        generation: u64,
        rating: u8,
        comment: String,
        recipe: String,
    },
}

impl Effect {
    pub fn say(text: impl Into<String>) -> Self {
        Effect::Say(text.into())
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Effect::Notice(text.into())
    }

    pub fn prompt_text(field: FieldName, placeholder: impl Into<String>) -> Self {
        Effect::PromptText {
            field,
            placeholder: placeholder.into(),
        }
    }

    pub fn prompt_choice(field: FieldName, options: Vec<String>) -> Self {
        Effect::PromptChoice { field, options }
    }

    /// Whether this effect is a background gateway call
    pub fn is_gateway_call(&self) -> bool {
        matches!(
            self,
            Effect::FetchSuggestions { .. }
                | Effect::PrepareCards { .. }
                | Effect::LoadRecipe { .. }
                | Effect::ExpandRecipe { .. }
                | Effect::SubmitFeedback { .. }
                | Effect::SubmitRecipeFeedback { .. }
        )
    }
}
