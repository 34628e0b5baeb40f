//! Events that can occur in a conversation

use super::state::FieldName;
use crate::gateway::{ExpandedContent, GatewayError, Recipe, Suggestions};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    /// Open the conversation with the greeting
    Start,
    FieldCompleted {
        field: FieldName,
        value: String,
    },
    VoiceUtterance {
        transcript: String,
    },
    Action(UserAction),

    // Gateway events, tagged with the generation that issued the request
    SuggestionsReceived {
        generation: u64,
        suggestions: Suggestions,
    },
    SuggestionsFailed {
        generation: u64,
        error: GatewayError,
    },
    /// Image lookups for every card have settled
    CardsPrepared {
        generation: u64,
        cards: Vec<Recipe>,
    },
    RecipeLoaded {
        generation: u64,
        /// Id the recipe was requested under
        id: String,
        recipe: Recipe,
    },
    RecipeLoadFailed {
        generation: u64,
        id: String,
        error: GatewayError,
    },
    ExpandCompleted {
        generation: u64,
        id: String,
        content: ExpandedContent,
    },
    ExpandFailed {
        generation: u64,
        id: String,
        error: GatewayError,
    },
    FeedbackSubmitted {
        generation: u64,
        is_final: bool,
        outcome: Result<(), GatewayError>,
    },
    /// Rating delivery finished; the outcome does not matter to the user
    RecipeFeedbackSent {
        generation: u64,
    },
}

impl Event {
    /// Generation of the request this event answers, if it answers one
    pub fn generation(&self) -> Option<u64> {
        match self {
            Event::Start
            | Event::FieldCompleted { .. }
            | Event::VoiceUtterance { .. }
            | Event::Action(_) => None,
            Event::SuggestionsReceived { generation, .. }
            | Event::SuggestionsFailed { generation, .. }
            | Event::CardsPrepared { generation, .. }
            | Event::RecipeLoaded { generation, .. }
            | Event::RecipeLoadFailed { generation, .. }
            | Event::ExpandCompleted { generation, .. }
            | Event::ExpandFailed { generation, .. }
            | Event::FeedbackSubmitted { generation, .. }
            | Event::RecipeFeedbackSent { generation } => Some(*generation),
        }
    }
}

/// Controls a user can press that are not field answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    StartOver,
    /// Relax matching and ask for ingredients again
    Broaden,
    /// Repeat the last failed suggestions fetch
    Retry,
    OpenRecipe { id: String },
    BackToCards,
    /// Load the full recipe for the open detail view
    Expand,
    /// Stars as entered; anything above 5 is refused
    RateRecipe { rating: u32, comment: String },
}
