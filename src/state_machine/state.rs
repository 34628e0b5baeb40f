//! Conversation state types

use crate::gateway::{FeedbackPayload, Recipe};
use crate::voice::VoiceInputBridge;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Field names
// ============================================================================

/// Every field a user can complete during a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Ingredients,
    Cuisine,
    Difficulty,
    Diet,
    Meal,
    Feedback,
    FinalFeedback,
}

impl FieldName {
    pub const ALL: [FieldName; 7] = [
        FieldName::Ingredients,
        FieldName::Cuisine,
        FieldName::Difficulty,
        FieldName::Diet,
        FieldName::Meal,
        FieldName::Feedback,
        FieldName::FinalFeedback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Ingredients => "ingredients",
            FieldName::Cuisine => "cuisine",
            FieldName::Difficulty => "difficulty",
            FieldName::Diet => "diet",
            FieldName::Meal => "meal",
            FieldName::Feedback => "feedback",
            FieldName::FinalFeedback => "final_feedback",
        }
    }

    /// Whether the field is one of the three required before a fetch
    pub fn is_funnel(self) -> bool {
        matches!(
            self,
            FieldName::Ingredients | FieldName::Cuisine | FieldName::Difficulty
        )
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field name that no part of the conversation knows about
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field: {0:?}")]
pub struct UnknownField(pub String);

impl FromStr for FieldName {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

// ============================================================================
// Difficulty
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Complex,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Moderate, Difficulty::Complex];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
            Difficulty::Complex => "complex",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| wanted.to_string())
    }
}

// ============================================================================
// Latch
// ============================================================================

/// One-shot guard: the first value written wins, later writes are no-ops.
///
/// Only [`ConversationState::reset`] clears a latch, so `is_set()` is true
/// exactly when the field has been written once in the current conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latch<T> {
    value: Option<T>,
}

impl<T> Default for Latch<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Latch<T> {
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Store `value` unless already latched. Returns whether this call won.
    pub fn try_set(&mut self, value: T) -> bool {
        if self.value.is_some() {
            return false;
        }
        self.value = Some(value);
        true
    }
}

// ============================================================================
// Steps, offers and the detail view
// ============================================================================

/// Position in the flow. Funnel answers are gated by latches and field
/// presence, not by the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Greeting,
    Ingredients,
    Cuisine,
    /// "Other" was chosen; waiting for a typed cuisine
    CuisineText,
    Difficulty,
    Fetching,
    Results,
    NoResults,
    FetchFailed,
    LoadingDetail,
    Detail,
    FinalFeedback,
    Done,
}

/// Options currently rendered for a field (what voice input can select from)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub field: FieldName,
    pub options: Vec<String>,
}

/// State of the "view full recipe" control on the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandControl {
    /// Recipe already complete; nothing to expand
    #[default]
    Hidden,
    Available,
    /// Request in flight; the control is disabled
    Loading,
    /// Last attempt failed; the control is enabled again for a retry
    Failed,
}

/// Where the conversational feedback sub-flow stands
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    NotGiven,
    /// A thin first reply was given; waiting for `final_feedback`
    AwaitingFinal,
    /// Submitted and not yet answered; further answers are ignored
    InFlight(FeedbackPayload),
    /// Last submission failed; the payload is kept for a retry
    Failed(FeedbackPayload),
    Sent,
}

/// Recipe currently open in the detail view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailView {
    pub recipe: Recipe,
    pub expand: ExpandControl,
}

impl DetailView {
    pub fn new(recipe: Recipe) -> Self {
        let expand = if recipe.needs_expansion() {
            ExpandControl::Available
        } else {
            ExpandControl::Hidden
        };
        Self { recipe, expand }
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// The single mutable record of a conversation's answers and guards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub ingredients: String,
    pub cuisine: Latch<String>,
    pub difficulty: Latch<Difficulty>,
    pub diet: String,
    pub meal: String,
    /// Relax matching on the next fetch only
    pub broaden: bool,
    pub step: Step,
    /// Bumped by every reset; responses tagged with an older value are stale
    pub generation: u64,
    pub fetch_in_flight: bool,
    /// Criteria of the last fetch that passed validation (for "try again")
    pub last_criteria: Option<crate::gateway::SuggestionCriteria>,
    pub cards: Vec<Recipe>,
    pub detail: Option<DetailView>,
    /// Id of the recipe requested from the backend and not yet answered
    pub loading_recipe: Option<String>,
    pub offer: Option<Offer>,
    pub feedback: String,
    pub final_feedback: String,
    pub feedback_status: FeedbackStatus,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_cuisine(&self) -> bool {
        self.cuisine.is_set()
    }

    pub fn selected_difficulty(&self) -> bool {
        self.difficulty.is_set()
    }

    /// Feedback is only asked for once suggestions have been shown
    pub fn recipes_shown(&self) -> bool {
        self.detail.is_some() || !self.cards.is_empty()
    }

    /// Clear every answer, latch and flag. Only the generation survives, and
    /// it moves forward so in-flight responses can be recognised as stale.
    pub fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    /// Read and clear the broaden flag in one step
    pub fn consume_broaden(&mut self) -> bool {
        std::mem::take(&mut self.broaden)
    }

    /// Snapshot of collected answers sent along with feedback
    pub fn answers(&self) -> crate::gateway::FeedbackContext {
        crate::gateway::FeedbackContext {
            ingredients: self.ingredients.clone(),
            cuisine: self.cuisine.get().cloned().unwrap_or_default(),
            diet: self.diet.clone(),
            difficulty: self.difficulty.get().copied(),
            meal: self.meal.clone(),
            recipe: self.detail.as_ref().map(|d| d.recipe.name.clone()),
        }
    }
}

// ============================================================================
// Conversation Context
// ============================================================================

/// Choice label that opens a free-text cuisine prompt instead of latching
pub const OTHER_CUISINE: &str = "Other";

/// Immutable per-conversation configuration
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub conversation_id: String,
    pub cuisines: Vec<String>,
    pub quick_ingredients: Vec<String>,
    pub voice: VoiceInputBridge,
}

impl ConversationContext {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            cuisines: ["Indian", "Italian", "Chinese", "Mediterranean", "Mexican"]
                .map(String::from)
                .to_vec(),
            quick_ingredients: ["Chicken", "Vegetables", "Pasta", "Rice", "Fish", "Eggs"]
                .map(String::from)
                .to_vec(),
            voice: VoiceInputBridge::new(),
        }
    }

    /// Cuisine buttons including the trailing "Other"
    pub fn cuisine_options(&self) -> Vec<String> {
        let mut options = self.cuisines.clone();
        options.push(OTHER_CUISINE.to_string());
        options
    }

    pub fn difficulty_options() -> Vec<String> {
        Difficulty::ALL.iter().map(|d| d.as_str().to_string()).collect()
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}
