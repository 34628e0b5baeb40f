//! Step controller: the ingredients → cuisine → difficulty funnel and the
//! two-step feedback sub-flow.
//!
//! The order is fixed. Already-latched steps are skipped rather than asked
//! again, and a second selection for a latched field changes nothing.

use super::state::{ConversationState, Difficulty, FieldName, Step, UnknownField};
use crate::gateway::SuggestionCriteria;
use thiserror::Error;

/// What the controller wants to happen after a field completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Field already latched; the input was a duplicate
    NoAction,
    PromptCuisine,
    PromptDifficulty,
    IssueFetch,
    /// Not a funnel field; a collaborator must handle it
    Unhandled(FieldName),
}

/// Input that cannot move the conversation forward
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Please tell me at least one ingredient")]
    EmptyIngredients,
    #[error("Please name a cuisine")]
    EmptyCuisine,
    #[error("{0:?} is not a difficulty; choose easy, moderate, or complex")]
    InvalidDifficulty(String),
    #[error("Missing before a search: {}", join_fields(.0))]
    MissingCriteria(Vec<FieldName>),
    #[error("Feedback cannot be empty")]
    EmptyFeedback,
    #[error("A rating must be between 1 and 5 stars, got {0}")]
    InvalidRating(u32),
    #[error("Add a star rating or a comment before sending")]
    EmptyRating,
}

fn join_fields(fields: &[FieldName]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Record a completed funnel field and decide the next step.
pub fn advance(
    state: &mut ConversationState,
    field: FieldName,
    value: &str,
) -> Result<NextAction, ValidationFailure> {
    let value = value.trim();
    match field {
        FieldName::Ingredients => {
            if value.is_empty() {
                return Err(ValidationFailure::EmptyIngredients);
            }
            state.ingredients = value.to_string();
            Ok(after_ingredients(state))
        }
        FieldName::Cuisine => {
            if state.selected_cuisine() {
                return Ok(NextAction::NoAction);
            }
            if value.is_empty() {
                return Err(ValidationFailure::EmptyCuisine);
            }
            state.cuisine.try_set(value.to_string());
            Ok(after_cuisine(state))
        }
        FieldName::Difficulty => {
            if state.selected_difficulty() {
                return Ok(NextAction::NoAction);
            }
            let difficulty: Difficulty = value
                .parse()
                .map_err(ValidationFailure::InvalidDifficulty)?;
            state.difficulty.try_set(difficulty);
            Ok(NextAction::IssueFetch)
        }
        other => Ok(NextAction::Unhandled(other)),
    }
}

/// [`advance`] for callers holding a field name as text
pub fn advance_named(
    state: &mut ConversationState,
    field: &str,
    value: &str,
) -> Result<Result<NextAction, ValidationFailure>, UnknownField> {
    let field: FieldName = field.parse()?;
    Ok(advance(state, field, value))
}

fn after_ingredients(state: &mut ConversationState) -> NextAction {
    if state.selected_cuisine() {
        return after_cuisine(state);
    }
    state.step = Step::Cuisine;
    NextAction::PromptCuisine
}

fn after_cuisine(state: &mut ConversationState) -> NextAction {
    if state.selected_difficulty() {
        return NextAction::IssueFetch;
    }
    state.step = Step::Difficulty;
    NextAction::PromptDifficulty
}

/// Build the body of a suggestions fetch, consuming the broaden flag.
///
/// Refuses when any required answer is missing; the state is left untouched
/// in that case, broaden flag included.
pub fn build_criteria(
    state: &mut ConversationState,
) -> Result<SuggestionCriteria, ValidationFailure> {
    let cuisine = state.cuisine.get().cloned();
    let difficulty = state.difficulty.get().copied();
    let mut missing = Vec::new();
    if state.ingredients.trim().is_empty() {
        missing.push(FieldName::Ingredients);
    }
    if cuisine.is_none() {
        missing.push(FieldName::Cuisine);
    }
    if difficulty.is_none() {
        missing.push(FieldName::Difficulty);
    }
    let (Some(cuisine), Some(difficulty), true) = (cuisine, difficulty, missing.is_empty()) else {
        return Err(ValidationFailure::MissingCriteria(missing));
    };

    Ok(SuggestionCriteria {
        ingredients: state.ingredients.clone(),
        cuisine,
        diet: state.diet.clone(),
        difficulty,
        meal: state.meal.clone(),
        broaden: state.consume_broaden(),
    })
}

// ============================================================================
// Feedback sub-flow
// ============================================================================

/// Replies too thin to count as feedback on their own
const NON_SUBSTANTIVE: [&str; 4] = ["okay", "ok", "fine", "yes"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackAction {
    /// Ask what could be improved before submitting anything
    PromptFinalFeedback,
    Submit { feedback: String, is_final: bool },
}

/// Decide what a `feedback` or `final_feedback` answer leads to.
///
/// Returns `None` for fields outside the feedback sub-flow.
pub fn feedback_step(
    field: FieldName,
    text: &str,
) -> Option<Result<FeedbackAction, ValidationFailure>> {
    let text = text.trim();
    let is_final = match field {
        FieldName::Feedback => false,
        FieldName::FinalFeedback => true,
        _ => return None,
    };
    if text.is_empty() {
        return Some(Err(ValidationFailure::EmptyFeedback));
    }
    let lowered = text.to_lowercase();
    if !is_final && NON_SUBSTANTIVE.contains(&lowered.as_str()) {
        return Some(Ok(FeedbackAction::PromptFinalFeedback));
    }
    Some(Ok(FeedbackAction::Submit {
        feedback: text.to_string(),
        is_final,
    }))
}
