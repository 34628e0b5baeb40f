//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. No I/O happens here; gateway calls leave as
//! effects and come back as events tagged with the generation that issued
//! them.

use super::effect::Effect;
use super::event::{Event, UserAction};
use super::funnel::{
    advance, build_criteria, feedback_step, FeedbackAction, NextAction, ValidationFailure,
};
use super::state::{
    ConversationContext, ConversationState, DetailView, ExpandControl, FeedbackStatus, FieldName,
    Offer, Step, OTHER_CUISINE,
};
use crate::gateway::{ExpandedContent, FeedbackPayload, GatewayError, Recipe, Suggestions};
use crate::presenter::{Choice, FailureKind, Operation};
use crate::voice::VoiceResolution;
use thiserror::Error;

pub const GREETING: &str =
    "Hi, I'm Grace, your recipe assistant! Tell me what ingredients you have.";
const INGREDIENTS_PLACEHOLDER: &str = "Type ingredients (e.g., chicken, tomato, onion)";
const BROADEN_PLACEHOLDER: &str = "Enter more or fewer ingredients (comma separated)";
const CUISINE_QUESTION: &str = "Great! Which cuisine are you in the mood for?";
const CUISINE_TEXT_QUESTION: &str =
    "Please type the cuisine you prefer (e.g., Moroccan, Thai, African).";
const CUISINE_PLACEHOLDER: &str = "Type a cuisine";
const DIFFICULTY_QUESTION: &str = "Would you like an easy, moderate, or complex recipe?";
const FETCHING: &str = "Perfect! Let me find some recipes for you.";
const CARDS_READY: &str = "Here are some recipes you might like. Pick one to see the details.";
const NO_RESULTS: &str =
    "I couldn't find recipes that match those ingredients and filters. Want to try different ingredients?";
const FEEDBACK_QUESTION: &str = "How did I do? Let me know what you think of these suggestions.";
const FEEDBACK_PLACEHOLDER: &str = "Your thoughts on the suggestions";
const FINAL_FEEDBACK_QUESTION: &str =
    "Thank you! Please tell me what I could do better next time.";
const FINAL_FEEDBACK_PLACEHOLDER: &str = "What should I improve?";
const FEEDBACK_SAVED: &str = "Thank you! Your feedback was saved.";
const FEEDBACK_NOT_SAVED: &str = "Sorry, I could not save your feedback.";
const NOT_UNDERSTOOD: &str = "Sorry, I didn't catch that. Try again or type your answer.";
const RATING_THANKS: &str = "Thank you for your feedback!";
const UNKNOWN_RECIPE: &str = "Unknown Recipe";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
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

    /// Run a follow-up transition on the new state, keeping both effect lists
    fn then(
        self,
        step: impl FnOnce(&ConversationState) -> Result<TransitionResult, TransitionError>,
    ) -> Result<Self, TransitionError> {
        let next = step(&self.new_state)?;
        Ok(TransitionResult {
            new_state: next.new_state,
            effects: self.effects.into_iter().chain(next.effects).collect(),
        })
    }
}

/// Errors that can occur during transition. The state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A recipe search is already in progress")]
    FetchInFlight,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ConversationState,
    context: &ConversationContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if let Some(generation) = event.generation() {
        if generation != state.generation {
            tracing::debug!(
                conversation_id = %context.conversation_id,
                stale = generation,
                current = state.generation,
                "Discarding response from before a reset"
            );
            return Ok(TransitionResult::new(state.clone()));
        }
    }

    match event {
        // ============================================================
        // Conversation lifecycle
        // ============================================================
        Event::Start => {
            if state.step != Step::Greeting {
                return Err(TransitionError::InvalidTransition(
                    "conversation already started".to_string(),
                ));
            }
            Ok(greet(state.clone(), context))
        }

        Event::Action(UserAction::StartOver) => {
            let mut next = state.clone();
            next.reset();
            TransitionResult::new(next)
                .with_effect(Effect::CancelPending)
                .with_effect(Effect::Clear)
                .then(|reset| Ok(greet(reset.clone(), context)))
        }

        // ============================================================
        // User input
        // ============================================================
        Event::FieldCompleted { field, value } => field_completed(state, context, field, &value),

        Event::VoiceUtterance { transcript } => voice_utterance(state, context, &transcript),

        // ============================================================
        // Suggestions
        // ============================================================
        Event::Action(UserAction::Broaden) => {
            if state.step != Step::NoResults {
                return Err(TransitionError::InvalidTransition(
                    "broaden is only offered after an empty result".to_string(),
                ));
            }
            let mut next = state.clone();
            next.broaden = true;
            next.step = Step::Ingredients;
            next.offer = None;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::prompt_text(FieldName::Ingredients, BROADEN_PLACEHOLDER)))
        }

        Event::Action(UserAction::Retry) => retry(state),

        Event::SuggestionsReceived { suggestions, .. } => {
            expect_fetching(state)?;
            let mut next = state.clone();
            match suggestions {
                Suggestions::Empty => {
                    next.fetch_in_flight = false;
                    next.step = Step::NoResults;
                    Ok(TransitionResult::new(next).with_effects([
                        Effect::SetLoading(false),
                        Effect::say(NO_RESULTS),
                        Effect::OfferChoices(vec![Choice::Broaden, Choice::StartOver]),
                    ]))
                }
                Suggestions::Cards(cards) => {
                    // Stays in flight until every card image has settled
                    let cuisine = state.cuisine.get().cloned().unwrap_or_default();
                    let generation = state.generation;
                    Ok(TransitionResult::new(next).with_effect(Effect::PrepareCards {
                        generation,
                        cards,
                        cuisine,
                    }))
                }
            }
        }

        Event::CardsPrepared { cards, .. } => {
            expect_fetching(state)?;
            let mut next = state.clone();
            next.fetch_in_flight = false;
            next.step = Step::Results;
            next.cards.clone_from(&cards);
            Ok(TransitionResult::new(next).with_effects([
                Effect::SetLoading(false),
                Effect::say(CARDS_READY),
                Effect::ShowCards(cards),
            ]))
        }

        Event::SuggestionsFailed { error, .. } => {
            expect_fetching(state)?;
            let mut next = state.clone();
            next.fetch_in_flight = false;
            next.step = Step::FetchFailed;
            Ok(TransitionResult::new(next).with_effects([
                Effect::SetLoading(false),
                Effect::ShowError(transport(Operation::FetchSuggestions, &error)),
                Effect::OfferChoices(vec![Choice::Retry, Choice::StartOver]),
            ]))
        }

        // ============================================================
        // Recipe detail
        // ============================================================
        Event::Action(UserAction::OpenRecipe { id }) => {
            if let Some(card) = state.cards.iter().find(|c| c.id == id) {
                return Ok(open_detail(state.clone(), card.clone()));
            }
            // Not among the cards on screen; ask the backend for it
            let mut next = state.clone();
            next.step = Step::LoadingDetail;
            next.detail = None;
            next.loading_recipe = Some(id.clone());
            let generation = next.generation;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::SetLoading(true))
                .with_effect(Effect::LoadRecipe { generation, id }))
        }

        Event::RecipeLoaded { id, recipe, .. } => {
            if !is_loading(state, &id) {
                tracing::debug!(recipe_id = %id, "Recipe arrived after the user moved on");
                return Ok(TransitionResult::new(state.clone()));
            }
            Ok(open_detail(state.clone(), recipe).with_effect(Effect::SetLoading(false)))
        }

        Event::RecipeLoadFailed { id, error, .. } => {
            if !is_loading(state, &id) {
                tracing::debug!(recipe_id = %id, "Recipe load failed after the user moved on");
                return Ok(TransitionResult::new(state.clone()));
            }
            let mut next = state.clone();
            next.loading_recipe = None;
            next.step = Step::Results;
            let mut choices = Vec::new();
            if !next.cards.is_empty() {
                choices.push(Choice::BackToCards);
            }
            choices.push(Choice::StartOver);
            Ok(TransitionResult::new(next).with_effects([
                Effect::SetLoading(false),
                Effect::ShowError(transport(Operation::LoadRecipe, &error)),
                Effect::OfferChoices(choices),
            ]))
        }

        Event::Action(UserAction::BackToCards) => {
            let mut next = state.clone();
            next.detail = None;
            next.step = Step::Results;
            let abandoned_load = next.loading_recipe.take().is_some();
            let cards = next.cards.clone();
            let mut result = TransitionResult::new(next);
            if abandoned_load {
                result = result.with_effect(Effect::SetLoading(false));
            }
            Ok(result
                .with_effect(Effect::HideDetail)
                .with_effect(Effect::ShowCards(cards)))
        }

        Event::Action(UserAction::Expand) => {
            let Some(detail) = &state.detail else {
                return Err(TransitionError::InvalidTransition(
                    "no recipe is open".to_string(),
                ));
            };
            match detail.expand {
                ExpandControl::Available | ExpandControl::Failed => {
                    let id = detail.recipe.id.clone();
                    let mut next = state.clone();
                    if let Some(detail) = next.detail.as_mut() {
                        detail.expand = ExpandControl::Loading;
                    }
                    let generation = next.generation;
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::SetExpandControl(ExpandControl::Loading))
                        .with_effect(Effect::ExpandRecipe { generation, id }))
                }
                // Disabled while loading, absent once complete
                ExpandControl::Loading | ExpandControl::Hidden => {
                    Ok(TransitionResult::new(state.clone()))
                }
            }
        }

        Event::ExpandCompleted { id, content, .. } => Ok(expand_completed(state, &id, content)),

        Event::ExpandFailed { id, error, .. } => {
            if !is_expanding(state, &id) {
                return Ok(TransitionResult::new(state.clone()));
            }
            let mut next = state.clone();
            if let Some(detail) = next.detail.as_mut() {
                detail.expand = ExpandControl::Failed;
            }
            Ok(TransitionResult::new(next).with_effects([
                Effect::SetExpandControl(ExpandControl::Failed),
                Effect::ShowError(transport(Operation::ExpandRecipe, &error)),
            ]))
        }

        // ============================================================
        // Feedback
        // ============================================================
        Event::Action(UserAction::RateRecipe { rating, comment }) => {
            Ok(rate_recipe(state, rating, &comment))
        }

        Event::RecipeFeedbackSent { .. } => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::notice(RATING_THANKS)))
        }

        Event::FeedbackSubmitted { is_final, outcome, .. } => {
            let FeedbackStatus::InFlight(payload) = &state.feedback_status else {
                tracing::debug!("Feedback outcome with no submission in flight");
                return Ok(TransitionResult::new(state.clone()));
            };
            let mut next = state.clone();
            next.step = Step::Done;
            match outcome {
                Ok(()) => {
                    next.feedback_status = FeedbackStatus::Sent;
                    let mut result =
                        TransitionResult::new(next).with_effect(Effect::say(FEEDBACK_SAVED));
                    if is_final {
                        result = result.with_effect(Effect::say("Goodbye! I'll keep learning."));
                    }
                    Ok(result.with_effect(Effect::OfferChoices(vec![Choice::StartOver])))
                }
                Err(error) => {
                    next.feedback_status = FeedbackStatus::Failed(payload.clone());
                    Ok(TransitionResult::new(next).with_effects([
                        Effect::ShowError(transport(Operation::SubmitFeedback, &error)),
                        Effect::say(FEEDBACK_NOT_SAVED),
                        Effect::OfferChoices(vec![Choice::Retry, Choice::StartOver]),
                    ]))
                }
            }
        }
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn greet(mut state: ConversationState, context: &ConversationContext) -> TransitionResult {
    let prompts = prompt_ingredients(&mut state, context);
    TransitionResult::new(state)
        .with_effect(Effect::say(GREETING))
        .with_effects(prompts)
}

fn prompt_ingredients(state: &mut ConversationState, context: &ConversationContext) -> Vec<Effect> {
    state.step = Step::Ingredients;
    offer(state, FieldName::Ingredients, context.quick_ingredients.clone());
    vec![
        Effect::prompt_text(FieldName::Ingredients, INGREDIENTS_PLACEHOLDER),
        Effect::prompt_choice(FieldName::Ingredients, context.quick_ingredients.clone()),
    ]
}

fn prompt_cuisine(state: &mut ConversationState, context: &ConversationContext) -> Vec<Effect> {
    state.step = Step::Cuisine;
    let options = context.cuisine_options();
    offer(state, FieldName::Cuisine, options.clone());
    vec![
        Effect::say(CUISINE_QUESTION),
        Effect::prompt_choice(FieldName::Cuisine, options),
    ]
}

fn prompt_cuisine_text(state: &mut ConversationState) -> Vec<Effect> {
    state.step = Step::CuisineText;
    state.offer = None;
    vec![
        Effect::say(CUISINE_TEXT_QUESTION),
        Effect::prompt_text(FieldName::Cuisine, CUISINE_PLACEHOLDER),
    ]
}

fn prompt_difficulty(state: &mut ConversationState) -> Vec<Effect> {
    state.step = Step::Difficulty;
    let options = ConversationContext::difficulty_options();
    offer(state, FieldName::Difficulty, options.clone());
    vec![
        Effect::say(DIFFICULTY_QUESTION),
        Effect::prompt_choice(FieldName::Difficulty, options),
    ]
}

fn prompt_final_feedback(state: &mut ConversationState) -> Vec<Effect> {
    state.step = Step::FinalFeedback;
    state.offer = None;
    vec![
        Effect::say(FINAL_FEEDBACK_QUESTION),
        Effect::prompt_text(FieldName::FinalFeedback, FINAL_FEEDBACK_PLACEHOLDER),
    ]
}

fn offer(state: &mut ConversationState, field: FieldName, options: Vec<String>) {
    state.offer = Some(Offer { field, options });
}

/// Ask for `field` again after input that could not be used
fn reprompt(
    state: &mut ConversationState,
    context: &ConversationContext,
    field: FieldName,
) -> Vec<Effect> {
    match field {
        FieldName::Ingredients => prompt_ingredients(state, context),
        FieldName::Cuisine if state.step == Step::CuisineText => prompt_cuisine_text(state),
        FieldName::Cuisine => prompt_cuisine(state, context),
        FieldName::Difficulty => prompt_difficulty(state),
        FieldName::Feedback => vec![Effect::prompt_text(FieldName::Feedback, FEEDBACK_PLACEHOLDER)],
        FieldName::FinalFeedback => prompt_final_feedback(state),
        FieldName::Diet | FieldName::Meal => vec![],
    }
}

fn validation_failed(
    mut state: ConversationState,
    context: &ConversationContext,
    field: FieldName,
    failure: ValidationFailure,
) -> TransitionResult {
    let prompts = reprompt(&mut state, context, field);
    TransitionResult::new(state)
        .with_effect(Effect::ShowError(FailureKind::Validation(failure)))
        .with_effects(prompts)
}

fn transport(operation: Operation, error: &GatewayError) -> FailureKind {
    FailureKind::Transport {
        operation,
        message: error.message.clone(),
    }
}

// ============================================================================
// Field completion
// ============================================================================

fn field_completed(
    state: &ConversationState,
    context: &ConversationContext,
    field: FieldName,
    value: &str,
) -> Result<TransitionResult, TransitionError> {
    match field {
        FieldName::Diet | FieldName::Meal => {
            let mut next = state.clone();
            let value = value.trim().to_string();
            if field == FieldName::Diet {
                next.diet = value;
            } else {
                next.meal = value;
            }
            Ok(TransitionResult::new(next))
        }

        FieldName::Feedback | FieldName::FinalFeedback => feedback(state, context, field, value),

        FieldName::Cuisine
            if !state.selected_cuisine() && value.trim().eq_ignore_ascii_case(OTHER_CUISINE) =>
        {
            let mut next = state.clone();
            let prompts = prompt_cuisine_text(&mut next);
            Ok(TransitionResult::new(next).with_effects(prompts))
        }

        FieldName::Ingredients | FieldName::Cuisine | FieldName::Difficulty => {
            let mut next = state.clone();
            match advance(&mut next, field, value) {
                Ok(NextAction::NoAction) => {
                    tracing::debug!(field = %field, "Field already answered, ignoring");
                    Ok(TransitionResult::new(state.clone()))
                }
                Ok(NextAction::PromptCuisine) => {
                    let prompts = prompt_cuisine(&mut next, context);
                    Ok(TransitionResult::new(next).with_effects(prompts))
                }
                Ok(NextAction::PromptDifficulty) => {
                    let prompts = prompt_difficulty(&mut next);
                    Ok(TransitionResult::new(next).with_effects(prompts))
                }
                Ok(NextAction::IssueFetch) => issue_fetch(next, context),
                Ok(NextAction::Unhandled(other)) => Err(TransitionError::InvalidTransition(
                    format!("{other} is not part of the search"),
                )),
                Err(failure) => Ok(validation_failed(state.clone(), context, field, failure)),
            }
        }
    }
}

/// Start a suggestions fetch, or explain what is still missing
fn issue_fetch(
    mut next: ConversationState,
    context: &ConversationContext,
) -> Result<TransitionResult, TransitionError> {
    if next.fetch_in_flight {
        return Err(TransitionError::FetchInFlight);
    }
    match build_criteria(&mut next) {
        Ok(criteria) => {
            tracing::info!(
                conversation_id = %context.conversation_id,
                cuisine = %criteria.cuisine,
                difficulty = %criteria.difficulty,
                broaden = criteria.broaden,
                "Searching for recipes"
            );
            next.fetch_in_flight = true;
            next.step = Step::Fetching;
            next.offer = None;
            next.detail = None;
            next.loading_recipe = None;
            next.cards.clear();
            next.last_criteria = Some(criteria.clone());
            let generation = next.generation;
            Ok(TransitionResult::new(next).with_effects([
                Effect::HideDetail,
                Effect::say(FETCHING),
                Effect::SetLoading(true),
                Effect::FetchSuggestions {
                    generation,
                    criteria,
                },
            ]))
        }
        Err(failure) => {
            let first_missing = match &failure {
                ValidationFailure::MissingCriteria(fields) => fields.first().copied(),
                _ => None,
            };
            let field = first_missing.unwrap_or(FieldName::Ingredients);
            Ok(validation_failed(next, context, field, failure))
        }
    }
}

/// Repeat the last search, or a failed feedback submission
fn retry(state: &ConversationState) -> Result<TransitionResult, TransitionError> {
    if state.step != Step::FetchFailed {
        if let FeedbackStatus::Failed(payload) = &state.feedback_status {
            return Ok(send_feedback(state.clone(), payload.clone()));
        }
        return Err(TransitionError::InvalidTransition(
            "nothing to retry".to_string(),
        ));
    }
    if state.fetch_in_flight {
        return Err(TransitionError::FetchInFlight);
    }
    let Some(mut criteria) = state.last_criteria.clone() else {
        return Err(TransitionError::InvalidTransition(
            "no earlier search to retry".to_string(),
        ));
    };
    // The failed attempt already used up any broaden request
    criteria.broaden = false;

    let mut next = state.clone();
    next.broaden = false;
    next.fetch_in_flight = true;
    next.step = Step::Fetching;
    let generation = next.generation;
    Ok(TransitionResult::new(next).with_effects([
        Effect::SetLoading(true),
        Effect::FetchSuggestions {
            generation,
            criteria,
        },
    ]))
}

fn expect_fetching(state: &ConversationState) -> Result<(), TransitionError> {
    if state.fetch_in_flight {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition(
            "no recipe search in flight".to_string(),
        ))
    }
}

// ============================================================================
// Voice
// ============================================================================

fn voice_utterance(
    state: &ConversationState,
    context: &ConversationContext,
    transcript: &str,
) -> Result<TransitionResult, TransitionError> {
    let accepts_ingredients = state.step == Step::Ingredients;
    match context
        .voice
        .resolve(transcript, state.offer.as_ref(), accepts_ingredients)
    {
        VoiceResolution::Selected { field, labels } => {
            let result = TransitionResult::new(state.clone())
                .with_effect(Effect::notice(format!("Selected: {}", labels.join(", "))));
            if field == FieldName::Ingredients {
                let value = labels
                    .iter()
                    .map(|label| label.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(", ");
                return result.then(|s| field_completed(s, context, field, &value));
            }
            // One completion per label; latches make every one after the first a no-op
            labels.iter().try_fold(result, |acc, label| {
                acc.then(|s| field_completed(s, context, field, label))
            })
        }
        VoiceResolution::FreeText(text) => {
            field_completed(state, context, FieldName::Ingredients, &text)
        }
        VoiceResolution::NotUnderstood => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::notice(NOT_UNDERSTOOD)))
        }
    }
}

// ============================================================================
// Detail view
// ============================================================================

fn open_detail(mut state: ConversationState, recipe: Recipe) -> TransitionResult {
    let view = DetailView::new(recipe.clone());
    let expand = view.expand;
    state.step = Step::Detail;
    state.detail = Some(view);
    state.loading_recipe = None;
    state.offer = None;
    TransitionResult::new(state).with_effects([
        Effect::ShowDetail { recipe, expand },
        Effect::say(FEEDBACK_QUESTION),
        Effect::prompt_text(FieldName::Feedback, FEEDBACK_PLACEHOLDER),
    ])
}

fn is_loading(state: &ConversationState, id: &str) -> bool {
    state.step == Step::LoadingDetail && state.loading_recipe.as_deref() == Some(id)
}

fn is_expanding(state: &ConversationState, id: &str) -> bool {
    state
        .detail
        .as_ref()
        .is_some_and(|d| d.recipe.id == id && d.expand == ExpandControl::Loading)
}

fn expand_completed(state: &ConversationState, id: &str, content: ExpandedContent) -> TransitionResult {
    if !is_expanding(state, id) {
        tracing::debug!(recipe_id = %id, "Expanded recipe no longer on screen");
        return TransitionResult::new(state.clone());
    }
    let mut next = state.clone();
    let mut effects = Vec::new();
    if let Some(detail) = next.detail.as_mut() {
        detail.recipe.apply_expansion(content);
        detail.expand = ExpandControl::Hidden;
        if let Some(card) = next.cards.iter_mut().find(|c| c.id == id) {
            card.clone_from(&detail.recipe);
        }
        effects.push(Effect::ShowDetail {
            recipe: detail.recipe.clone(),
            expand: ExpandControl::Hidden,
        });
    }
    TransitionResult::new(next).with_effects(effects)
}

// ============================================================================
// Feedback
// ============================================================================

fn feedback(
    state: &ConversationState,
    context: &ConversationContext,
    field: FieldName,
    text: &str,
) -> Result<TransitionResult, TransitionError> {
    let Some(step) = feedback_step(field, text) else {
        return Err(TransitionError::InvalidTransition(format!(
            "{field} is not a feedback field"
        )));
    };
    match (&state.feedback_status, field) {
        (FeedbackStatus::InFlight(_), _) => {
            tracing::debug!(field = %field, "Feedback already being sent, ignoring");
            return Ok(TransitionResult::new(state.clone()));
        }
        (FeedbackStatus::NotGiven, FieldName::Feedback) if state.recipes_shown() => {}
        (FeedbackStatus::AwaitingFinal, FieldName::FinalFeedback) => {}
        (FeedbackStatus::NotGiven, FieldName::Feedback) => {
            return Err(TransitionError::InvalidTransition(
                "feedback is asked for once recipes are shown".to_string(),
            ));
        }
        _ => {
            return Err(TransitionError::InvalidTransition(format!(
                "{field} is not expected now"
            )));
        }
    }

    let mut next = state.clone();
    match step {
        Ok(FeedbackAction::PromptFinalFeedback) => {
            next.feedback = text.trim().to_string();
            next.feedback_status = FeedbackStatus::AwaitingFinal;
            let prompts = prompt_final_feedback(&mut next);
            Ok(TransitionResult::new(next).with_effects(prompts))
        }
        Ok(FeedbackAction::Submit { feedback, is_final }) => {
            if is_final {
                next.final_feedback.clone_from(&feedback);
            } else {
                next.feedback.clone_from(&feedback);
            }
            let payload = FeedbackPayload {
                feedback,
                context: next.answers(),
                is_final,
            };
            Ok(send_feedback(next, payload))
        }
        Err(failure) => Ok(validation_failed(next, context, field, failure)),
    }
}

fn send_feedback(mut state: ConversationState, payload: FeedbackPayload) -> TransitionResult {
    state.feedback_status = FeedbackStatus::InFlight(payload.clone());
    let generation = state.generation;
    TransitionResult::new(state)
        .with_effect(Effect::notice("Sending your feedback..."))
        .with_effect(Effect::SubmitFeedback {
            generation,
            payload,
        })
}

fn rate_recipe(state: &ConversationState, stars: u32, comment: &str) -> TransitionResult {
    let comment = comment.trim().to_string();
    let refuse = |failure| {
        TransitionResult::new(state.clone())
            .with_effect(Effect::ShowError(FailureKind::Validation(failure)))
    };
    let rating = match u8::try_from(stars) {
        Ok(rating) if rating <= 5 => rating,
        _ => return refuse(ValidationFailure::InvalidRating(stars)),
    };
    if rating == 0 && comment.is_empty() {
        return refuse(ValidationFailure::EmptyRating);
    }

    let recipe = state
        .detail
        .as_ref()
        .map_or_else(|| UNKNOWN_RECIPE.to_string(), |d| d.recipe.name.clone());
    TransitionResult::new(state.clone()).with_effect(Effect::SubmitRecipeFeedback {
        generation: state.generation,
        rating,
        comment,
        recipe,
    })
}
