//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::{spawn_conversation, ConversationHandle};
use crate::gateway::{
    CacheImageRequest, ExpandedContent, FeedbackPayload, GatewayError, Recipe, RecipeFeedback,
    RecipeGateway, SuggestionCriteria, Suggestions,
};
use crate::presenter::{Choice, ExpandControl, FailureKind, Presenter};
use crate::state_machine::{ConversationContext, FieldName};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// A summary-only recipe as the suggestions endpoint returns it
pub fn recipe(id: &str, name: &str, image: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        image: image.to_string(),
        short: format!("A quick {name}"),
        ingredients: vec![],
        instructions: vec![],
        expanded: false,
    }
}

// ============================================================================
// Mock Gateway
// ============================================================================

/// Gateway that answers from queues and records every request
#[derive(Default)]
pub struct MockGateway {
    suggestions: Mutex<VecDeque<Result<Suggestions, GatewayError>>>,
    recipes: Mutex<VecDeque<Result<Recipe, GatewayError>>>,
    expansions: Mutex<VecDeque<Result<ExpandedContent, GatewayError>>>,
    feedback_outcomes: Mutex<VecDeque<Result<(), GatewayError>>>,
    /// url -> cached path, or `None` to fail the lookup
    cached: Mutex<HashMap<String, Option<String>>>,
    cache_delays: Mutex<HashMap<String, Duration>>,
    /// When set, suggestion fetches wait for a permit before answering
    gate: Option<Arc<Notify>>,
    pub fetch_started: Arc<Notify>,
    criteria: Mutex<Vec<SuggestionCriteria>>,
    cache_requests: Mutex<Vec<CacheImageRequest>>,
    feedback: Mutex<Vec<FeedbackPayload>>,
    recipe_feedback: Mutex<Vec<RecipeFeedback>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every suggestions fetch until `gate` is notified
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn queue_suggestions(&self, result: Result<Suggestions, GatewayError>) {
        self.suggestions.lock().unwrap().push_back(result);
    }

    pub fn queue_recipe(&self, result: Result<Recipe, GatewayError>) {
        self.recipes.lock().unwrap().push_back(result);
    }

    pub fn queue_expansion(&self, result: Result<ExpandedContent, GatewayError>) {
        self.expansions.lock().unwrap().push_back(result);
    }

    pub fn queue_feedback_outcome(&self, result: Result<(), GatewayError>) {
        self.feedback_outcomes.lock().unwrap().push_back(result);
    }

    pub fn cache_local(&self, url: &str, local: &str) {
        self.cached
            .lock()
            .unwrap()
            .insert(url.to_string(), Some(local.to_string()));
    }

    pub fn fail_cache(&self, url: &str) {
        self.cached.lock().unwrap().insert(url.to_string(), None);
    }

    pub fn delay_cache(&self, url: &str, delay: Duration) {
        self.cache_delays
            .lock()
            .unwrap()
            .insert(url.to_string(), delay);
    }

    pub fn recorded_criteria(&self) -> Vec<SuggestionCriteria> {
        self.criteria.lock().unwrap().clone()
    }

    pub fn recorded_cache_requests(&self) -> Vec<CacheImageRequest> {
        self.cache_requests.lock().unwrap().clone()
    }

    pub fn recorded_feedback(&self) -> Vec<FeedbackPayload> {
        self.feedback.lock().unwrap().clone()
    }

    pub fn recorded_recipe_feedback(&self) -> Vec<RecipeFeedback> {
        self.recipe_feedback.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeGateway for MockGateway {
    async fn fetch_suggestions(
        &self,
        criteria: &SuggestionCriteria,
    ) -> Result<Suggestions, GatewayError> {
        self.criteria.lock().unwrap().push(criteria.clone());
        self.fetch_started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.suggestions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::network("No mock suggestions queued")))
    }

    async fn cache_image(
        &self,
        request: &CacheImageRequest,
    ) -> Result<Option<String>, GatewayError> {
        self.cache_requests.lock().unwrap().push(request.clone());
        let delay = self.cache_delays.lock().unwrap().get(&request.url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.cached.lock().unwrap().get(&request.url) {
            Some(Some(local)) => Ok(Some(local.clone())),
            Some(None) => Err(GatewayError::network("image cache unavailable")),
            None => Ok(None),
        }
    }

    async fn get_recipe(&self, _id: &str) -> Result<Recipe, GatewayError> {
        self.recipes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::status(404, "No mock recipe queued")))
    }

    async fn expand_recipe(&self, _id: &str) -> Result<ExpandedContent, GatewayError> {
        self.expansions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::network("No mock expansion queued")))
    }

    async fn submit_feedback(&self, payload: &FeedbackPayload) -> Result<(), GatewayError> {
        self.feedback.lock().unwrap().push(payload.clone());
        self.feedback_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn submit_recipe_feedback(&self, payload: &RecipeFeedback) -> Result<(), GatewayError> {
        self.recipe_feedback.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

// ============================================================================
// Recording Presenter
// ============================================================================

/// One presenter call, as recorded
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Clear,
    Say(String),
    PromptChoice(FieldName, Vec<String>),
    PromptText(FieldName, String),
    Loading(bool),
    Cards(Vec<Recipe>),
    Detail(Recipe, ExpandControl),
    HideDetail,
    Expand(ExpandControl),
    Error(FailureKind),
    Choices(Vec<Choice>),
    Notice(String),
}

#[derive(Default)]
pub struct RecordingPresenter {
    rendered: Mutex<Vec<Rendered>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> Vec<Rendered> {
        self.rendered.lock().unwrap().clone()
    }

    fn record(&self, item: Rendered) {
        self.rendered.lock().unwrap().push(item);
    }
}

impl Presenter for RecordingPresenter {
    fn clear(&self) {
        self.record(Rendered::Clear);
    }

    fn say(&self, text: &str) {
        self.record(Rendered::Say(text.to_string()));
    }

    fn prompt_choice(&self, field: FieldName, options: &[String]) {
        self.record(Rendered::PromptChoice(field, options.to_vec()));
    }

    fn prompt_text(&self, field: FieldName, placeholder: &str) {
        self.record(Rendered::PromptText(field, placeholder.to_string()));
    }

    fn set_loading(&self, loading: bool) {
        self.record(Rendered::Loading(loading));
    }

    fn show_cards(&self, cards: &[Recipe]) {
        self.record(Rendered::Cards(cards.to_vec()));
    }

    fn show_detail(&self, recipe: &Recipe, expand: ExpandControl) {
        self.record(Rendered::Detail(recipe.clone(), expand));
    }

    fn hide_detail(&self) {
        self.record(Rendered::HideDetail);
    }

    fn set_expand_control(&self, control: ExpandControl) {
        self.record(Rendered::Expand(control));
    }

    fn show_error(&self, failure: &FailureKind) {
        self.record(Rendered::Error(failure.clone()));
    }

    fn offer_choices(&self, choices: &[Choice]) {
        self.record(Rendered::Choices(choices.to_vec()));
    }

    fn notice(&self, text: &str) {
        self.record(Rendered::Notice(text.to_string()));
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub handle: ConversationHandle,
    pub gateway: Arc<MockGateway>,
    pub presenter: Arc<RecordingPresenter>,
    _runtime_task: tokio::task::JoinHandle<()>,
}

impl TestRuntime {
    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder::default()
    }
}

#[derive(Default)]
pub struct TestRuntimeBuilder {
    conversation_id: Option<String>,
    gateway: Option<MockGateway>,
}

impl TestRuntimeBuilder {
    pub fn gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn build(self) -> TestRuntime {
        let gateway = Arc::new(self.gateway.unwrap_or_default());
        let presenter = Arc::new(RecordingPresenter::new());
        let context =
            ConversationContext::new(self.conversation_id.unwrap_or_else(|| "test-conv".to_string()));
        let (handle, task) = spawn_conversation(context, gateway.clone(), presenter.clone());
        TestRuntime {
            handle,
            gateway,
            presenter,
            _runtime_task: task,
        }
    }
}

impl TestRuntime {
    pub fn rendered(&self) -> Vec<Rendered> {
        self.presenter.rendered()
    }

    /// Poll the recorded output until `pred` holds or two seconds pass
    pub async fn wait_for(&self, pred: impl Fn(&[Rendered]) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if pred(&self.rendered()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Greet, then answer the three search questions
    pub async fn answer_search(&self, ingredients: &str, cuisine: &str, difficulty: &str) {
        self.handle.start().await.unwrap();
        self.handle
            .field_completed(FieldName::Ingredients, ingredients)
            .await
            .unwrap();
        self.handle
            .field_completed(FieldName::Cuisine, cuisine)
            .await
            .unwrap();
        self.handle
            .field_completed(FieldName::Difficulty, difficulty)
            .await
            .unwrap();
    }

    pub async fn wait_for_cards(&self) -> Option<Vec<Recipe>> {
        self.wait_for(|r| r.iter().any(|x| matches!(x, Rendered::Cards(_))))
            .await;
        self.rendered().into_iter().rev().find_map(|x| match x {
            Rendered::Cards(cards) => Some(cards),
            _ => None,
        })
    }

    /// Search until one recipe card is on screen
    pub async fn show_a_recipe(&self) {
        self.gateway
            .queue_suggestions(Ok(Suggestions::Cards(vec![recipe("r1", "Risotto", "")])));
        self.answer_search("rice", "Italian", "easy").await;
        self.wait_for_cards().await;
    }

    pub async fn wait_for_choices(&self) -> Option<Vec<Choice>> {
        self.wait_for(|r| r.iter().any(|x| matches!(x, Rendered::Choices(_))))
            .await;
        self.last_choices()
    }

    pub fn last_choices(&self) -> Option<Vec<Choice>> {
        self.rendered().into_iter().rev().find_map(|x| match x {
            Rendered::Choices(choices) => Some(choices),
            _ => None,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::{Operation, PLACEHOLDER_IMAGE};
    use crate::state_machine::transition::GREETING;
    use crate::state_machine::UserAction;

    fn two_cards() -> Vec<Recipe> {
        vec![
            recipe("r1", "Chicken Risotto", "https://img.example/risotto.jpg"),
            recipe("r2", "Arancini", "https://img.example/arancini.jpg"),
        ]
    }

    #[tokio::test]
    async fn test_mock_gateway_records_and_answers_in_order() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Ok(Suggestions::Empty));
        let criteria = SuggestionCriteria {
            ingredients: "egg".to_string(),
            cuisine: "Chinese".to_string(),
            diet: String::new(),
            difficulty: crate::state_machine::Difficulty::Easy,
            meal: String::new(),
            broaden: false,
        };
        assert_eq!(gateway.fetch_suggestions(&criteria).await, Ok(Suggestions::Empty));
        assert!(gateway.fetch_suggestions(&criteria).await.is_err());
        assert_eq!(gateway.recorded_criteria().len(), 2);
    }

    #[tokio::test]
    async fn test_greeting_and_first_prompt() {
        let rt = TestRuntime::builder().conversation_id("greeting").build();
        rt.handle.start().await.unwrap();
        assert!(rt.wait_for(|r| r.len() >= 3).await);

        let rendered = rt.rendered();
        assert_eq!(rendered[0], Rendered::Say(GREETING.to_string()));
        assert!(rendered.contains(&Rendered::PromptChoice(
            FieldName::Ingredients,
            ConversationContext::new("x").quick_ingredients
        )));
    }

    #[tokio::test]
    async fn test_empty_result_offers_broaden_and_start_over() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Ok(Suggestions::Empty));
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.answer_search("chicken, rice", "Italian", "easy").await;

        assert_eq!(
            rt.wait_for_choices().await,
            Some(vec![Choice::Broaden, Choice::StartOver])
        );
        assert!(!rt.rendered().iter().any(|x| matches!(x, Rendered::Error(_))));

        let sent = rt.gateway.recorded_criteria();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ingredients, "chicken, rice");
        assert!(!sent[0].broaden);
    }

    #[tokio::test]
    async fn test_broaden_applies_to_next_fetch_only() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Ok(Suggestions::Empty));
        gateway.queue_suggestions(Ok(Suggestions::Cards(vec![recipe("r1", "Fried Rice", "")])));
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.answer_search("chicken, rice", "Chinese", "easy").await;
        rt.wait_for_choices().await;

        rt.handle.act(UserAction::Broaden).await.unwrap();
        rt.handle
            .field_completed(FieldName::Ingredients, "rice")
            .await
            .unwrap();
        let cards = rt.wait_for_cards().await.unwrap();
        assert_eq!(cards[0].name, "Fried Rice");

        let sent = rt.gateway.recorded_criteria();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].broaden);
        assert_eq!(sent[1].ingredients, "rice");
        assert_eq!(sent[1].cuisine, "Chinese");
    }

    #[tokio::test]
    async fn test_reset_during_pending_fetch_discards_result() {
        let gate = Arc::new(Notify::new());
        let gateway = MockGateway::gated(gate.clone());
        gateway.queue_suggestions(Ok(Suggestions::Cards(two_cards())));
        let started = gateway.fetch_started.clone();
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.answer_search("chicken, rice", "Italian", "easy").await;
        tokio::time::timeout(Duration::from_secs(1), started.notified())
            .await
            .expect("fetch should start");

        rt.handle.act(UserAction::StartOver).await.unwrap();
        assert!(rt.wait_for(|r| r.contains(&Rendered::Clear)).await);

        // Let the backend answer after the reset
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let rendered = rt.rendered();
        assert!(!rendered.iter().any(|x| matches!(x, Rendered::Cards(_))));
        let after_clear: Vec<_> = rendered
            .iter()
            .skip_while(|x| **x != Rendered::Clear)
            .collect();
        assert_eq!(after_clear[1], &Rendered::Say(GREETING.to_string()));
    }

    #[tokio::test]
    async fn test_cards_revealed_together_after_images_settle() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Ok(Suggestions::Cards(two_cards())));
        gateway.cache_local("https://img.example/risotto.jpg", "/static/cache/risotto.jpg");
        gateway.delay_cache("https://img.example/risotto.jpg", Duration::from_millis(80));
        gateway.fail_cache("https://img.example/arancini.jpg");
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.answer_search("rice", "Italian", "moderate").await;
        let cards = rt.wait_for_cards().await.unwrap();

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].image, "/static/cache/risotto.jpg");
        assert_eq!(cards[1].image, "https://img.example/arancini.jpg");
        let shown = rt
            .rendered()
            .iter()
            .filter(|x| matches!(x, Rendered::Cards(_)))
            .count();
        assert_eq!(shown, 1);
        assert_eq!(rt.gateway.recorded_cache_requests().len(), 2);
        assert!(rt.rendered().contains(&Rendered::Loading(false)));
    }

    #[tokio::test]
    async fn test_fetch_failure_then_retry() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Err(GatewayError::network("connection refused")));
        gateway.queue_suggestions(Ok(Suggestions::Cards(vec![recipe("r1", "Tacos", "")])));
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.answer_search("beef", "Mexican", "easy").await;
        assert_eq!(
            rt.wait_for_choices().await,
            Some(vec![Choice::Retry, Choice::StartOver])
        );
        assert!(rt.rendered().iter().any(|x| matches!(
            x,
            Rendered::Error(FailureKind::Transport {
                operation: Operation::FetchSuggestions,
                ..
            })
        )));

        rt.handle.act(UserAction::Retry).await.unwrap();
        let cards = rt.wait_for_cards().await.unwrap();
        assert_eq!(cards[0].name, "Tacos");
        assert_eq!(cards[0].image, "");
        assert_eq!(crate::presenter::card_image(&cards[0]), PLACEHOLDER_IMAGE);
    }

    #[tokio::test]
    async fn test_duplicate_selection_sends_single_fetch() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Ok(Suggestions::Cards(vec![recipe("r1", "Paella", "")])));
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.answer_search("rice", "Mediterranean", "easy").await;
        rt.handle
            .field_completed(FieldName::Difficulty, "complex")
            .await
            .unwrap();
        rt.handle
            .field_completed(FieldName::Cuisine, "Indian")
            .await
            .unwrap();
        rt.wait_for_cards().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let sent = rt.gateway.recorded_criteria();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].cuisine, "Mediterranean");
    }

    #[tokio::test]
    async fn test_expand_failure_can_be_retried() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Ok(Suggestions::Cards(vec![recipe("r1", "Dal", "")])));
        gateway.queue_expansion(Err(GatewayError::network("timeout")));
        gateway.queue_expansion(Ok(ExpandedContent {
            ingredients_detailed: vec!["1 cup lentils".to_string()],
            instructions_detailed: vec!["1. Simmer lentils".to_string()],
        }));
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.answer_search("lentils", "Indian", "easy").await;
        rt.wait_for_cards().await.unwrap();
        rt.handle
            .act(UserAction::OpenRecipe { id: "r1".to_string() })
            .await
            .unwrap();
        rt.handle.act(UserAction::Expand).await.unwrap();
        assert!(rt
            .wait_for(|r| r.contains(&Rendered::Expand(ExpandControl::Failed)))
            .await);

        rt.handle.act(UserAction::Expand).await.unwrap();
        assert!(rt
            .wait_for(|r| r.iter().any(|x| matches!(
                x,
                Rendered::Detail(recipe, ExpandControl::Hidden) if recipe.expanded
            )))
            .await);
        let detail = rt
            .rendered()
            .into_iter()
            .rev()
            .find_map(|x| match x {
                Rendered::Detail(recipe, _) => Some(recipe),
                _ => None,
            })
            .unwrap();
        assert_eq!(detail.display_instructions(), vec!["Simmer lentils"]);
    }

    #[tokio::test]
    async fn test_unknown_recipe_is_loaded_from_backend() {
        let gateway = MockGateway::new();
        let mut full = recipe("r42", "Shakshuka", "");
        full.expanded = true;
        full.instructions = vec!["Crack eggs into sauce".to_string()];
        gateway.queue_recipe(Ok(full.clone()));
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.handle.start().await.unwrap();
        rt.handle
            .act(UserAction::OpenRecipe { id: "r42".to_string() })
            .await
            .unwrap();
        assert!(rt
            .wait_for(|r| r.contains(&Rendered::Detail(full.clone(), ExpandControl::Hidden)))
            .await);
    }

    #[tokio::test]
    async fn test_feedback_two_step_flow() {
        let rt = TestRuntime::builder().build();
        rt.show_a_recipe().await;
        rt.handle
            .field_completed(FieldName::Feedback, "ok")
            .await
            .unwrap();
        assert!(rt
            .wait_for(|r| r.iter().any(|x| matches!(x, Rendered::PromptText(FieldName::FinalFeedback, _))))
            .await);
        assert!(rt.gateway.recorded_feedback().is_empty());

        rt.handle
            .field_completed(FieldName::FinalFeedback, "More vegetarian dishes")
            .await
            .unwrap();
        assert!(rt
            .wait_for(|r| r.contains(&Rendered::Choices(vec![Choice::StartOver])))
            .await);
        let sent = rt.gateway.recorded_feedback();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_final);
        assert_eq!(sent[0].feedback, "More vegetarian dishes");
    }

    #[tokio::test]
    async fn test_feedback_failure_offers_retry_and_start_over() {
        let gateway = MockGateway::new();
        gateway.queue_feedback_outcome(Err(GatewayError::status(500, "boom")));
        let rt = TestRuntime::builder().gateway(gateway).build();
        rt.show_a_recipe().await;
        rt.handle
            .field_completed(FieldName::Feedback, "Too many steps")
            .await
            .unwrap();

        assert_eq!(
            rt.wait_for_choices().await,
            Some(vec![Choice::Retry, Choice::StartOver])
        );
        assert!(rt.rendered().iter().any(|x| matches!(
            x,
            Rendered::Error(FailureKind::Transport {
                operation: Operation::SubmitFeedback,
                ..
            })
        )));
    }

    #[tokio::test]
    async fn test_feedback_retry_resends_same_payload() {
        let gateway = MockGateway::new();
        gateway.queue_feedback_outcome(Err(GatewayError::network("connection reset")));
        let rt = TestRuntime::builder().gateway(gateway).build();
        rt.show_a_recipe().await;
        rt.handle
            .field_completed(FieldName::Feedback, "Too many steps")
            .await
            .unwrap();
        assert!(rt
            .wait_for(|r| r.contains(&Rendered::Choices(vec![Choice::Retry, Choice::StartOver])))
            .await);

        rt.handle.act(UserAction::Retry).await.unwrap();
        assert!(rt
            .wait_for(|r| r.contains(&Rendered::Choices(vec![Choice::StartOver])))
            .await);

        let sent = rt.gateway.recorded_feedback();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
        assert_eq!(sent[1].feedback, "Too many steps");
        assert_eq!(sent[1].context.cuisine, "Italian");
        assert!(rt
            .rendered()
            .contains(&Rendered::Say("Thank you! Your feedback was saved.".to_string())));
    }

    #[tokio::test]
    async fn test_feedback_before_any_recipe_is_refused() {
        let rt = TestRuntime::builder().build();
        rt.handle.start().await.unwrap();
        rt.handle
            .field_completed(FieldName::Feedback, "Too many steps")
            .await
            .unwrap();
        assert!(rt
            .wait_for(|r| r.iter().any(
                |x| matches!(x, Rendered::Notice(n) if n.contains("once recipes are shown"))
            ))
            .await);
        assert!(rt.gateway.recorded_feedback().is_empty());
    }

    #[tokio::test]
    async fn test_recipe_rating_is_timestamped() {
        let rt = TestRuntime::builder().build();
        rt.handle.start().await.unwrap();
        rt.handle
            .act(UserAction::RateRecipe {
                rating: 4,
                comment: "Great".to_string(),
            })
            .await
            .unwrap();
        assert!(rt
            .wait_for(|r| r.iter().any(|x| matches!(x, Rendered::Notice(n) if n.starts_with("Thank you"))))
            .await);

        let sent = rt.gateway.recorded_recipe_feedback();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipe, "Unknown Recipe");
        assert!(chrono::DateTime::parse_from_rfc3339(&sent[0].timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_voice_answers_go_through_the_funnel() {
        let gateway = MockGateway::new();
        gateway.queue_suggestions(Ok(Suggestions::Empty));
        let rt = TestRuntime::builder().gateway(gateway).build();

        rt.handle.start().await.unwrap();
        rt.handle.voice("add chicken and rice").await.unwrap();
        rt.handle.voice("italian").await.unwrap();
        rt.handle.voice("pick easy").await.unwrap();
        rt.wait_for_choices().await;

        let sent = rt.gateway.recorded_criteria();
        assert_eq!(sent[0].ingredients, "chicken, rice");
        assert_eq!(sent[0].cuisine, "Italian");
        assert_eq!(sent[0].difficulty, crate::state_machine::Difficulty::Easy);
    }

    #[tokio::test]
    async fn test_rejected_event_is_reported_as_notice() {
        let rt = TestRuntime::builder().build();
        rt.handle.start().await.unwrap();
        rt.handle.act(UserAction::Retry).await.unwrap();
        assert!(rt
            .wait_for(|r| r.iter().any(|x| matches!(x, Rendered::Notice(n) if n.contains("nothing to retry"))))
            .await);
    }

    #[tokio::test]
    async fn test_unknown_field_name_is_refused() {
        let rt = TestRuntime::builder().build();
        let err = rt
            .handle
            .field_completed_named("spiciness", "hot")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::runtime::RuntimeError::UnknownField(_)));
    }

    #[tokio::test]
    async fn test_runtime_stops_when_handles_drop() {
        let (handle, task) = spawn_conversation(
            ConversationContext::new("short-lived"),
            MockGateway::new(),
            RecordingPresenter::new(),
        );
        handle.start().await.unwrap();
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("runtime should stop")
            .unwrap();
    }
}
