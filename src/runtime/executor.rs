//! Conversation runtime executor

use crate::gateway::{prepare_cards, RecipeFeedback, RecipeGateway};
use crate::presenter::Presenter;
use crate::state_machine::{transition, ConversationContext, ConversationState, Effect, Event};
use chrono::{SecondsFormat, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TASK_BUFFER: usize = 32;

/// Generic conversation runtime that can work with any gateway and presenter
pub struct ConversationRuntime<G, P>
where
    G: RecipeGateway + 'static,
    P: Presenter + 'static,
{
    context: ConversationContext,
    state: ConversationState,
    gateway: Arc<G>,
    presenter: Arc<P>,
    /// Events from conversation handles
    input_rx: mpsc::Receiver<Event>,
    /// Events from finished gateway tasks
    task_rx: mpsc::Receiver<Event>,
    task_tx: mpsc::Sender<Event>,
    /// Cancels every gateway task started since the last reset
    pending: CancellationToken,
}

impl<G, P> ConversationRuntime<G, P>
where
    G: RecipeGateway + 'static,
    P: Presenter + 'static,
{
    pub fn new(
        context: ConversationContext,
        state: ConversationState,
        gateway: G,
        presenter: P,
        input_rx: mpsc::Receiver<Event>,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::channel(TASK_BUFFER);
        Self {
            context,
            state,
            gateway: Arc::new(gateway),
            presenter: Arc::new(presenter),
            input_rx,
            task_rx,
            task_tx,
            pending: CancellationToken::new(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!(conversation_id = %self.context.conversation_id, "Starting conversation runtime");

        loop {
            let event = tokio::select! {
                input = self.input_rx.recv() => match input {
                    Some(event) => event,
                    None => break,
                },
                Some(event) = self.task_rx.recv() => event,
            };
            self.process_event(event);
        }

        self.pending.cancel();
        tracing::info!(conversation_id = %self.context.conversation_id, "Conversation runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Rejections are user-facing (e.g. "search already in progress")
                tracing::warn!(
                    conversation_id = %self.context.conversation_id,
                    step = ?self.state.step,
                    error = %e,
                    "Event rejected"
                );
                self.presenter.notice(&e.to_string());
                return;
            }
        };

        if result.new_state.step != self.state.step {
            tracing::debug!(from = ?self.state.step, to = ?result.new_state.step, "Step changed");
        }
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CancelPending => {
                self.pending.cancel();
                self.pending = CancellationToken::new();
            }

            Effect::Clear => self.presenter.clear(),
            Effect::Say(text) => self.presenter.say(&text),
            Effect::PromptChoice { field, options } => self.presenter.prompt_choice(field, &options),
            Effect::PromptText { field, placeholder } => {
                self.presenter.prompt_text(field, &placeholder);
            }
            Effect::SetLoading(loading) => self.presenter.set_loading(loading),
            Effect::ShowCards(cards) => self.presenter.show_cards(&cards),
            Effect::ShowDetail { recipe, expand } => self.presenter.show_detail(&recipe, expand),
            Effect::HideDetail => self.presenter.hide_detail(),
            Effect::SetExpandControl(control) => self.presenter.set_expand_control(control),
            Effect::ShowError(failure) => self.presenter.show_error(&failure),
            Effect::OfferChoices(choices) => self.presenter.offer_choices(&choices),
            Effect::Notice(text) => self.presenter.notice(&text),

            Effect::FetchSuggestions {
                generation,
                criteria,
            } => {
                let gateway = self.gateway.clone();
                self.spawn_call(async move {
                    match gateway.fetch_suggestions(&criteria).await {
                        Ok(suggestions) => Event::SuggestionsReceived {
                            generation,
                            suggestions,
                        },
                        Err(error) => Event::SuggestionsFailed { generation, error },
                    }
                });
            }

            Effect::PrepareCards {
                generation,
                cards,
                cuisine,
            } => {
                let gateway = self.gateway.clone();
                self.spawn_call(async move {
                    let cards = prepare_cards(gateway.as_ref(), cards, &cuisine).await;
                    Event::CardsPrepared { generation, cards }
                });
            }

            Effect::LoadRecipe { generation, id } => {
                let gateway = self.gateway.clone();
                self.spawn_call(async move {
                    match gateway.get_recipe(&id).await {
                        Ok(recipe) => Event::RecipeLoaded {
                            generation,
                            id,
                            recipe,
                        },
                        Err(error) => Event::RecipeLoadFailed {
                            generation,
                            id,
                            error,
                        },
                    }
                });
            }

            Effect::ExpandRecipe { generation, id } => {
                let gateway = self.gateway.clone();
                self.spawn_call(async move {
                    match gateway.expand_recipe(&id).await {
                        Ok(content) => Event::ExpandCompleted {
                            generation,
                            id,
                            content,
                        },
                        Err(error) => Event::ExpandFailed {
                            generation,
                            id,
                            error,
                        },
                    }
                });
            }

            Effect::SubmitFeedback {
                generation,
                payload,
            } => {
                let gateway = self.gateway.clone();
                self.spawn_call(async move {
                    let outcome = gateway.submit_feedback(&payload).await;
                    Event::FeedbackSubmitted {
                        generation,
                        is_final: payload.is_final,
                        outcome,
                    }
                });
            }

            Effect::SubmitRecipeFeedback {
                generation,
                rating,
                comment,
                recipe,
            } => {
                let gateway = self.gateway.clone();
                let payload = RecipeFeedback {
                    rating,
                    comment,
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    recipe,
                };
                self.spawn_call(async move {
                    if let Err(e) = gateway.submit_recipe_feedback(&payload).await {
                        tracing::warn!(recipe = %payload.recipe, error = %e, "Recipe rating was not saved");
                    }
                    Event::RecipeFeedbackSent { generation }
                });
            }
        }
    }

    /// Run a gateway call in the background, racing it against the reset token
    fn spawn_call<F>(&self, call: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let cancel_token = self.pending.clone();
        let task_tx = self.task_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::debug!("Gateway call abandoned by reset");
                }

                event = call => {
                    let _ = task_tx.send(event).await;
                }
            }
        });
    }
}
