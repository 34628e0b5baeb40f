//! Runtime for executing conversations
//!
//! A conversation runs as one task that owns its state. Callers talk to it
//! through a cloneable [`ConversationHandle`]; gateway calls run as
//! background tasks and report back on a private channel.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;

use crate::gateway::RecipeGateway;
use crate::presenter::Presenter;
use crate::state_machine::{
    ConversationContext, ConversationState, Event, FieldName, UnknownField, UserAction,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const INPUT_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("conversation has stopped")]
    Closed,
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    event_tx: mpsc::Sender<Event>,
}

impl ConversationHandle {
    /// Show the greeting and the first prompt
    pub async fn start(&self) -> Result<(), RuntimeError> {
        self.send(Event::Start).await
    }

    /// The single entry point for typed or clicked answers
    pub async fn field_completed(
        &self,
        field: FieldName,
        value: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        self.send(Event::FieldCompleted {
            field,
            value: value.into(),
        })
        .await
    }

    /// [`Self::field_completed`] for callers holding the field name as text
    pub async fn field_completed_named(
        &self,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let field: FieldName = field.parse()?;
        self.field_completed(field, value).await
    }

    /// A finished speech transcript
    pub async fn voice(&self, transcript: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Event::VoiceUtterance {
            transcript: transcript.into(),
        })
        .await
    }

    pub async fn act(&self, action: UserAction) -> Result<(), RuntimeError> {
        self.send(Event::Action(action)).await
    }

    async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed)
    }
}

/// Spawn a conversation runtime on the current tokio runtime.
///
/// The conversation stops once every handle has been dropped.
pub fn spawn_conversation<G, P>(
    context: ConversationContext,
    gateway: G,
    presenter: P,
) -> (ConversationHandle, JoinHandle<()>)
where
    G: RecipeGateway + 'static,
    P: Presenter + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(INPUT_BUFFER);
    let runtime = ConversationRuntime::new(
        context,
        ConversationState::new(),
        gateway,
        presenter,
        event_rx,
    );
    let task = tokio::spawn(runtime.run());
    (ConversationHandle { event_tx }, task)
}
