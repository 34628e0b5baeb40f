//! Grace - conversational recipe assistant
//!
//! Runs one conversation in the terminal against the recipe backend.

use grace_kitchen::config::{GatewayConfig, LogFormat};
use grace_kitchen::gateway::{HttpGateway, LoggingGateway};
use grace_kitchen::presenter::Presenter;
use grace_kitchen::runtime::{spawn_conversation, ConversationHandle, RuntimeError};
use grace_kitchen::state_machine::{ConversationContext, FieldName, UserAction};
use grace_kitchen::terminal::{parse_input, Input, MenuItem, TerminalPresenter, HELP};
use std::io::Stdout;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    // Logs go to stderr so they never interleave with the conversation
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grace_kitchen=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = GatewayConfig::from_env();
    tracing::info!(base_url = %config.base_url, "Using recipe backend");
    let gateway = LoggingGateway::new(HttpGateway::new(&config)?);

    let presenter = Arc::new(TerminalPresenter::stdout());
    let context = ConversationContext::new(uuid::Uuid::new_v4().to_string());
    let (handle, runtime) = spawn_conversation(context, gateway, presenter.clone());

    handle.start().await?;
    presenter.notice(HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match dispatch(&handle, &presenter, parse_input(&line)).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(RuntimeError::UnknownField(e)) => presenter.notice(&e.to_string()),
            Err(e) => return Err(e.into()),
        }
    }

    drop(handle);
    runtime.await?;
    Ok(())
}

/// Forward one line of input. Returns `false` when the user quits.
async fn dispatch(
    handle: &ConversationHandle,
    presenter: &TerminalPresenter<Stdout>,
    input: Input,
) -> Result<bool, RuntimeError> {
    match input {
        Input::Quit => return Ok(false),
        Input::Help => presenter.notice(HELP),
        Input::Voice(transcript) => handle.voice(transcript).await?,
        Input::Action(action) => handle.act(action).await?,
        Input::Field { name, value } => handle.field_completed_named(&name, value).await?,
        Input::Pick(number) => match presenter.menu_item(number) {
            Some(MenuItem::Option { field, label }) => handle.field_completed(field, label).await?,
            Some(MenuItem::Card { id }) => handle.act(UserAction::OpenRecipe { id }).await?,
            Some(MenuItem::Choice(choice)) => handle.act(choice.action()).await?,
            None => presenter.notice(&format!("There is no option {number}")),
        },
        Input::Text(text) => {
            let field = presenter.prompted_field().unwrap_or(FieldName::Ingredients);
            handle.field_completed(field, text).await?;
        }
    }
    Ok(true)
}
