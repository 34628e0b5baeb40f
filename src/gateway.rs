//! Recipe backend abstraction
//!
//! The conversation talks to the backend only through [`RecipeGateway`].
//! Timing belongs to the backend, so no call here carries a timeout.

mod error;
pub mod http;
mod types;

pub use error::{GatewayError, GatewayErrorKind};
pub use http::HttpGateway;
pub use types::{
    is_absolute_url, strip_step_number, CacheImageRequest, ExpandedContent, FeedbackContext,
    FeedbackPayload, Recipe, RecipeFeedback, SuggestionCriteria, Suggestions,
};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Backend operations used by a conversation
#[async_trait]
pub trait RecipeGateway: Send + Sync {
    /// `POST /api/recipes`. Zero matches is `Ok(Suggestions::Empty)`.
    async fn fetch_suggestions(
        &self,
        criteria: &SuggestionCriteria,
    ) -> Result<Suggestions, GatewayError>;

    /// `POST /api/cache-image`. `Ok(None)` when the backend kept no copy.
    async fn cache_image(&self, request: &CacheImageRequest)
        -> Result<Option<String>, GatewayError>;

    /// `GET /api/recipe/{id}`
    async fn get_recipe(&self, id: &str) -> Result<Recipe, GatewayError>;

    /// `POST /api/expand-recipe`. Safe to repeat for the same id.
    async fn expand_recipe(&self, id: &str) -> Result<ExpandedContent, GatewayError>;

    /// `POST /api/feedback`
    async fn submit_feedback(&self, payload: &FeedbackPayload) -> Result<(), GatewayError>;

    /// `POST /api/recipe-feedback`. Callers treat the outcome as advisory.
    async fn submit_recipe_feedback(&self, payload: &RecipeFeedback) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: RecipeGateway + ?Sized> RecipeGateway for Arc<T> {
    async fn fetch_suggestions(
        &self,
        criteria: &SuggestionCriteria,
    ) -> Result<Suggestions, GatewayError> {
        (**self).fetch_suggestions(criteria).await
    }

    async fn cache_image(
        &self,
        request: &CacheImageRequest,
    ) -> Result<Option<String>, GatewayError> {
        (**self).cache_image(request).await
    }

    async fn get_recipe(&self, id: &str) -> Result<Recipe, GatewayError> {
        (**self).get_recipe(id).await
    }

    async fn expand_recipe(&self, id: &str) -> Result<ExpandedContent, GatewayError> {
        (**self).expand_recipe(id).await
    }

    async fn submit_feedback(&self, payload: &FeedbackPayload) -> Result<(), GatewayError> {
        (**self).submit_feedback(payload).await
    }

    async fn submit_recipe_feedback(&self, payload: &RecipeFeedback) -> Result<(), GatewayError> {
        (**self).submit_recipe_feedback(payload).await
    }
}

// ============================================================================
// Card preparation
// ============================================================================

/// Swap remote card images for backend-cached copies.
///
/// All lookups run concurrently and the function returns only after every
/// one has settled, so cards are revealed together. A failed lookup keeps
/// the original URL; relative paths are never sent to the backend.
pub async fn prepare_cards<G>(gateway: &G, cards: Vec<Recipe>, cuisine: &str) -> Vec<Recipe>
where
    G: RecipeGateway + ?Sized,
{
    let lookups = cards.iter().map(|card| async move {
        if !card.has_remote_image() {
            return None;
        }
        let request = CacheImageRequest {
            url: card.image.clone(),
            name: card.name.clone(),
            cuisine: cuisine.to_string(),
        };
        match gateway.cache_image(&request).await {
            Ok(local) => local.filter(|path| !path.is_empty()),
            Err(e) => {
                tracing::warn!(recipe = %card.name, error = %e, "Image cache failed, using original URL");
                None
            }
        }
    });
    let resolved = futures::future::join_all(lookups).await;

    cards
        .into_iter()
        .zip(resolved)
        .map(|(mut card, local)| {
            if let Some(local) = local {
                card.image = local;
            }
            card
        })
        .collect()
}

// ============================================================================
// Logging wrapper
// ============================================================================

/// Logs duration and outcome of every call on the wrapped gateway
pub struct LoggingGateway<G> {
    inner: G,
}

impl<G: RecipeGateway> LoggingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &str, start: Instant, result: &Result<T, GatewayError>) {
    let duration_ms = start.elapsed().as_millis();
    match result {
        Ok(_) => tracing::info!(operation, duration_ms = %duration_ms, "Gateway call completed"),
        Err(e) => tracing::error!(
            operation,
            duration_ms = %duration_ms,
            kind = ?e.kind,
            error = %e.message,
            "Gateway call failed"
        ),
    }
}

#[async_trait]
impl<G: RecipeGateway> RecipeGateway for LoggingGateway<G> {
    async fn fetch_suggestions(
        &self,
        criteria: &SuggestionCriteria,
    ) -> Result<Suggestions, GatewayError> {
        let start = Instant::now();
        let result = self.inner.fetch_suggestions(criteria).await;
        if let Ok(Suggestions::Cards(cards)) = &result {
            tracing::debug!(count = cards.len(), broaden = criteria.broaden, "Suggestions received");
        }
        log_outcome("fetch_suggestions", start, &result);
        result
    }

    async fn cache_image(
        &self,
        request: &CacheImageRequest,
    ) -> Result<Option<String>, GatewayError> {
        let start = Instant::now();
        let result = self.inner.cache_image(request).await;
        log_outcome("cache_image", start, &result);
        result
    }

    async fn get_recipe(&self, id: &str) -> Result<Recipe, GatewayError> {
        let start = Instant::now();
        let result = self.inner.get_recipe(id).await;
        log_outcome("get_recipe", start, &result);
        result
    }

    async fn expand_recipe(&self, id: &str) -> Result<ExpandedContent, GatewayError> {
        let start = Instant::now();
        let result = self.inner.expand_recipe(id).await;
        log_outcome("expand_recipe", start, &result);
        result
    }

    async fn submit_feedback(&self, payload: &FeedbackPayload) -> Result<(), GatewayError> {
        let start = Instant::now();
        let result = self.inner.submit_feedback(payload).await;
        log_outcome("submit_feedback", start, &result);
        result
    }

    async fn submit_recipe_feedback(&self, payload: &RecipeFeedback) -> Result<(), GatewayError> {
        let start = Instant::now();
        let result = self.inner.submit_recipe_feedback(payload).await;
        log_outcome("submit_recipe_feedback", start, &result);
        result
    }
}
