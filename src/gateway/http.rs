//! reqwest-backed gateway speaking the backend's JSON contract

use super::types::{CacheImageResponse, ExpandRequest, ExpandResponse, SuggestionsResponse};
use super::{
    CacheImageRequest, ExpandedContent, FeedbackPayload, GatewayError, Recipe, RecipeFeedback,
    RecipeGateway, SuggestionCriteria, Suggestions,
};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<Response, GatewayError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        check_status(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(self.post(path, body).await?).await
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::status(
        status.as_u16(),
        format!("HTTP {status}: {body}"),
    ))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::network(format!("Failed to read response: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| GatewayError::decode(format!("Failed to parse response: {e} - body: {body}")))
}

#[async_trait]
impl RecipeGateway for HttpGateway {
    async fn fetch_suggestions(
        &self,
        criteria: &SuggestionCriteria,
    ) -> Result<Suggestions, GatewayError> {
        let response: SuggestionsResponse = self.post_json("/api/recipes", criteria).await?;
        Ok(response.into())
    }

    async fn cache_image(
        &self,
        request: &CacheImageRequest,
    ) -> Result<Option<String>, GatewayError> {
        let response: CacheImageResponse = self.post_json("/api/cache-image", request).await?;
        Ok(response.local)
    }

    async fn get_recipe(&self, id: &str) -> Result<Recipe, GatewayError> {
        let mut url = reqwest::Url::parse(&self.url("/api/recipe/"))
            .map_err(|e| GatewayError::network(format!("Invalid backend URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| GatewayError::network("Backend URL cannot take a path"))?
            .pop_if_empty()
            .push(id);
        let response = self.client.get(url).send().await?;
        decode(check_status(response).await?).await
    }

    async fn expand_recipe(&self, id: &str) -> Result<ExpandedContent, GatewayError> {
        let response: ExpandResponse = self
            .post_json("/api/expand-recipe", &ExpandRequest { id })
            .await?;
        response
            .expanded
            .ok_or_else(|| GatewayError::decode("Response carried no expanded content"))
    }

    async fn submit_feedback(&self, payload: &FeedbackPayload) -> Result<(), GatewayError> {
        self.post("/api/feedback", payload).await.map(|_| ())
    }

    async fn submit_recipe_feedback(&self, payload: &RecipeFeedback) -> Result<(), GatewayError> {
        self.post("/api/recipe-feedback", payload).await.map(|_| ())
    }
}
