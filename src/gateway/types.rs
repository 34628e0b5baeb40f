//! Request and response types for the recipe backend
//!
//! Payloads are validated here, at the boundary. Everything past the gateway
//! works with these types only.

use crate::state_machine::Difficulty;
use serde::{Deserialize, Serialize};

// ============================================================================
// Recipe
// ============================================================================

/// A suggestion as returned by the backend. Only an expand call enriches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecipeWire")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    /// Absolute URL, local path, or empty when the backend had none
    pub image: String,
    pub short: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub expanded: bool,
}

impl Recipe {
    /// Whether the detail view should offer "view full recipe"
    pub fn needs_expansion(&self) -> bool {
        !self.expanded || self.instructions.is_empty()
    }

    /// Merge detailed content in place. Empty lists leave the summary alone.
    pub fn apply_expansion(&mut self, content: ExpandedContent) {
        if !content.ingredients_detailed.is_empty() {
            self.ingredients = content.ingredients_detailed;
        }
        if !content.instructions_detailed.is_empty() {
            self.instructions = content.instructions_detailed;
        }
        self.expanded = true;
    }

    /// Instructions with any leading "1. " numbering removed
    pub fn display_instructions(&self) -> Vec<String> {
        self.instructions
            .iter()
            .map(|step| strip_step_number(step))
            .collect()
    }

    pub fn has_remote_image(&self) -> bool {
        is_absolute_url(&self.image)
    }
}

/// Drop a leading "12." (and the whitespace after it) from a step
pub fn strip_step_number(step: &str) -> String {
    let rest = step.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < step.len() {
        if let Some(after) = rest.strip_prefix('.') {
            return after.trim().to_string();
        }
    }
    step.trim().to_string()
}

pub fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Recipe ids arrive as either strings or numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Deserialize)]
struct RecipeWire {
    id: Option<WireId>,
    name: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    short: Option<String>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    expanded: bool,
}

impl TryFrom<RecipeWire> for Recipe {
    type Error = String;

    fn try_from(wire: RecipeWire) -> Result<Self, Self::Error> {
        let id = match wire.id {
            Some(WireId::Text(id)) if !id.trim().is_empty() => id,
            Some(WireId::Number(n)) => n.to_string(),
            _ => return Err("recipe is missing an id".to_string()),
        };
        let name = wire
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| format!("recipe {id} is missing a name"))?;
        Ok(Recipe {
            id,
            name,
            image: wire.image.unwrap_or_default(),
            short: wire.short.unwrap_or_default(),
            ingredients: wire.ingredients,
            instructions: wire.instructions,
            expanded: wire.expanded,
        })
    }
}

// ============================================================================
// POST /api/recipes
// ============================================================================

/// Body of a suggestions fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCriteria {
    pub ingredients: String,
    pub cuisine: String,
    pub diet: String,
    pub difficulty: Difficulty,
    pub meal: String,
    /// Omitted from the body unless set
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub broaden: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestionsResponse {
    #[serde(default)]
    pub cards: Option<Vec<Recipe>>,
}

/// Outcome of a successful suggestions fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestions {
    Cards(Vec<Recipe>),
    /// Valid response with zero matches
    Empty,
}

impl From<SuggestionsResponse> for Suggestions {
    fn from(response: SuggestionsResponse) -> Self {
        match response.cards {
            Some(cards) if !cards.is_empty() => Suggestions::Cards(cards),
            _ => Suggestions::Empty,
        }
    }
}

// ============================================================================
// POST /api/cache-image
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheImageRequest {
    pub url: String,
    pub name: String,
    pub cuisine: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CacheImageResponse {
    #[serde(default)]
    pub local: Option<String>,
}

// ============================================================================
// POST /api/expand-recipe
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ExpandRequest<'a> {
    pub id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpandResponse {
    #[serde(default)]
    pub expanded: Option<ExpandedContent>,
}

/// Detailed lists returned by an expand call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedContent {
    #[serde(default)]
    pub ingredients_detailed: Vec<String>,
    #[serde(default)]
    pub instructions_detailed: Vec<String>,
}

// ============================================================================
// POST /api/feedback and /api/recipe-feedback
// ============================================================================

/// Answers collected so far, attached to conversational feedback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackContext {
    pub ingredients: String,
    pub cuisine: String,
    pub diet: String,
    pub difficulty: Option<Difficulty>,
    pub meal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub feedback: String,
    pub context: FeedbackContext,
    #[serde(rename = "final", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_final: bool,
}

/// Star rating plus comment for the recipe on screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeFeedback {
    pub rating: u8,
    pub comment: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub recipe: String,
}
