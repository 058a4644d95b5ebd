use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generated text plus its HTML rendering.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub text: String,
    pub html: String,
}

/// One piece of a streamed generation, in arrival order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GenerationChunk {
    pub text: String,
    #[serde(rename = "isComplete")]
    pub is_complete: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PromptDto {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Please enter a prompt"))]
    pub prompt: String,
}

/// Inputs of the article drafting panel.
#[derive(Debug, Deserialize, Validate)]
pub struct ArticleRequestDto {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter both title and product specifications"))]
    pub title: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter both title and product specifications"))]
    pub specs: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContentDto {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add content first."))]
    pub content: String,
    /// Tags already on the post, comma-separated.
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub content: GeneratedContent,
    #[serde(rename = "tokenCount")]
    pub token_count: u32,
}

#[derive(Debug, Serialize)]
pub struct TokenCountResponse {
    #[serde(rename = "totalTokens")]
    pub total_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct MetaDescriptionResponse {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestedTagsResponse {
    /// Raw suggestion, comma-separated.
    pub tags: String,
    /// Existing tags followed by the new suggestions.
    pub merged: String,
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}
