//! Client side of the generative-language service.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::ai::GenerationChunk;

pub mod gemini;

pub use gemini::GeminiClient;

/// Chunks of a streamed generation. Dropping the stream releases the
/// underlying connection.
pub type ChunkStream = BoxStream<'static, Result<GenerationChunk, AiError>>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Gemini API key not configured")]
    MissingApiKey,

    #[error("request to the generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response from the generation service: {0}")]
    Decode(String),
}

/// A remote model that turns prompts into text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// One blocking generation; the full text of the first candidate.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;

    /// Starts a streamed generation. The request is issued here; chunks
    /// arrive lazily as the returned stream is polled.
    async fn stream(&self, prompt: &str) -> Result<ChunkStream, AiError>;

    async fn count_tokens(&self, prompt: &str) -> Result<u32, AiError>;
}
