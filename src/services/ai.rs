use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::{
    ai::LanguageModel,
    markdown,
    models::ai::{GeneratedContent, GenerationChunk, SuggestedTagsResponse},
    Error, Result,
};

pub mod prompts;

/// Ordered chunks of one streamed generation. Dropping it cancels the
/// remote request.
pub type GenerationStream = BoxStream<'static, Result<GenerationChunk>>;

/// Authoring assistant on top of a [`LanguageModel`].
#[derive(Clone)]
pub struct AiService {
    model: Arc<dyn LanguageModel>,
}

impl AiService {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn generate_article(&self, prompt: &str) -> Result<GeneratedContent> {
        let text = self.model.generate(prompt).await?;
        let html = markdown::to_html(&text);

        debug!(chars = text.len(), "article generated");
        Ok(GeneratedContent { text, html })
    }

    /// Generation plus the token count of the prompt.
    pub async fn generate(&self, prompt: &str) -> Result<(GeneratedContent, u32)> {
        let (tokens, content) =
            tokio::try_join!(self.count_tokens(prompt), self.generate_article(prompt))?;

        Ok((content, tokens))
    }

    pub async fn draft_article(
        &self,
        title: &str,
        keyword: &str,
        specs: &str,
    ) -> Result<GeneratedContent> {
        self.generate_article(&prompts::article_prompt(title, keyword, specs))
            .await
    }

    pub async fn generate_content_stream(&self, prompt: &str) -> Result<GenerationStream> {
        let chunks = self.model.stream(prompt).await?;
        Ok(chunks.map_err(Error::from).boxed())
    }

    pub async fn count_tokens(&self, prompt: &str) -> Result<u32> {
        Ok(self.model.count_tokens(prompt).await?)
    }

    pub async fn meta_description(&self, content: &str) -> Result<String> {
        let raw = self
            .model
            .generate(&prompts::meta_description_prompt(content))
            .await?;

        Ok(prompts::clean_output(&raw))
    }

    /// Suggested tags for a post body, and the editor's tag field with the
    /// new ones appended.
    pub async fn suggest_tags(
        &self,
        content: &str,
        existing: &str,
    ) -> Result<SuggestedTagsResponse> {
        let raw = self
            .model
            .generate(&prompts::tag_suggestion_prompt(content))
            .await?;
        let suggested = prompts::parse_tag_suggestion(&raw);

        Ok(SuggestedTagsResponse {
            tags: suggested.join(", "),
            merged: prompts::merge_tags(existing, &suggested),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ai::{AiError, ChunkStream};

    #[derive(Default)]
    struct ScriptedModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                ..Self::default()
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> std::result::Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        async fn stream(&self, _prompt: &str) -> std::result::Result<ChunkStream, AiError> {
            let words: Vec<String> = self.reply.split_inclusive(' ').map(str::to_string).collect();
            let last = words.len().saturating_sub(1);
            let chunks = words.into_iter().enumerate().map(move |(i, text)| {
                Ok(GenerationChunk {
                    text,
                    is_complete: i == last,
                })
            });
            Ok(futures::stream::iter(chunks).boxed())
        }

        async fn count_tokens(&self, prompt: &str) -> std::result::Result<u32, AiError> {
            Ok(prompt.split_whitespace().count() as u32)
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn generate(&self, _prompt: &str) -> std::result::Result<String, AiError> {
            Err(AiError::Api {
                status: 503,
                message: "overloaded".into(),
            })
        }

        async fn stream(&self, _prompt: &str) -> std::result::Result<ChunkStream, AiError> {
            Err(AiError::MissingApiKey)
        }

        async fn count_tokens(&self, _prompt: &str) -> std::result::Result<u32, AiError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn article_text_is_rendered_to_html() {
        let ai = AiService::new(ScriptedModel::replying("## Title\n\nSome **bold** text"));
        let (content, tokens) = ai.generate("write me a post").await.unwrap();

        assert_eq!(tokens, 4);
        assert_eq!(content.text, "## Title\n\nSome **bold** text");
        assert_eq!(
            content.html,
            "<h2>Title</h2>\n<p>Some <strong>bold</strong> text</p>"
        );
    }

    #[tokio::test]
    async fn stream_yields_chunks_in_order() {
        let ai = AiService::new(ScriptedModel::replying("one two three"));
        let chunks: Vec<GenerationChunk> = ai
            .generate_content_stream("count")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let text: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "one two three");
        assert_eq!(chunks.len(), 3);
        assert!(chunks.last().unwrap().is_complete);
        assert!(chunks[..2].iter().all(|c| !c.is_complete));
    }

    #[tokio::test]
    async fn remote_failures_become_service_errors() {
        let ai = AiService::new(Arc::new(FailingModel));

        match ai.generate_article("x").await {
            Err(Error::Service(msg)) => assert!(msg.contains("overloaded")),
            other => panic!("expected service error, got {other:?}"),
        }
        assert!(matches!(
            ai.generate_content_stream("x").await,
            Err(Error::Service(_))
        ));
    }

    #[tokio::test]
    async fn meta_description_prompt_quotes_truncated_body() {
        let model = ScriptedModel::replying("\"A crisp summary.\"");
        let ai = AiService::new(model.clone());

        let body = format!("<p>{}</p>", "x".repeat(3000));
        assert_eq!(ai.meta_description(&body).await.unwrap(), "A crisp summary.");

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].ends_with(&"x".repeat(1000)));
        assert!(!prompts[0].contains(&"x".repeat(1001)));
    }

    #[tokio::test]
    async fn suggested_tags_merge_into_existing() {
        let ai = AiService::new(ScriptedModel::replying("rust, web, axum"));
        let suggestion = ai.suggest_tags("<p>body</p>", "rust, backend").await.unwrap();

        assert_eq!(suggestion.tags, "rust, web, axum");
        assert_eq!(suggestion.merged, "rust, backend, web, axum");
    }
}
