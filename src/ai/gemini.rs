use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::models::ai::GenerationChunk;

use super::{AiError, ChunkStream, LanguageModel};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// REST client for the Gemini `generateContent` family of endpoints.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Result<Self, AiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    async fn post(&self, url: &str, prompt: &str) -> Result<reqwest::Response, AiError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status,
                message: api_error_message(&body),
            });
        }

        Ok(response)
    }

    async fn post_json<T: DeserializeOwned>(&self, method: &str, prompt: &str) -> Result<T, AiError> {
        let body = self.post(&self.endpoint(method), prompt).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| AiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "generateContent");
        let response: GenerateContentResponse = self.post_json("generateContent", prompt).await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            warn!(reason, "prompt was blocked by the generation service");
        }

        Ok(response.text())
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream, AiError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "streamGenerateContent");
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(&url, prompt).await?;

        let bytes = response
            .bytes_stream()
            .map(|r| r.map(|b| b.to_vec()))
            .boxed();

        Ok(sse_chunks(bytes))
    }

    async fn count_tokens(&self, prompt: &str) -> Result<u32, AiError> {
        let response: CountTokensResponse = self.post_json("countTokens", prompt).await?;
        Ok(response.total_tokens)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated; empty when the
    /// service returned no candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn is_finished(&self) -> bool {
        self.candidates
            .first()
            .is_some_and(|c| c.finish_reason.is_some())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountTokensResponse {
    #[serde(rename = "totalTokens", default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn parse_chunk(data: &str) -> Result<GenerationChunk, AiError> {
    let response: GenerateContentResponse =
        serde_json::from_str(data).map_err(|e| AiError::Decode(e.to_string()))?;

    Ok(GenerationChunk {
        text: response.text(),
        is_complete: response.is_finished(),
    })
}

/// Incremental decoder for `text/event-stream` bodies. Yields the `data`
/// payload of every complete event.
#[derive(Debug, Default)]
struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&rest);
            self.line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        self.line("", &mut events);
        events
    }

    fn line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(self.data.join("\n"));
                self.data.clear();
            }
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }
}

struct SseState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<GenerationChunk, AiError>>,
    done: bool,
}

impl SseState {
    fn queue(&mut self, events: Vec<String>) {
        for data in events {
            let chunk = parse_chunk(&data);
            let failed = chunk.is_err();
            self.pending.push_back(chunk);
            if failed {
                self.done = true;
                break;
            }
        }
    }
}

fn sse_chunks(bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> ChunkStream {
    let state = SseState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(&bytes);
                    state.queue(events);
                }
                Some(Err(err)) => {
                    state.done = true;
                    state.pending.push_back(Err(err.into()));
                }
                None => {
                    let events = state.decoder.finish();
                    state.queue(events);
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn missing_key_fails_at_construction() {
        assert!(matches!(
            GeminiClient::new("", None),
            Err(AiError::MissingApiKey)
        ));
        assert!(matches!(
            GeminiClient::new("   ", None),
            Err(AiError::MissingApiKey)
        ));
    }

    #[test]
    fn model_defaults_when_unset() {
        let client = GeminiClient::new("key", None).unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);

        let client = GeminiClient::new("key", Some("gemini-2.0-flash".into())).unwrap();
        assert_eq!(client.model(), "gemini-2.0-flash");
        assert_eq!(
            client.endpoint("countTokens"),
            format!("{DEFAULT_BASE_URL}/models/gemini-2.0-flash:countTokens")
        );
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}],"role":"model"}},
                             {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Hello there");
        assert!(!response.is_finished());

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(blocked.text(), "");
    }

    #[test]
    fn api_error_message_prefers_structured_body() {
        assert_eq!(
            api_error_message(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#),
            "API key not valid"
        );
        assert_eq!(api_error_message("upstream timeout\n"), "upstream timeout");
    }

    #[test]
    fn sse_decoder_handles_split_events() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\r\n\r\ndata: {\"b\":2}\n"), vec![r#"{"a":1}"#]);
        assert_eq!(decoder.push(b"\n: comment\n"), vec![r#"{"b":2}"#]);
        assert_eq!(decoder.push(b"data: {\"c\":3}"), Vec::<String>::new());
        assert_eq!(decoder.finish(), vec![r#"{"c":3}"#]);
    }

    #[test]
    fn sse_decoder_keeps_multibyte_text_across_chunks() {
        let mut decoder = SseDecoder::default();
        let event = "data: {\"t\":\"café\"}\n\n".as_bytes();
        let split = event.iter().position(|b| *b == 0xc3).unwrap() + 1;
        assert!(decoder.push(&event[..split]).is_empty());
        assert_eq!(decoder.push(&event[split..]), vec![r#"{"t":"café"}"#]);
    }

    #[tokio::test]
    async fn sse_chunks_arrive_in_order_and_mark_completion() {
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"One \"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"two \"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"three\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );
        // Deliver the body in small, uneven pieces.
        let pieces: Vec<reqwest::Result<Vec<u8>>> = body
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(c.to_vec()))
            .collect();

        let chunks: Vec<GenerationChunk> = sse_chunks(futures::stream::iter(pieces).boxed())
            .map(|c| c.unwrap())
            .collect()
            .await;

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["One ", "two ", "three"]);
        assert_eq!(
            chunks.iter().map(|c| c.is_complete).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    /// Sets its flag when the body it belongs to is dropped.
    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn dropping_the_chunk_stream_releases_the_body() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = ReleaseFlag(released.clone());

        let first = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"One \"}]}}]}\n\n";
        // The body never ends on its own, as with a connection still open.
        let body: BoxStream<'static, reqwest::Result<Vec<u8>>> =
            futures::stream::iter(vec![Ok(first.as_bytes().to_vec())])
                .chain(futures::stream::pending())
                .map(move |piece| {
                    let _held = &flag;
                    piece
                })
                .boxed();

        let mut chunks = sse_chunks(body);
        let chunk = chunks.next().await.unwrap().unwrap();
        assert_eq!(chunk.text, "One ");
        assert!(!released.load(Ordering::SeqCst));

        drop(chunks);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn sse_chunks_stop_after_a_malformed_event() {
        let body = "data: not json\n\ndata: {\"candidates\":[]}\n\n";
        let items: Vec<_> = sse_chunks(futures::stream::iter(vec![Ok(body.as_bytes().to_vec())]).boxed())
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AiError::Decode(_))));
    }
}
