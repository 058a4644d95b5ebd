use std::{convert::Infallible, sync::Arc};

use axum::{
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use futures::StreamExt;
use tracing::warn;
use validator::Validate;

use crate::{
    models::ai::{
        ArticleRequestDto, ContentDto, GenerateResponse, MetaDescriptionResponse, PromptDto,
        TokenCountResponse,
    },
    AppState, Error, Result,
};

pub fn ai_handler() -> Router {
    Router::new()
        .route("/ai/generate", post(generate))
        .route("/ai/article", post(article))
        .route("/ai/stream", post(stream))
        .route("/ai/tokens", post(count_tokens))
        .route("/ai/meta-description", post(meta_description))
        .route("/ai/tags", post(suggest_tags))
}

async fn generate(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<PromptDto>, Error>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let (content, token_count) = app_state.ai_service.generate(&body.prompt).await?;

    Ok(Json(GenerateResponse {
        content,
        token_count,
    }))
}

async fn article(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<ArticleRequestDto>, Error>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let content = app_state
        .ai_service
        .draft_article(&body.title, &body.keyword, &body.specs)
        .await?;

    Ok(Json(content))
}

/// Streams generated text as server-sent events: one `message` event per
/// chunk, an `error` event if the generation fails midway, then `done`.
async fn stream(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<PromptDto>, Error>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let chunks = app_state
        .ai_service
        .generate_content_stream(&body.prompt)
        .await?;

    let events = chunks
        .map(|chunk| {
            let event = match chunk {
                Ok(chunk) => Event::default().json_data(&chunk).unwrap_or_else(|err| {
                    warn!("Failed to encode chunk: {}", err);
                    Event::default().event("error").data("encoding failed")
                }),
                Err(err) => Event::default().event("error").data(err.message()),
            };
            Ok::<_, Infallible>(event)
        })
        .chain(futures::stream::once(async {
            Ok(Event::default().event("done").data("[DONE]"))
        }));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn count_tokens(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<PromptDto>, Error>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let total_tokens = app_state.ai_service.count_tokens(&body.prompt).await?;

    Ok(Json(TokenCountResponse { total_tokens }))
}

async fn meta_description(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<ContentDto>, Error>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let description = app_state.ai_service.meta_description(&body.content).await?;

    Ok(Json(MetaDescriptionResponse { description }))
}

async fn suggest_tags(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<ContentDto>, Error>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let suggestion = app_state
        .ai_service
        .suggest_tags(&body.content, &body.tags)
        .await?;

    Ok(Json(suggestion))
}
