use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response as AxumResponse},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        posts::{CreatePostForm, PostChanges, SaveIntent, UpdatePostForm},
        response::Response,
    },
    services::autosave::AutosaveStatus,
    AppState, Error, Result,
};

const POSTS_PAGE: &str = "/admin/posts";

pub fn posts_handler() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/posts", get(get_posts).post(create_post))
        .route("/posts/filter/{tag_name}", get(get_posts_by_tag))
        .route(
            "/posts/{id}",
            get(get_post).post(update_post).delete(delete_post),
        )
        .route("/posts/{id}/delete", post(delete_post_form))
        .route(
            "/posts/{id}/autosave",
            get(autosave_status).post(autosave),
        )
}

#[derive(Debug, Serialize)]
struct AutosaveResponse {
    status: AutosaveStatus,
    message: &'static str,
}

impl From<AutosaveStatus> for AutosaveResponse {
    fn from(status: AutosaveStatus) -> Self {
        Self {
            status,
            message: status.message(),
        }
    }
}

async fn dashboard(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let stats = app_state.posts_service.dashboard_stats().await?;
    Ok(Json(stats))
}

async fn get_posts(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let posts = app_state.posts_service.get_posts().await?;
    Ok((StatusCode::OK, Json(posts)))
}

async fn get_posts_by_tag(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(tag_name), _): WithRejection<Path<String>, Error>,
) -> Result<impl IntoResponse> {
    let posts = app_state.posts_service.get_posts_by_tag(&tag_name).await?;
    Ok(Json(posts))
}

async fn create_post(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Form(form), _): WithRejection<Form<CreatePostForm>, Error>,
) -> Result<impl IntoResponse> {
    form.validate()?;

    app_state.posts_service.create_post(form.into()).await?;

    Ok(Redirect::to(POSTS_PAGE))
}

async fn get_post(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<impl IntoResponse> {
    let post = app_state.posts_service.get_post(post_id).await?;
    Ok(Json(post))
}

async fn update_post(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Form(form), _): WithRejection<Form<UpdatePostForm>, Error>,
) -> Result<AxumResponse> {
    form.validate()?;
    let intent = form.intent;
    let changes: PostChanges = form.into();

    // An explicit save supersedes whatever autosave still has queued.
    app_state.autosaver.discard(post_id).await;
    app_state
        .posts_service
        .update_post(post_id, &changes)
        .await?;

    let response = match intent {
        SaveIntent::SaveAndClose => Redirect::to(POSTS_PAGE).into_response(),
        SaveIntent::Autosave => {
            Json(Response::success("Post updated successfully.")).into_response()
        }
    };

    Ok(response)
}

async fn delete_post(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<impl IntoResponse> {
    app_state.autosaver.discard(post_id).await;
    app_state.posts_service.delete_post(post_id).await?;

    Ok(Json(Response::success("Post deleted.")))
}

async fn delete_post_form(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<impl IntoResponse> {
    app_state.autosaver.discard(post_id).await;
    app_state.posts_service.delete_post(post_id).await?;

    Ok(Redirect::to(POSTS_PAGE))
}

async fn autosave(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Form(form), _): WithRejection<Form<UpdatePostForm>, Error>,
) -> Result<impl IntoResponse> {
    form.validate()?;

    // Unknown posts fail here rather than later in the background.
    app_state.posts_service.get_post(post_id).await?;
    let status = app_state.autosaver.submit(post_id, form.into()).await;

    Ok((StatusCode::ACCEPTED, Json(AutosaveResponse::from(status))))
}

async fn autosave_status(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<impl IntoResponse> {
    let status = app_state.autosaver.status(post_id).await;
    Ok(Json(AutosaveResponse::from(status)))
}
