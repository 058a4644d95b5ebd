use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        response::Response,
        tags::{CreateTagForm, RenameTagForm},
    },
    AppState, Error, Result,
};

pub fn tags_handler() -> Router {
    Router::new()
        .route("/tags", get(get_tags).post(create_tag))
        .route("/tags/{id}", post(rename_tag).delete(delete_tag))
        .route("/tags/{id}/delete", post(delete_tag_form))
}

async fn get_tags(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let tags = app_state.tags_service.get_tags().await?;
    Ok(Json(tags))
}

async fn create_tag(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Form(form), _): WithRejection<Form<CreateTagForm>, Error>,
) -> Result<impl IntoResponse> {
    form.validate()?;

    let tag = app_state.tags_service.create_tag(&form.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(Response::success(format!(
            "Tag \"{}\" created successfully.",
            tag.name
        ))),
    ))
}

async fn rename_tag(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(tag_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Form(form), _): WithRejection<Form<RenameTagForm>, Error>,
) -> Result<impl IntoResponse> {
    form.validate()?;

    let tag = app_state.tags_service.rename_tag(tag_id, &form.name).await?;

    Ok(Json(Response::success(format!(
        "Tag renamed to \"{}\".",
        tag.name
    ))))
}

async fn delete_tag(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(tag_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<impl IntoResponse> {
    let tag = app_state.tags_service.delete_tag(tag_id).await?;

    Ok(Json(Response::success(format!(
        "Tag \"{}\" has been deleted.",
        tag.name
    ))))
}

async fn delete_tag_form(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(tag_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<impl IntoResponse> {
    app_state.tags_service.delete_tag(tag_id).await?;
    Ok(Redirect::to("/admin/tags"))
}
