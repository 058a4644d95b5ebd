use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::header,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;

use crate::{
    models::{query::PageQuery, response::Response},
    services::sitemap,
    AppState, Error, Result,
};

pub fn public_handler() -> Router {
    Router::new()
        .route("/blog", get(blog_index))
        .route("/blog/{slug}", get(blog_post))
        .route("/tags", get(tags_index))
        .route("/tags/cloud", get(tag_cloud))
        .route("/tags/{tag_name}", get(posts_by_tag))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/health", get(health))
}

async fn blog_index(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, Error>,
) -> Result<impl IntoResponse> {
    let page = app_state
        .posts_service
        .get_published_page(query.page())
        .await?;

    Ok(Json(page))
}

async fn blog_post(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(slug), _): WithRejection<Path<String>, Error>,
) -> Result<impl IntoResponse> {
    let post = app_state.posts_service.get_published_post(&slug).await?;
    Ok(Json(post))
}

async fn tags_index(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let tags = app_state.tags_service.get_public_tags().await?;
    Ok(Json(tags))
}

async fn tag_cloud(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let tags = app_state.tags_service.get_tag_cloud().await?;
    Ok(Json(tags))
}

async fn posts_by_tag(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(tag_name), _): WithRejection<Path<String>, Error>,
) -> Result<impl IntoResponse> {
    let posts = app_state
        .posts_service
        .get_published_by_tag(&tag_name)
        .await?;

    Ok(Json(posts))
}

async fn sitemap_xml(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let (posts, tags) = tokio::try_join!(
        app_state.posts_service.get_all_published(),
        app_state.tags_service.get_public_tags(),
    )?;

    let xml = sitemap::render(&app_state.config.public_base_url, &posts, &tags, Utc::now());

    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

async fn health() -> impl IntoResponse {
    Json(Response::success("ok"))
}
