use std::sync::Arc;

use axum::{
    http::StatusCode, middleware, response::IntoResponse, routing::get, Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use validator::Validate;

use crate::{
    middleware::{auth, AdminSession},
    models::posts::{CreatePostDto, NewPost, Post},
    AppState, Error, Result,
};

pub fn api_handler() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/posts", get(get_posts).post(create_post))
        .route_layer(middleware::from_fn(auth))
}

async fn me(Extension(session): Extension<AdminSession>) -> impl IntoResponse {
    Json(json!({ "email": session.email }))
}

async fn get_posts(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let posts: Vec<Post> = app_state
        .posts_service
        .get_posts()
        .await?
        .into_iter()
        .map(|p| p.post)
        .collect();

    Ok((StatusCode::OK, Json(posts)))
}

async fn create_post(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(new_post), _): WithRejection<Json<CreatePostDto>, Error>,
) -> Result<impl IntoResponse> {
    new_post.validate()?;

    let post = app_state
        .posts_service
        .create_post(NewPost {
            title: new_post.title,
            content: new_post.content,
            published: false,
            image_url: None,
            meta_description: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}
