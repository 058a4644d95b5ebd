use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use tracing::warn;

use crate::{models::response::ImageUploadResponse, AppState, Error, Result};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn images_handler() -> Router {
    Router::new()
        .route("/images", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Multipart upload with the file in the `image` field.
async fn upload_image(
    Extension(app_state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        warn!("Malformed multipart body: {}", err);
        Error::BadRequest("No image provided.".to_string())
    })? {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| Error::BadRequest("No image provided.".to_string()))?;
            image = Some(bytes);
            break;
        }
    }

    let bytes = image.ok_or_else(|| Error::BadRequest("No image provided.".to_string()))?;
    let image_url = app_state.media_service.upload_image(&bytes).await?;

    Ok(Json(ImageUploadResponse { image_url }))
}
