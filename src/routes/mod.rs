use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware, Extension, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    handlers::{
        ai::ai_handler,
        api::api_handler,
        auth::{auth_handler, sign_in_handler},
        images::images_handler,
        posts::posts_handler,
        public::public_handler,
        tags::tags_handler,
    },
    middleware::auth_or_redirect,
    AppState,
};

pub fn create_routes(app_state: Arc<AppState>) -> Router {
    let admin_route = Router::new()
        .merge(posts_handler())
        .merge(tags_handler())
        .merge(images_handler())
        .merge(ai_handler())
        .route_layer(middleware::from_fn(auth_or_redirect));

    let cors = configure_cors(app_state.config.cors_origin.as_deref());

    Router::new()
        .merge(public_handler())
        .merge(sign_in_handler())
        .nest("/auth", auth_handler())
        .nest("/api", api_handler())
        .nest("/admin", admin_route)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(app_state))
}

fn configure_cors(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        Some(Err(_)) => {
            warn!("CORS_ORIGIN is not a valid header value; cross-origin requests are refused");
            layer
        }
        None => layer,
    }
}
