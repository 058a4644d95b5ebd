use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use tower_cookies::Cookie;
use validator::Validate;

use crate::{
    models::{
        response::Response,
        users::{LoginUserDto, UserLoginResponseDto},
    },
    AppState, Error, Result,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn sign_in_handler() -> Router {
    Router::new().route("/sign-in", get(sign_in))
}

fn set_cookie(cookie: Cookie<'_>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value =
        HeaderValue::from_str(&cookie.to_string()).map_err(|_| Error::InternalServerError)?;
    headers.append(header::SET_COOKIE, value);
    Ok(headers)
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(user), _): WithRejection<Json<LoginUserDto>, Error>,
) -> Result<impl IntoResponse> {
    user.validate()?;

    let token = app_state.auth_service.login(&user.email, &user.password)?;

    let cookie_duration = time::Duration::minutes(app_state.auth_service.jwt_maxage());
    let cookie = Cookie::build(("token", token.clone()))
        .path("/")
        .max_age(cookie_duration)
        .http_only(true)
        .build();

    let response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
    });

    Ok((set_cookie(cookie)?, response))
}

pub async fn logout() -> Result<impl IntoResponse> {
    let cookie = Cookie::build(("token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    Ok((
        set_cookie(cookie)?,
        Json(Response::success("Logged out.")),
    ))
}

async fn sign_in() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(Response::success("Sign in with POST /auth/login.")),
    )
}
