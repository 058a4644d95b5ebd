use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing::debug;

use crate::{AppState, Error, Result};

pub const SIGN_IN_PATH: &str = "/sign-in";

/// The authenticated administrator, available to handlers behind the gates.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub email: String,
}

fn session_token(req: &Request) -> Option<String> {
    let cookies = CookieJar::from_headers(req.headers());

    cookies
        .get("token")
        .map(|c| c.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|stripped| stripped.to_string())
                })
        })
}

fn authenticate(req: &Request) -> Result<AdminSession> {
    let app_state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(Error::InternalServerError)?;

    let token = session_token(req).ok_or(Error::Unauthorized)?;
    let email = app_state.auth_service.decode_token(token)?;

    Ok(AdminSession { email })
}

/// Gate for JSON endpoints: unauthenticated requests get a 401.
pub async fn auth(mut req: Request, next: Next) -> Result<impl IntoResponse> {
    let session = authenticate(&req)?;
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

/// Gate for the admin area: unauthenticated requests are sent to sign in.
pub async fn auth_or_redirect(mut req: Request, next: Next) -> Response {
    match authenticate(&req) {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(Error::Unauthorized) => {
            debug!(path = %req.uri().path(), "redirecting unauthenticated request");
            Redirect::to(SIGN_IN_PATH).into_response()
        }
        Err(err) => err.into_response(),
    }
}
