use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::{ai::AiError, media::MediaError};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    NotFound,
    Unauthorized,
    InternalServerError,
    BadRequest(String),
    Conflict(String),
    Validation(validator::ValidationErrors),
    DatabaseError(sqlx::Error),
    InvalidHashFormat(argon2::password_hash::Error),
    Service(String),
    Forbidden,
}

impl Error {
    /// Message shown to the caller; server-side details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound => "Resource not found".to_string(),
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::InternalServerError => "Internal server error".to_string(),
            Self::BadRequest(msg) | Self::Conflict(msg) | Self::Service(msg) => msg.clone(),
            Self::Validation(errors) => validation_message(errors),
            Self::DatabaseError(_) => "Database Error".to_string(),
            Self::InvalidHashFormat(_) => "Invalid hash format".to_string(),
            Self::Forbidden => "Forbidden".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Service(_) => StatusCode::BAD_GATEWAY,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InternalServerError | Self::DatabaseError(_) | Self::InvalidHashFormat(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

// First message of each failing field, in field order, without repeats.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let mut messages: Vec<String> = Vec::new();
    for (field, errs) in fields {
        let Some(err) = errs.first() else { continue };
        let message = err
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("{field} is invalid"));
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    messages.join(" ")
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        error!("Database error: {:?}", err);
        Self::DatabaseError(err)
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        error!("Invalid hash format");
        Self::InvalidHashFormat(err)
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err)
    }
}

impl From<AiError> for Error {
    fn from(err: AiError) -> Self {
        warn!("Generation service error: {}", err);
        Self::Service(err.to_string())
    }
}

impl From<MediaError> for Error {
    fn from(err: MediaError) -> Self {
        warn!("Media service error: {}", err);
        match err {
            MediaError::NotAnImage | MediaError::Empty => Self::BadRequest(err.to_string()),
            MediaError::NotConfigured => Self::Service(err.to_string()),
            _ => Self::Service("Failed to upload image.".to_string()),
        }
    }
}

// Extractor rejections keep the `{"error": ...}` body instead of axum's plain text.
fn rejected(kind: &str, detail: String) -> Error {
    debug!("Rejected {}: {}", kind, detail);
    Error::BadRequest(detail)
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        rejected("JSON body", rejection.body_text())
    }
}

impl From<FormRejection> for Error {
    fn from(rejection: FormRejection) -> Self {
        rejected("form body", rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        rejected("path", rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        rejected("query string", rejection.body_text())
    }
}
