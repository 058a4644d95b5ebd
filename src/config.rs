//! Application configuration loaded from the environment (and `.env`).

use std::{env, time::Duration};

use thiserror::Error;

use crate::ai::gemini::DEFAULT_MODEL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set and non-empty")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the service against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in minutes.
    pub jwt_maxage: i64,
    pub admin_email: String,
    pub admin_password_hash: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub cloudinary: Option<CloudinaryConfig>,
    pub public_base_url: String,
    pub port: u16,
    pub autosave_debounce: Duration,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn init() -> Result<Self, ConfigError> {
        let cloudinary = match (
            optional("CLOUDINARY_CLOUD_NAME"),
            optional("CLOUDINARY_API_KEY"),
            optional("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            jwt_secret: required("JWT_SECRET")?,
            jwt_maxage: parsed("JWT_MAXAGE", 60)?,
            admin_email: required("ADMIN_EMAIL")?,
            admin_password_hash: required("ADMIN_PASSWORD_HASH")?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            cloudinary,
            public_base_url: optional("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            port: parsed("PORT", 8080)?,
            autosave_debounce: Duration::from_millis(parsed("AUTOSAVE_DEBOUNCE_MS", 2500)?),
            cors_origin: optional("CORS_ORIGIN"),
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: value.clone(),
        }),
        None => Ok(default),
    }
}
