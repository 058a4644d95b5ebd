use std::sync::Arc;

use ai::LanguageModel;
use config::Config;
use media::MediaHost;
use repositories::{PostsRepository, TagsRepository};
use services::{
    ai::AiService, auth::AuthService, autosave::Autosaver, media::MediaService,
    posts::PostsService, tags::TagsService,
};

pub use self::errors::{Error, Result};

pub mod ai;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod markdown;
pub mod media;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod slug;
pub mod telemetry;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub auth_service: AuthService,
    pub posts_service: PostsService,
    pub tags_service: TagsService,
    pub ai_service: AiService,
    pub media_service: MediaService,
    pub autosaver: Autosaver,
}

impl AppState {
    /// Wires the services over the given collaborators.
    pub fn new<R>(
        config: Config,
        repo: Arc<R>,
        model: Arc<dyn LanguageModel>,
        media_host: Option<Arc<dyn MediaHost>>,
    ) -> Self
    where
        R: PostsRepository + TagsRepository + 'static,
    {
        let posts_service = PostsService::new(repo.clone());
        let autosaver = Autosaver::new(posts_service.clone(), config.autosave_debounce);

        Self {
            auth_service: AuthService::new(
                config.admin_email.clone(),
                config.admin_password_hash.clone(),
                config.jwt_secret.clone(),
                config.jwt_maxage,
            ),
            tags_service: TagsService::new(repo),
            ai_service: AiService::new(model),
            media_service: MediaService::new(media_host),
            posts_service,
            autosaver,
            config,
        }
    }
}
