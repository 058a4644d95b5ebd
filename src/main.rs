use std::sync::Arc;

use blog_cms_backend::{
    ai::{GeminiClient, LanguageModel},
    config::Config,
    media::{CloudinaryClient, MediaHost},
    repositories::{InMemoryRepo, PostgresRepo},
    routes::create_routes,
    services::auth::hash_password,
    telemetry, AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    telemetry::init_tracing();

    // `blog-cms-backend hash-password <password>` prints a value for ADMIN_PASSWORD_HASH.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("hash-password") {
        match args.get(2).map(|password| hash_password(password)) {
            Some(Ok(hash)) => println!("{hash}"),
            Some(Err(err)) => {
                error!("Failed to hash password: {}", err.message());
                std::process::exit(1);
            }
            None => {
                eprintln!("usage: blog-cms-backend hash-password <password>");
                std::process::exit(2);
            }
        }
        return;
    }

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let model: Arc<dyn LanguageModel> =
        match GeminiClient::new(config.gemini_api_key.clone(), Some(config.gemini_model.clone())) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                error!("Failed to set up the Gemini client: {}", err);
                std::process::exit(1);
            }
        };

    let media_host: Option<Arc<dyn MediaHost>> = match config.cloudinary.clone() {
        Some(cloudinary) => Some(Arc::new(CloudinaryClient::new(cloudinary))),
        None => {
            warn!("Cloudinary is not configured; image uploads are disabled");
            None
        }
    };

    let app_state = match config.database_url.clone() {
        Some(database_url) => {
            let pool = match PgPoolOptions::new()
                .max_connections(10)
                .connect(&database_url)
                .await
            {
                Ok(pool) => {
                    info!("Connection to the database is successful");
                    pool
                }
                Err(err) => {
                    error!("Failed to connect to the database: {:?}", err);
                    std::process::exit(1);
                }
            };

            let repo = PostgresRepo::new(pool);
            if let Err(err) = repo.migrate().await {
                error!("Failed to run migrations: {:?}", err);
                std::process::exit(1);
            }

            AppState::new(config.clone(), Arc::new(repo), model, media_host)
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store, data is lost on restart");
            AppState::new(config.clone(), Arc::new(InMemoryRepo::new()), model, media_host)
        }
    };

    let app = create_routes(Arc::new(app_state));

    let address = format!("[::]:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {}: {}", address, err);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", address);
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
}
