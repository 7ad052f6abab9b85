//! Inkpress - a small publishing system

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpress::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxPostRepository, SqlxProfileRepository,
            SqlxSessionRepository, SqlxUserRepository,
        },
    },
    services::{CategoryService, PostService, ProfileService, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpress=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Inkpress...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!("Applied {} database migration(s)", applied);
    }

    let upload_config = Arc::new(config.upload.clone());

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let profile_repo = SqlxProfileRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        profile_repo.clone(),
        session_repo,
    ));
    let profile_service = Arc::new(ProfileService::new(
        user_repo,
        profile_repo,
        upload_config.clone(),
    ));
    let post_service = Arc::new(PostService::new(
        post_repo,
        category_repo.clone(),
        upload_config,
    ));
    let category_service = Arc::new(CategoryService::new(category_repo));

    let state = AppState {
        pool: pool.clone(),
        user_service,
        profile_service,
        post_service,
        category_service,
    };

    let app = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}
