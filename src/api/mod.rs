//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for inkpress:
//! - Auth endpoints (register, login, logout, me)
//! - Profile endpoints including the combined account + profile edit
//! - Post endpoints
//! - Category endpoints

pub mod auth;
pub mod categories;
pub mod middleware;
pub mod posts;
pub mod profiles;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need auth)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/users", profiles::protected_router())
        .nest("/posts", posts::protected_router())
        .nest("/categories", categories::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/users", profiles::public_router())
        .nest("/posts", posts::public_router())
        .nest("/categories", categories::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin, allowing none");
            CorsLayer::new()
        }
    };

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
