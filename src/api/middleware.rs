//! API middleware
//!
//! Authentication middleware and the shared application state. The
//! session token is read from a `session` cookie or a Bearer header and
//! resolved to a user which is injected into request extensions; handlers
//! never reach for ambient globals.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    CategoryService, PostService, ProfileService, UserService, UserServiceError, ValidationErrors,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub profile_service: Arc<ProfileService>,
    pub post_service: Arc<PostService>,
    pub category_service: Arc<CategoryService>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Build a 400 with per-field messages in `details`
    pub fn validation(errors: &ValidationErrors) -> Self {
        Self::with_details(
            "VALIDATION_ERROR",
            "Validation failed",
            serde_json::to_value(errors).unwrap_or(serde_json::Value::Null),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(ref errors) => ApiError::validation(errors),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::SessionExpired => ApiError::unauthorized("Session expired"),
            UserServiceError::SessionNotFound => ApiError::unauthorized("Invalid session"),
            UserServiceError::InternalError(e) => {
                tracing::error!(error = %e, "User service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<crate::services::ProfileServiceError> for ApiError {
    fn from(err: crate::services::ProfileServiceError) -> Self {
        use crate::services::ProfileServiceError;
        match err {
            ProfileServiceError::NotFound(msg) => ApiError::not_found(msg),
            ProfileServiceError::ValidationError(ref errors) => ApiError::validation(errors),
            ProfileServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Profile service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<crate::services::PostServiceError> for ApiError {
    fn from(err: crate::services::PostServiceError) -> Self {
        use crate::services::PostServiceError;
        match err {
            PostServiceError::NotFound(msg) => ApiError::not_found(msg),
            PostServiceError::ValidationError(ref errors) => ApiError::validation(errors),
            PostServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Post service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<crate::services::CategoryServiceError> for ApiError {
    fn from(err: crate::services::CategoryServiceError) -> Self {
        use crate::services::CategoryServiceError;
        match err {
            CategoryServiceError::NotFound(msg) => ApiError::not_found(msg),
            CategoryServiceError::ValidationError(ref errors) => ApiError::validation(errors),
            CategoryServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Category service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(ApiError::from)?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        if let Ok(user) = state.user_service.validate_session(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}
