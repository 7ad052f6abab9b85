//! Post API endpoints
//!
//! Handles HTTP requests for blog posts:
//! - GET /api/v1/posts - List published posts (pinned first, newest first)
//! - GET /api/v1/posts/{slug} - Get a published post
//! - POST /api/v1/posts - Create a post (requires auth)
//! - PUT /api/v1/posts/{slug} - Update a post (requires auth)
//! - DELETE /api/v1/posts/{slug} - Delete a post (requires auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreatePostInput, Post, PostFilter, UpdatePostInput};

/// Default page size for post listings
const DEFAULT_PER_PAGE: i64 = 10;

/// Query parameters for post listings
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Post response body
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub text: String,
    pub thumbnail: Option<String>,
    pub status: String,
    pub category_id: i64,
    pub author_id: i64,
    pub updater_id: Option<i64>,
    pub fixed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            description: post.description,
            text: post.text,
            thumbnail: post.thumbnail,
            status: post.status.to_string(),
            category_id: post.category_id,
            author_id: post.author_id,
            updater_id: post.updater_id,
            fixed: post.fixed,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

/// Paginated post list response
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Build public post routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{slug}", get(get_post))
}

/// Build protected post routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/{slug}", put(update_post).delete(delete_post))
}

/// GET /api/v1/posts - List published posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);

    let (posts, total) = state
        .post_service
        .list(&PostFilter::published(), page, per_page)
        .await?;

    Ok(Json(PostListResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// GET /api/v1/posts/{slug} - Get a published post
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get_published_by_slug(&slug).await?;

    Ok(Json(PostResponse::from(post)))
}

/// POST /api/v1/posts - Create a post
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(&user.0, input).await?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// PUT /api/v1/posts/{slug} - Update a post
async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    let existing = state.post_service.get_by_slug(&slug).await?;
    let updated = state.post_service.update(&user.0, existing.id, input).await?;

    Ok(Json(PostResponse::from(updated)))
}

/// DELETE /api/v1/posts/{slug} - Delete a post
async fn delete_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = state.post_service.get_by_slug(&slug).await?;
    state.post_service.delete(existing.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
