//! Category API endpoints
//!
//! Handles HTTP requests for categories:
//! - GET /api/v1/categories - Flat category list
//! - GET /api/v1/categories/tree - Nested category tree
//! - GET /api/v1/categories/{slug}/posts - Published posts in a category
//! - POST /api/v1/categories - Create a category (requires auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::posts::{ListPostsQuery, PostListResponse, PostResponse};
use crate::models::{Category, CategoryTree, CreateCategoryInput};

/// Build public category routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/tree", get(category_tree))
        .route("/{slug}/posts", get(posts_in_category))
}

/// Build protected category routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/", post(create_category))
}

/// GET /api/v1/categories - Flat category list
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    // The tree flattens back losslessly; reuse the ordered repository list
    let tree = state.category_service.tree().await?;

    fn flatten(nodes: Vec<CategoryTree>, out: &mut Vec<Category>) {
        for node in nodes {
            out.push(node.category);
            flatten(node.children, out);
        }
    }

    let mut categories = Vec::new();
    flatten(tree, &mut categories);
    Ok(Json(categories))
}

/// GET /api/v1/categories/tree - Nested category tree
async fn category_tree(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryTree>>, ApiError> {
    let tree = state.category_service.tree().await?;
    Ok(Json(tree))
}

/// GET /api/v1/categories/{slug}/posts - Published posts in a category
async fn posts_in_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(10);

    let (posts, total) = state
        .post_service
        .list_published_in_category(&slug, page, per_page)
        .await?;

    Ok(Json(PostListResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// Request body for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub title: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub sort_order: Option<i32>,
}

/// POST /api/v1/categories - Create a category
async fn create_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .category_service
        .create(CreateCategoryInput {
            title: body.title,
            slug: body.slug,
            parent_id: body.parent_id,
            sort_order: body.sort_order,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}
