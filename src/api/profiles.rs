//! Profile API endpoints
//!
//! Handles HTTP requests for public profile pages and the combined
//! account + profile edit:
//! - GET /api/v1/users/{slug} - Public profile detail
//! - PUT /api/v1/users/me/profile - Combined edit (requires auth)

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Profile, ProfileUpdateInput, User, UserUpdateInput};

/// Public profile detail response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub slug: String,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub birth_date: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileResponse {
    fn from_pair(user: &User, profile: &Profile) -> Self {
        Self {
            slug: profile.slug.clone(),
            username: user.username.clone(),
            display_name: user.display_name(),
            bio: profile.bio.clone(),
            birth_date: profile.birth_date.map(|d| d.to_string()),
            avatar: profile.avatar.clone(),
        }
    }
}

/// Request body for the combined edit.
///
/// Both payloads are required in full; the service validates them
/// together and writes both records in one transaction or neither.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub user: UserUpdateInput,
    pub profile: ProfileUpdateInput,
}

/// Response for a successful combined edit
#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub user: crate::api::auth::UserResponse,
    pub profile: ProfileResponse,
    /// Slug to address the profile with after the edit
    pub redirect_slug: String,
}

/// Build public profile routes
pub fn public_router() -> Router<AppState> {
    Router::new().route("/{slug}", get(get_profile))
}

/// Build protected profile routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me/profile", put(update_profile))
}

/// GET /api/v1/users/{slug} - Public profile detail
async fn get_profile(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (user, profile) = state.profile_service.get_by_slug(&slug).await?;

    Ok(Json(ProfileResponse::from_pair(&user, &profile)))
}

/// PUT /api/v1/users/me/profile - Combined account + profile edit
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    let outcome = state
        .profile_service
        .update(user.0.id, body.user, body.profile)
        .await?;

    let profile = ProfileResponse::from_pair(&outcome.user, &outcome.profile);

    Ok(Json(UpdateProfileResponse {
        user: outcome.user.into(),
        profile,
        redirect_slug: outcome.redirect_slug,
    }))
}
