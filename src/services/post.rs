//! Post service
//!
//! Business logic for blog posts: creation, editing, listing and slug
//! lookup. Listing always returns pinned posts first, then newest first.
//! Draft posts are excluded from public lookups.

use crate::config::UploadConfig;
use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{CreatePostInput, Post, PostFilter, PostStatus, UpdatePostInput, User};
use crate::services::validation::{
    validate_description, validate_slug, validate_title, ValidationErrors,
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error with field-level details
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    upload: Arc<UploadConfig>,
}

impl PostService {
    /// Create a new post service with the given repositories.
    ///
    /// Thumbnail references are validated against the configured extension
    /// whitelist.
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        upload: Arc<UploadConfig>,
    ) -> Self {
        Self {
            post_repo,
            category_repo,
            upload,
        }
    }

    fn validate_thumbnail(&self, errors: &mut ValidationErrors, thumbnail: &str) {
        if !self.upload.is_extension_allowed(thumbnail) {
            errors.add(
                "thumbnail",
                format!(
                    "Thumbnail must be one of: {}",
                    self.upload.allowed_extensions.join(", ")
                ),
            );
        }
    }

    /// Create a new post authored by `author`.
    ///
    /// Status defaults to Published when the input leaves it unset.
    pub async fn create(&self, author: &User, input: CreatePostInput) -> Result<Post, PostServiceError> {
        let mut errors = ValidationErrors::new();
        validate_title(&mut errors, &input.title);
        validate_slug(&mut errors, "slug", &input.slug);
        validate_description(&mut errors, &input.description);
        if let Some(ref thumbnail) = input.thumbnail {
            self.validate_thumbnail(&mut errors, thumbnail);
        }

        if !errors.has_field("slug")
            && self
                .post_repo
                .get_by_slug(&input.slug)
                .await
                .context("Failed to check post slug")?
                .is_some()
        {
            errors.add("slug", "This slug is already taken");
        }

        if self
            .category_repo
            .get_by_id(input.category_id)
            .await
            .context("Failed to check category")?
            .is_none()
        {
            errors.add("category_id", "Category does not exist");
        }

        if !errors.is_empty() {
            return Err(PostServiceError::ValidationError(errors));
        }

        let now = Utc::now();
        let post = Post {
            id: 0,
            title: input.title,
            slug: input.slug,
            description: input.description,
            text: input.text,
            thumbnail: input.thumbnail,
            status: input.status.unwrap_or_default(),
            category_id: input.category_id,
            author_id: author.id,
            updater_id: None,
            fixed: false,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = created.id, slug = %created.slug, "Post created");

        Ok(created)
    }

    /// Get a published post by slug for public viewing.
    ///
    /// Drafts are treated as missing.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Post, PostServiceError> {
        let post = self
            .post_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post")?
            .filter(|p| p.status == PostStatus::Published)
            .ok_or_else(|| PostServiceError::NotFound(format!("Post '{}' not found", slug)))?;

        Ok(post)
    }

    /// Get any post by slug regardless of status
    pub async fn get_by_slug(&self, slug: &str) -> Result<Post, PostServiceError> {
        self.post_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("Post '{}' not found", slug)))
    }

    /// List posts matching a filter with pagination.
    ///
    /// Returns the page of posts and the total match count. Ordering is
    /// pinned-first, then newest-first.
    pub async fn list(
        &self,
        filter: &PostFilter,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Post>, i64), PostServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let offset = (page - 1) * per_page;

        let posts = self
            .post_repo
            .list(filter, offset, per_page)
            .await
            .context("Failed to list posts")?;
        let total = self
            .post_repo
            .count(filter)
            .await
            .context("Failed to count posts")?;

        Ok((posts, total))
    }

    /// List published posts in a category by category slug
    pub async fn list_published_in_category(
        &self,
        category_slug: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Post>, i64), PostServiceError> {
        let category = self
            .category_repo
            .get_by_slug(category_slug)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| {
                PostServiceError::NotFound(format!("Category '{}' not found", category_slug))
            })?;

        self.list(&PostFilter::published().in_category(category.id), page, per_page)
            .await
    }

    /// Update an existing post, recording `updater` as the last editor.
    pub async fn update(
        &self,
        updater: &User,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        let existing = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("Post {} not found", id)))?;

        let mut errors = ValidationErrors::new();
        validate_title(&mut errors, &input.title);
        validate_slug(&mut errors, "slug", &input.slug);
        validate_description(&mut errors, &input.description);
        if let Some(ref thumbnail) = input.thumbnail {
            self.validate_thumbnail(&mut errors, thumbnail);
        }

        if !errors.has_field("slug")
            && self
                .post_repo
                .slug_taken_by_other(&input.slug, existing.id)
                .await
                .context("Failed to check post slug uniqueness")?
        {
            errors.add("slug", "This slug is already taken");
        }

        if self
            .category_repo
            .get_by_id(input.category_id)
            .await
            .context("Failed to check category")?
            .is_none()
        {
            errors.add("category_id", "Category does not exist");
        }

        if !errors.is_empty() {
            return Err(PostServiceError::ValidationError(errors));
        }

        let post = Post {
            id: existing.id,
            title: input.title,
            slug: input.slug,
            description: input.description,
            text: input.text,
            thumbnail: input.thumbnail.or(existing.thumbnail),
            status: input.status,
            category_id: input.category_id,
            author_id: existing.author_id,
            updater_id: Some(updater.id),
            fixed: input.fixed,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        let updated = self
            .post_repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        tracing::info!(post_id = updated.id, updater_id = updater.id, "Post updated");

        Ok(updated)
    }

    /// Delete a post
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        if self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .is_none()
        {
            return Err(PostServiceError::NotFound(format!("Post {} not found", id)));
        }

        self.post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?;

        Ok(())
    }
}
