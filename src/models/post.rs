//! Post model
//!
//! This module provides:
//! - `Post` entity representing a blog post
//! - `PostStatus` enum for publication states
//! - Input types for creating and updating posts
//!
//! Listing always honors the pinned-first/newest-first ordering: a post
//! with `fixed = true` sorts before every non-pinned post regardless of
//! recency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Short description (bounded length)
    pub description: String,
    /// Full post text
    pub text: String,
    /// Thumbnail image reference (path under the upload root)
    pub thumbnail: Option<String>,
    /// Publication status
    pub status: PostStatus,
    /// Category ID (exactly one category per post)
    pub category_id: i64,
    /// Author user ID (falls back to the sentinel user on author deletion)
    pub author_id: i64,
    /// Last updater user ID (cleared on updater deletion)
    pub updater_id: Option<i64>,
    /// Pinned flag: forces the post to sort before non-pinned posts
    pub fixed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Post publication status.
///
/// A two-value enum with no automatic transitions: status changes only via
/// an explicit edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Published - visible to public
    Published,
    /// Draft - not visible to public
    Draft,
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Published
    }
}

impl PostStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Published => "published",
            PostStatus::Draft => "draft",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "published" => Some(PostStatus::Published),
            "draft" => Some(PostStatus::Draft),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    /// Post title
    pub title: String,
    /// URL-friendly slug
    pub slug: String,
    /// Short description
    pub description: String,
    /// Full post text
    pub text: String,
    /// Thumbnail reference (optional)
    pub thumbnail: Option<String>,
    /// Category ID
    pub category_id: i64,
    /// Publication status (defaults to Published)
    pub status: Option<PostStatus>,
}

/// Input for updating an existing post.
///
/// Extends the create payload with the pinned flag, mirroring the edit form
/// which additionally exposes `fixed` and records the updater.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostInput {
    /// New title
    pub title: String,
    /// New slug
    pub slug: String,
    /// New description
    pub description: String,
    /// New full text
    pub text: String,
    /// New thumbnail reference (unchanged when None)
    pub thumbnail: Option<String>,
    /// New category ID
    pub category_id: i64,
    /// New status
    pub status: PostStatus,
    /// New pinned flag
    pub fixed: bool,
}

/// Filter for post list queries
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Restrict to one category
    pub category_id: Option<i64>,
    /// Restrict to one status
    pub status: Option<PostStatus>,
}

impl PostFilter {
    /// Filter for published posts only
    pub fn published() -> Self {
        Self {
            category_id: None,
            status: Some(PostStatus::Published),
        }
    }

    /// Restrict the filter to a category
    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }
}
