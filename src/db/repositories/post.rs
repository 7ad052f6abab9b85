//! Post repository
//!
//! Database operations for blog posts.
//!
//! Every list query orders by `fixed DESC, created_at DESC` so pinned
//! posts sort before all non-pinned posts regardless of recency. The
//! composite index on (fixed, created_at, status) backs this ordering.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Post, PostFilter, PostStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const POST_COLUMNS: &str = "id, title, slug, description, text, thumbnail, status, category_id, author_id, updater_id, fixed, created_at, updated_at";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Check whether a slug is held by a post other than `exclude_id`
    async fn slug_taken_by_other(&self, slug: &str, exclude_id: i64) -> Result<bool>;

    /// List posts matching a filter, pinned-first then newest-first
    async fn list(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count posts matching a filter
    async fn count(&self, filter: &PostFilter) -> Result<i64>;

    /// Update a post
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_post_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn slug_taken_by_other(&self, slug: &str, exclude_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                slug_taken_by_other_sqlite(self.pool.as_sqlite().unwrap(), slug, exclude_id).await
            }
            DatabaseDriver::Mysql => {
                slug_taken_by_other_mysql(self.pool.as_mysql().unwrap(), slug, exclude_id).await
            }
        }
    }

    async fn list(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), filter, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), filter, offset, limit).await
            }
        }
    }

    async fn count(&self, filter: &PostFilter) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_posts_sqlite(self.pool.as_sqlite().unwrap(), filter).await
            }
            DatabaseDriver::Mysql => count_posts_mysql(self.pool.as_mysql().unwrap(), filter).await,
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

/// Build the WHERE clause for a post filter.
///
/// Returns the clause text; the caller binds category_id then status in
/// that order when present.
fn filter_clause(filter: &PostFilter) -> String {
    let mut conditions = Vec::new();
    if filter.category_id.is_some() {
        conditions.push("category_id = ?");
    }
    if filter.status.is_some() {
        conditions.push("status = ?");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, slug, description, text, thumbnail, status, category_id, author_id, updater_id, fixed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.description)
    .bind(&post.text)
    .bind(&post.thumbnail)
    .bind(post.status.as_str())
    .bind(post.category_id)
    .bind(post.author_id)
    .bind(post.updater_id)
    .bind(post.fixed)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_rowid();

    get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after create"))
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn slug_taken_by_other_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check post slug uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    filter: &PostFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM posts{} ORDER BY fixed DESC, created_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS,
        filter_clause(filter)
    );

    let mut query = sqlx::query(&sql);
    if let Some(category_id) = filter.category_id {
        query = query.bind(category_id);
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_sqlite(&row)?);
    }

    Ok(posts)
}

async fn count_posts_sqlite(pool: &SqlitePool, filter: &PostFilter) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) as count FROM posts{}",
        filter_clause(filter)
    );

    let mut query = sqlx::query(&sql);
    if let Some(category_id) = filter.category_id {
        query = query.bind(category_id);
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, slug = ?, description = ?, text = ?, thumbnail = ?, status = ?,
            category_id = ?, updater_id = ?, fixed = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.description)
    .bind(&post.text)
    .bind(&post.thumbnail)
    .bind(post.status.as_str())
    .bind(post.category_id)
    .bind(post.updater_id)
    .bind(post.fixed)
    .bind(now)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    get_post_by_id_sqlite(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post status in database: {}", status_str))?;

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        text: row.get("text"),
        thumbnail: row.get("thumbnail"),
        status,
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        updater_id: row.get("updater_id"),
        fixed: row.get("fixed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, slug, description, text, thumbnail, status, category_id, author_id, updater_id, fixed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.description)
    .bind(&post.text)
    .bind(&post.thumbnail)
    .bind(post.status.as_str())
    .bind(post.category_id)
    .bind(post.author_id)
    .bind(post.updater_id)
    .bind(post.fixed)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_id() as i64;

    get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after create"))
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn slug_taken_by_other_mysql(
    pool: &MySqlPool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check post slug uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    filter: &PostFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM posts{} ORDER BY fixed DESC, created_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS,
        filter_clause(filter)
    );

    let mut query = sqlx::query(&sql);
    if let Some(category_id) = filter.category_id {
        query = query.bind(category_id);
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_mysql(&row)?);
    }

    Ok(posts)
}

async fn count_posts_mysql(pool: &MySqlPool, filter: &PostFilter) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) as count FROM posts{}",
        filter_clause(filter)
    );

    let mut query = sqlx::query(&sql);
    if let Some(category_id) = filter.category_id {
        query = query.bind(category_id);
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn update_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, slug = ?, description = ?, text = ?, thumbnail = ?, status = ?,
            category_id = ?, updater_id = ?, fixed = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.description)
    .bind(&post.text)
    .bind(&post.thumbnail)
    .bind(post.status.as_str())
    .bind(post.category_id)
    .bind(post.updater_id)
    .bind(post.fixed)
    .bind(now)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    get_post_by_id_mysql(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post status in database: {}", status_str))?;

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        text: row.get("text"),
        thumbnail: row.get("thumbnail"),
        status,
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        updater_id: row.get("updater_id"),
        fixed: row.get("fixed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    fn test_post(title: &str, slug: &str) -> Post {
        Post {
            id: 0,
            title: title.to_string(),
            slug: slug.to_string(),
            description: "A short description".to_string(),
            text: "Full post text".to_string(),
            thumbnail: None,
            status: PostStatus::Published,
            category_id: 1,
            author_id: 1,
            updater_id: None,
            fixed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_author_deletion_reassigns_to_sentinel() {
        use crate::db::repositories::{SqlxUserRepository, UserRepository};

        let (pool, repo) = setup_test_repo().await;
        let users = SqlxUserRepository::new(pool);

        let author = users
            .create(&crate::models::User::new(
                "author".to_string(),
                "author@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .expect("Failed to create author");

        let mut post = test_post("Hello", "hello");
        post.author_id = author.id;
        let created = repo.create(&post).await.expect("Failed to create post");
        assert_eq!(created.author_id, author.id);

        users.delete(author.id).await.expect("Failed to delete author");

        let orphaned = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get post")
            .expect("Post should survive author deletion");
        assert_eq!(orphaned.author_id, 1);
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&test_post("Hello", "hello"))
            .await
            .expect("Failed to create post");

        assert!(created.id > 0);
        assert_eq!(created.status, PostStatus::Published);

        let by_slug = repo
            .get_by_slug("hello")
            .await
            .expect("Query failed")
            .expect("Post should exist");
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.title, "Hello");
    }

    #[tokio::test]
    async fn test_pinned_posts_sort_before_newer_posts() {
        let (_pool, repo) = setup_test_repo().await;

        let mut pinned = test_post("Pinned", "pinned");
        pinned.fixed = true;
        repo.create(&pinned).await.expect("Failed to create pinned");

        // Created after the pinned post, so strictly newer
        repo.create(&test_post("Newer", "newer"))
            .await
            .expect("Failed to create newer");

        let posts = repo
            .list(&PostFilter::default(), 0, 10)
            .await
            .expect("Failed to list posts");

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].slug, "pinned");
        assert_eq!(posts[1].slug, "newer");
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&test_post("Public", "public"))
            .await
            .expect("Failed to create post");

        let mut draft = test_post("Draft", "draft-post");
        draft.status = PostStatus::Draft;
        repo.create(&draft).await.expect("Failed to create draft");

        let published = repo
            .list(&PostFilter::published(), 0, 10)
            .await
            .expect("Failed to list posts");

        assert_eq!(published.len(), 1);
        assert_eq!(published[0].slug, "public");

        let all = repo
            .list(&PostFilter::default(), 0, 10)
            .await
            .expect("Failed to list posts");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&test_post("One", "one")).await.unwrap();
        let mut draft = test_post("Two", "two");
        draft.status = PostStatus::Draft;
        repo.create(&draft).await.unwrap();

        assert_eq!(repo.count(&PostFilter::default()).await.unwrap(), 2);
        assert_eq!(repo.count(&PostFilter::published()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_post() {
        let (_pool, repo) = setup_test_repo().await;
        let mut post = repo
            .create(&test_post("Original", "original"))
            .await
            .expect("Failed to create post");

        post.title = "Revised".to_string();
        post.status = PostStatus::Draft;
        post.fixed = true;
        post.updater_id = Some(1);

        let updated = repo.update(&post).await.expect("Failed to update post");

        assert_eq!(updated.title, "Revised");
        assert_eq!(updated.status, PostStatus::Draft);
        assert!(updated.fixed);
        assert_eq!(updated.updater_id, Some(1));
    }

    #[tokio::test]
    async fn test_slug_taken_by_other() {
        let (_pool, repo) = setup_test_repo().await;
        let post = repo
            .create(&test_post("Hello", "hello"))
            .await
            .expect("Failed to create post");

        assert!(!repo.slug_taken_by_other("hello", post.id).await.unwrap());
        assert!(repo.slug_taken_by_other("hello", post.id + 1).await.unwrap());
        assert!(!repo.slug_taken_by_other("unused", post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (_pool, repo) = setup_test_repo().await;
        let post = repo
            .create(&test_post("Hello", "hello"))
            .await
            .expect("Failed to create post");

        repo.delete(post.id).await.expect("Failed to delete post");

        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }
}
