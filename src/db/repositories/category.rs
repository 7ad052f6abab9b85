//! Category repository
//!
//! Database operations for the hierarchical category tree. Categories
//! reference their parent by ID; `list_all` returns the flat set ordered
//! for deterministic tree assembly.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// Check whether a category slug already exists
    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// List all categories ordered by sort_order then title
    async fn list_all(&self) -> Result<Vec<Category>>;

    /// Delete a category
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }

    async fn list_all(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_category_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, slug, parent_id, sort_order, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.title)
    .bind(&category.slug)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    let id = result.last_insert_rowid();

    Ok(Category {
        id,
        title: category.title.clone(),
        slug: category.slug.clone(),
        parent_id: category.parent_id,
        sort_order: category.sort_order,
        created_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, title, slug, parent_id, sort_order, created_at FROM categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, title, slug, parent_id, sort_order, created_at FROM categories WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, slug, parent_id, sort_order, created_at
        FROM categories
        ORDER BY sort_order, title
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        parent_id: row.get("parent_id"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, slug, parent_id, sort_order, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.title)
    .bind(&category.slug)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    let id = result.last_insert_id() as i64;

    Ok(Category {
        id,
        title: category.title.clone(),
        slug: category.slug.clone(),
        parent_id: category.parent_id,
        sort_order: category.sort_order,
        created_at: now,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, title, slug, parent_id, sort_order, created_at FROM categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_category_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, title, slug, parent_id, sort_order, created_at FROM categories WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_category_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, slug, parent_id, sort_order, created_at
        FROM categories
        ORDER BY sort_order, title
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        parent_id: row.get("parent_id"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    }
}
