//! User repository
//!
//! Database operations for user accounts.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Check whether an email is held by a user other than `exclude_id`
    async fn email_taken_by_other(&self, email: &str, exclude_id: i64) -> Result<bool>;

    /// Check whether a username is held by a user other than `exclude_id`
    async fn username_taken_by_other(&self, username: &str, exclude_id: i64) -> Result<bool>;

    /// Update a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn email_taken_by_other(&self, email: &str, exclude_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                email_taken_by_other_sqlite(self.pool.as_sqlite().unwrap(), email, exclude_id).await
            }
            DatabaseDriver::Mysql => {
                email_taken_by_other_mysql(self.pool.as_mysql().unwrap(), email, exclude_id).await
            }
        }
    }

    async fn username_taken_by_other(&self, username: &str, exclude_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                username_taken_by_other_sqlite(self.pool.as_sqlite().unwrap(), username, exclude_id)
                    .await
            }
            DatabaseDriver::Mysql => {
                username_taken_by_other_mysql(self.pool.as_mysql().unwrap(), username, exclude_id)
                    .await
            }
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => update_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_user_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_user_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_rowid();

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        password_hash: user.password_hash.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, password_hash, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, password_hash, created_at, updated_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, password_hash, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row))),
        None => Ok(None),
    }
}

async fn email_taken_by_other_sqlite(
    pool: &SqlitePool,
    email: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ? AND id != ?")
        .bind(email)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check email uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn username_taken_by_other_sqlite(
    pool: &SqlitePool,
    username: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE username = ? AND id != ?")
        .bind(username)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check username uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, first_name = ?, last_name = ?, password_hash = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    // Return the updated user
    get_user_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_user_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_id() as i64;

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        password_hash: user.password_hash.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, password_hash, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, password_hash, created_at, updated_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, password_hash, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row))),
        None => Ok(None),
    }
}

async fn email_taken_by_other_mysql(
    pool: &MySqlPool,
    email: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ? AND id != ?")
        .bind(email)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check email uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn username_taken_by_other_mysql(
    pool: &MySqlPool,
    username: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE username = ? AND id != ?")
        .bind(username)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check username uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, first_name = ?, last_name = ?, password_hash = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    // Return the updated user
    get_user_by_id_mysql(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_user_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::services::password::hash_password;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    fn create_test_user(username: &str, email: &str) -> User {
        User::new(
            username.to_string(),
            email.to_string(),
            hash_password("test_password").expect("Failed to hash password"),
        )
    }

    #[tokio::test]
    async fn test_create_user() {
        let (_pool, repo) = setup_test_repo().await;
        let user = create_test_user("testuser", "test@example.com");

        let created = repo.create(&user).await.expect("Failed to create user");

        assert!(created.id > 0);
        assert_eq!(created.username, "testuser");
        assert_eq!(created.email, "test@example.com");
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        let user = create_test_user("testuser", "test@example.com");
        let created = repo.create(&user).await.expect("Failed to create user");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Query failed")
            .expect("User should exist");

        assert_eq!(found.username, "testuser");
    }

    #[tokio::test]
    async fn test_get_user_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_id(9999).await.expect("Query failed");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_username() {
        let (_pool, repo) = setup_test_repo().await;
        let user = create_test_user("alice", "alice@example.com");
        repo.create(&user).await.expect("Failed to create user");

        let found = repo
            .get_by_username("alice")
            .await
            .expect("Query failed")
            .expect("User should exist");

        assert_eq!(found.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_get_user_by_email() {
        let (_pool, repo) = setup_test_repo().await;
        let user = create_test_user("alice", "alice@example.com");
        repo.create(&user).await.expect("Failed to create user");

        let found = repo
            .get_by_email("alice@example.com")
            .await
            .expect("Query failed")
            .expect("User should exist");

        assert_eq!(found.username, "alice");
    }

    #[tokio::test]
    async fn test_email_taken_by_other() {
        let (_pool, repo) = setup_test_repo().await;
        let alice = repo
            .create(&create_test_user("alice", "alice@example.com"))
            .await
            .expect("Failed to create alice");
        let bob = repo
            .create(&create_test_user("bob", "bob@example.com"))
            .await
            .expect("Failed to create bob");

        // Alice's own email does not conflict with herself
        assert!(!repo
            .email_taken_by_other("alice@example.com", alice.id)
            .await
            .unwrap());

        // But it does conflict for Bob
        assert!(repo
            .email_taken_by_other("alice@example.com", bob.id)
            .await
            .unwrap());

        // An unused email conflicts with nobody
        assert!(!repo
            .email_taken_by_other("free@example.com", bob.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_username_taken_by_other() {
        let (_pool, repo) = setup_test_repo().await;
        let alice = repo
            .create(&create_test_user("alice", "alice@example.com"))
            .await
            .expect("Failed to create alice");
        let bob = repo
            .create(&create_test_user("bob", "bob@example.com"))
            .await
            .expect("Failed to create bob");

        assert!(!repo.username_taken_by_other("alice", alice.id).await.unwrap());
        assert!(repo.username_taken_by_other("alice", bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_user() {
        let (_pool, repo) = setup_test_repo().await;
        let mut user = repo
            .create(&create_test_user("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        user.first_name = "Alice".to_string();
        user.last_name = "Smith".to_string();
        user.email = "alice.smith@example.com".to_string();

        let updated = repo.update(&user).await.expect("Failed to update user");

        assert_eq!(updated.first_name, "Alice");
        assert_eq!(updated.last_name, "Smith");
        assert_eq!(updated.email, "alice.smith@example.com");
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (_pool, repo) = setup_test_repo().await;
        let user = repo
            .create(&create_test_user("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        repo.delete(user.id).await.expect("Failed to delete user");

        let found = repo.get_by_id(user.id).await.expect("Query failed");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_by_constraint() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_user("alice", "shared@example.com"))
            .await
            .expect("Failed to create first user");

        let result = repo
            .create(&create_test_user("bob", "shared@example.com"))
            .await;

        assert!(result.is_err());
    }
}
