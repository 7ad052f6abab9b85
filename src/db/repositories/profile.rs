//! Profile repository
//!
//! Database operations for user profiles, including the transactional
//! co-update of a user row and its profile row. The co-update either
//! commits both rows or neither.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Profile, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Create a new profile
    async fn create(&self, profile: &Profile) -> Result<Profile>;

    /// Get profile by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>>;

    /// Get profile by owning user ID
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>>;

    /// Get profile by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Profile>>;

    /// Check whether a slug is held by a profile other than `exclude_id`
    async fn slug_taken_by_other(&self, slug: &str, exclude_id: i64) -> Result<bool>;

    /// Update a profile
    async fn update(&self, profile: &Profile) -> Result<Profile>;

    /// Update a user row and its profile row in a single transaction.
    ///
    /// Both writes commit together or not at all. Returns the persisted
    /// pair on success.
    async fn update_with_user(&self, user: &User, profile: &Profile) -> Result<(User, Profile)>;

    /// Delete a profile
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based profile repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    /// Create a new SQLx profile repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn create(&self, profile: &Profile) -> Result<Profile> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_profile_sqlite(self.pool.as_sqlite().unwrap(), profile).await
            }
            DatabaseDriver::Mysql => {
                create_profile_mysql(self.pool.as_mysql().unwrap(), profile).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_profile_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_profile_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_profile_by_user_id_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                get_profile_by_user_id_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_profile_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_profile_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
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

    async fn update(&self, profile: &Profile) -> Result<Profile> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_profile_sqlite(self.pool.as_sqlite().unwrap(), profile).await
            }
            DatabaseDriver::Mysql => {
                update_profile_mysql(self.pool.as_mysql().unwrap(), profile).await
            }
        }
    }

    async fn update_with_user(&self, user: &User, profile: &Profile) -> Result<(User, Profile)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_with_user_sqlite(self.pool.as_sqlite().unwrap(), user, profile).await
            }
            DatabaseDriver::Mysql => {
                update_with_user_mysql(self.pool.as_mysql().unwrap(), user, profile).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_profile_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_profile_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_profile_sqlite(pool: &SqlitePool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO profiles (user_id, slug, birth_date, bio, avatar, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.slug)
    .bind(profile.birth_date)
    .bind(&profile.bio)
    .bind(&profile.avatar)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create profile")?;

    let id = result.last_insert_rowid();

    Ok(Profile {
        id,
        user_id: profile.user_id,
        slug: profile.slug.clone(),
        birth_date: profile.birth_date,
        bio: profile.bio.clone(),
        avatar: profile.avatar.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_profile_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, slug, birth_date, bio, avatar, created_at, updated_at
        FROM profiles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_profile_by_user_id_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, slug, birth_date, bio, avatar, created_at, updated_at
        FROM profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by user ID")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_profile_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, slug, birth_date, bio, avatar, created_at, updated_at
        FROM profiles
        WHERE slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_sqlite(&row))),
        None => Ok(None),
    }
}

async fn slug_taken_by_other_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM profiles WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check profile slug uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn update_profile_sqlite(pool: &SqlitePool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE profiles
        SET slug = ?, birth_date = ?, bio = ?, avatar = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.slug)
    .bind(profile.birth_date)
    .bind(&profile.bio)
    .bind(&profile.avatar)
    .bind(now)
    .bind(profile.id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    get_profile_by_id_sqlite(pool, profile.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found after update"))
}

async fn update_with_user_sqlite(
    pool: &SqlitePool,
    user: &User,
    profile: &Profile,
) -> Result<(User, Profile)> {
    let now = Utc::now();

    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin profile update transaction")?;

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, first_name = ?, last_name = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(now)
    .bind(user.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update user within transaction")?;

    sqlx::query(
        r#"
        UPDATE profiles
        SET slug = ?, birth_date = ?, bio = ?, avatar = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.slug)
    .bind(profile.birth_date)
    .bind(&profile.bio)
    .bind(&profile.avatar)
    .bind(now)
    .bind(profile.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update profile within transaction")?;

    tx.commit()
        .await
        .context("Failed to commit profile update transaction")?;

    let user = User {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        password_hash: user.password_hash.clone(),
        created_at: user.created_at,
        updated_at: now,
    };
    let profile = Profile {
        id: profile.id,
        user_id: profile.user_id,
        slug: profile.slug.clone(),
        birth_date: profile.birth_date,
        bio: profile.bio.clone(),
        avatar: profile.avatar.clone(),
        created_at: profile.created_at,
        updated_at: now,
    };

    Ok((user, profile))
}

async fn delete_profile_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM profiles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete profile")?;

    Ok(())
}

fn row_to_profile_sqlite(row: &sqlx::sqlite::SqliteRow) -> Profile {
    Profile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        slug: row.get("slug"),
        birth_date: row.get("birth_date"),
        bio: row.get("bio"),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_profile_mysql(pool: &MySqlPool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO profiles (user_id, slug, birth_date, bio, avatar, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.slug)
    .bind(profile.birth_date)
    .bind(&profile.bio)
    .bind(&profile.avatar)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create profile")?;

    let id = result.last_insert_id() as i64;

    Ok(Profile {
        id,
        user_id: profile.user_id,
        slug: profile.slug.clone(),
        birth_date: profile.birth_date,
        bio: profile.bio.clone(),
        avatar: profile.avatar.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_profile_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, slug, birth_date, bio, avatar, created_at, updated_at
        FROM profiles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_profile_by_user_id_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, slug, birth_date, bio, avatar, created_at, updated_at
        FROM profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by user ID")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_profile_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, slug, birth_date, bio, avatar, created_at, updated_at
        FROM profiles
        WHERE slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_mysql(&row))),
        None => Ok(None),
    }
}

async fn slug_taken_by_other_mysql(
    pool: &MySqlPool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM profiles WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check profile slug uniqueness")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn update_profile_mysql(pool: &MySqlPool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE profiles
        SET slug = ?, birth_date = ?, bio = ?, avatar = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.slug)
    .bind(profile.birth_date)
    .bind(&profile.bio)
    .bind(&profile.avatar)
    .bind(now)
    .bind(profile.id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    get_profile_by_id_mysql(pool, profile.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found after update"))
}

async fn update_with_user_mysql(
    pool: &MySqlPool,
    user: &User,
    profile: &Profile,
) -> Result<(User, Profile)> {
    let now = Utc::now();

    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin profile update transaction")?;

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, first_name = ?, last_name = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(now)
    .bind(user.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update user within transaction")?;

    sqlx::query(
        r#"
        UPDATE profiles
        SET slug = ?, birth_date = ?, bio = ?, avatar = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.slug)
    .bind(profile.birth_date)
    .bind(&profile.bio)
    .bind(&profile.avatar)
    .bind(now)
    .bind(profile.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update profile within transaction")?;

    tx.commit()
        .await
        .context("Failed to commit profile update transaction")?;

    let user = User {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        password_hash: user.password_hash.clone(),
        created_at: user.created_at,
        updated_at: now,
    };
    let profile = Profile {
        id: profile.id,
        user_id: profile.user_id,
        slug: profile.slug.clone(),
        birth_date: profile.birth_date,
        bio: profile.bio.clone(),
        avatar: profile.avatar.clone(),
        created_at: profile.created_at,
        updated_at: now,
    };

    Ok((user, profile))
}

async fn delete_profile_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM profiles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete profile")?;

    Ok(())
}

fn row_to_profile_mysql(row: &sqlx::mysql::MySqlRow) -> Profile {
    Profile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        slug: row.get("slug"),
        birth_date: row.get("birth_date"),
        bio: row.get("bio"),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::password::hash_password;
    use chrono::NaiveDate;

    async fn setup() -> (DynDatabasePool, SqlxUserRepository, SqlxProfileRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let users = SqlxUserRepository::new(pool.clone());
        let profiles = SqlxProfileRepository::new(pool.clone());
        (pool, users, profiles)
    }

    async fn create_user_with_profile(
        users: &SqlxUserRepository,
        profiles: &SqlxProfileRepository,
        username: &str,
        email: &str,
    ) -> (User, Profile) {
        let user = users
            .create(&User::new(
                username.to_string(),
                email.to_string(),
                hash_password("test_password").expect("Failed to hash password"),
            ))
            .await
            .expect("Failed to create user");
        let profile = profiles
            .create(&Profile::for_user(user.id, username.to_string()))
            .await
            .expect("Failed to create profile");
        (user, profile)
    }

    #[tokio::test]
    async fn test_create_and_get_profile() {
        let (_pool, users, profiles) = setup().await;
        let (user, profile) =
            create_user_with_profile(&users, &profiles, "alice", "alice@example.com").await;

        assert!(profile.id > 0);
        assert_eq!(profile.user_id, user.id);
        assert_eq!(profile.slug, "alice");

        let found = profiles
            .get_by_user_id(user.id)
            .await
            .expect("Query failed")
            .expect("Profile should exist");
        assert_eq!(found.id, profile.id);

        let by_slug = profiles
            .get_by_slug("alice")
            .await
            .expect("Query failed")
            .expect("Profile should exist");
        assert_eq!(by_slug.id, profile.id);
    }

    #[tokio::test]
    async fn test_slug_taken_by_other() {
        let (_pool, users, profiles) = setup().await;
        let (_alice, alice_profile) =
            create_user_with_profile(&users, &profiles, "alice", "alice@example.com").await;
        let (_bob, bob_profile) =
            create_user_with_profile(&users, &profiles, "bob", "bob@example.com").await;

        assert!(!profiles
            .slug_taken_by_other("alice", alice_profile.id)
            .await
            .unwrap());
        assert!(profiles
            .slug_taken_by_other("alice", bob_profile.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (_pool, users, profiles) = setup().await;
        let (_user, mut profile) =
            create_user_with_profile(&users, &profiles, "alice", "alice@example.com").await;

        profile.bio = "Rustacean".to_string();
        profile.birth_date = NaiveDate::from_ymd_opt(1990, 5, 1);

        let updated = profiles
            .update(&profile)
            .await
            .expect("Failed to update profile");

        assert_eq!(updated.bio, "Rustacean");
        assert_eq!(updated.birth_date, NaiveDate::from_ymd_opt(1990, 5, 1));
    }

    #[tokio::test]
    async fn test_update_with_user_commits_both_rows() {
        let (_pool, users, profiles) = setup().await;
        let (mut user, mut profile) =
            create_user_with_profile(&users, &profiles, "alice", "alice@example.com").await;

        user.first_name = "Alice".to_string();
        user.email = "alice.new@example.com".to_string();
        profile.bio = "Updated bio".to_string();
        profile.slug = "alice-new".to_string();

        let (saved_user, saved_profile) = profiles
            .update_with_user(&user, &profile)
            .await
            .expect("Co-update failed");

        assert_eq!(saved_user.email, "alice.new@example.com");
        assert_eq!(saved_profile.slug, "alice-new");

        // Both rows are visible after commit
        let db_user = users
            .get_by_id(user.id)
            .await
            .unwrap()
            .expect("User should exist");
        let db_profile = profiles
            .get_by_id(profile.id)
            .await
            .unwrap()
            .expect("Profile should exist");
        assert_eq!(db_user.email, "alice.new@example.com");
        assert_eq!(db_user.first_name, "Alice");
        assert_eq!(db_profile.bio, "Updated bio");
        assert_eq!(db_profile.slug, "alice-new");
    }

    #[tokio::test]
    async fn test_update_with_user_rolls_back_on_conflict() {
        let (_pool, users, profiles) = setup().await;
        let (mut alice, mut alice_profile) =
            create_user_with_profile(&users, &profiles, "alice", "alice@example.com").await;
        create_user_with_profile(&users, &profiles, "bob", "bob@example.com").await;

        // The user UPDATE succeeds but the profile UPDATE hits the slug
        // UNIQUE constraint, so the whole transaction must roll back.
        alice.first_name = "Alice".to_string();
        alice_profile.slug = "bob".to_string();

        let result = profiles.update_with_user(&alice, &alice_profile).await;
        assert!(result.is_err());

        let db_user = users
            .get_by_id(alice.id)
            .await
            .unwrap()
            .expect("User should exist");
        let db_profile = profiles
            .get_by_id(alice_profile.id)
            .await
            .unwrap()
            .expect("Profile should exist");
        assert_eq!(db_user.first_name, "");
        assert_eq!(db_profile.slug, "alice");
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let (_pool, users, profiles) = setup().await;
        let (_user, profile) =
            create_user_with_profile(&users, &profiles, "alice", "alice@example.com").await;

        profiles
            .delete(profile.id)
            .await
            .expect("Failed to delete profile");

        let found = profiles.get_by_id(profile.id).await.expect("Query failed");
        assert!(found.is_none());
    }
}
