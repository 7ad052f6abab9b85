//! Profile service
//!
//! Coordinates the combined edit of an account and its profile. The edit
//! form spans two records, so the service validates both payloads up
//! front, checks cross-record uniqueness excluding the editing user, and
//! only then hands the pair to the repository for a single transaction.
//! Nothing is written when any validation step fails.

use crate::config::UploadConfig;
use crate::db::repositories::{ProfileRepository, UserRepository};
use crate::models::{Profile, ProfileUpdateInput, User, UserUpdateInput};
use crate::services::validation::{
    validate_bio, validate_birth_date, validate_email, validate_slug, validate_username,
    ValidationErrors,
};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Error types for profile service operations
#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    /// User or profile not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error with field-level details
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a successful combined edit.
///
/// `redirect_slug` is the profile slug after the edit, which may differ
/// from the slug the request was addressed to.
#[derive(Debug, Clone)]
pub struct ProfileUpdateOutcome {
    /// The persisted user
    pub user: User,
    /// The persisted profile
    pub profile: Profile,
    /// Slug to address the profile with after the edit
    pub redirect_slug: String,
}

/// Profile service coordinating user and profile edits
pub struct ProfileService {
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    upload: Arc<UploadConfig>,
}

impl ProfileService {
    /// Create a new profile service with the given repositories.
    ///
    /// Avatar references are validated against the configured extension
    /// whitelist.
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        upload: Arc<UploadConfig>,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            upload,
        }
    }

    /// Get a profile together with its user by profile slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<(User, Profile), ProfileServiceError> {
        let profile = self
            .profile_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get profile")?
            .ok_or_else(|| ProfileServiceError::NotFound(format!("Profile '{}' not found", slug)))?;

        let user = self
            .user_repo
            .get_by_id(profile.user_id)
            .await
            .context("Failed to get profile user")?
            .ok_or_else(|| {
                ProfileServiceError::NotFound(format!("User for profile '{}' not found", slug))
            })?;

        Ok((user, profile))
    }

    /// Get a user's own profile
    pub async fn get_for_user(&self, user_id: i64) -> Result<Profile, ProfileServiceError> {
        self.profile_repo
            .get_by_user_id(user_id)
            .await
            .context("Failed to get profile")?
            .ok_or_else(|| {
                ProfileServiceError::NotFound(format!("Profile for user {} not found", user_id))
            })
    }

    /// Apply a combined user + profile edit for the given user.
    ///
    /// Validation runs in a fixed order: user fields first, then profile
    /// fields, then cross-record uniqueness checks that exclude the user
    /// being edited (keeping your own email or slug is never a conflict).
    /// All failures are reported together, keyed by field. Only a fully
    /// valid payload reaches the database, where both rows are written in
    /// one transaction.
    pub async fn update(
        &self,
        user_id: i64,
        user_input: UserUpdateInput,
        profile_input: ProfileUpdateInput,
    ) -> Result<ProfileUpdateOutcome, ProfileServiceError> {
        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| ProfileServiceError::NotFound(format!("User {} not found", user_id)))?;

        let profile = self
            .profile_repo
            .get_by_user_id(user_id)
            .await
            .context("Failed to get profile")?
            .ok_or_else(|| {
                ProfileServiceError::NotFound(format!("Profile for user {} not found", user_id))
            })?;

        let mut errors = ValidationErrors::new();

        // User payload first
        validate_username(&mut errors, &user_input.username);
        validate_email(&mut errors, &user_input.email);

        // Then profile payload
        validate_slug(&mut errors, "slug", &profile_input.slug);
        validate_bio(&mut errors, &profile_input.bio);
        if let Some(birth_date) = profile_input.birth_date {
            validate_birth_date(&mut errors, birth_date);
        }
        if let Some(ref avatar) = profile_input.avatar {
            if !self.upload.is_extension_allowed(avatar) {
                errors.add(
                    "avatar",
                    format!(
                        "Avatar must be one of: {}",
                        self.upload.allowed_extensions.join(", ")
                    ),
                );
            }
        }

        // Uniqueness checks exclude the principal: a user resubmitting
        // their own email, username or slug must not conflict with
        // themselves.
        if !errors.has_field("username")
            && self
                .user_repo
                .username_taken_by_other(&user_input.username, user.id)
                .await
                .context("Failed to check username uniqueness")?
        {
            errors.add("username", "This username is already taken");
        }

        if !errors.has_field("email")
            && self
                .user_repo
                .email_taken_by_other(&user_input.email, user.id)
                .await
                .context("Failed to check email uniqueness")?
        {
            errors.add("email", "This email is already in use by another account");
        }

        if !errors.has_field("slug")
            && self
                .profile_repo
                .slug_taken_by_other(&profile_input.slug, profile.id)
                .await
                .context("Failed to check slug uniqueness")?
        {
            errors.add("slug", "This slug is already taken");
        }

        if !errors.is_empty() {
            return Err(ProfileServiceError::ValidationError(errors));
        }

        let mut updated_user = user.clone();
        user_input.apply(&mut updated_user);
        let mut updated_profile = profile.clone();
        profile_input.apply(&mut updated_profile);

        let (user, profile) = self
            .profile_repo
            .update_with_user(&updated_user, &updated_profile)
            .await
            .context("Failed to persist profile update")?;

        tracing::info!(user_id = user.id, slug = %profile.slug, "Profile updated");

        let redirect_slug = profile.slug.clone();
        Ok(ProfileUpdateOutcome {
            user,
            profile,
            redirect_slug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxProfileRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::services::user::{RegisterInput, UserService};
    use chrono::NaiveDate;

    async fn setup_with_upload(upload: UploadConfig) -> (UserService, ProfileService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let profile_repo = SqlxProfileRepository::boxed(pool.clone());
        let users = UserService::new(
            user_repo.clone(),
            profile_repo.clone(),
            SqlxSessionRepository::boxed(pool),
        );
        let profiles = ProfileService::new(user_repo, profile_repo, Arc::new(upload));
        (users, profiles)
    }

    async fn setup() -> (UserService, ProfileService) {
        setup_with_upload(UploadConfig::default()).await
    }

    async fn register(users: &UserService, username: &str, email: &str) -> (User, Profile) {
        users
            .register(RegisterInput {
                username: username.to_string(),
                email: email.to_string(),
                password: "secure_password".to_string(),
                password_confirm: "secure_password".to_string(),
            })
            .await
            .expect("Registration failed")
    }

    fn inputs_for(user: &User, profile: &Profile) -> (UserUpdateInput, ProfileUpdateInput) {
        (
            UserUpdateInput::from_user(user),
            ProfileUpdateInput::from_profile(profile),
        )
    }

    #[tokio::test]
    async fn test_update_bio_keeps_user_fields() {
        let (users, profiles) = setup().await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        let (user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        profile_input.bio = "I write Rust".to_string();

        let outcome = profiles
            .update(alice.id, user_input, profile_input)
            .await
            .expect("Update failed");

        assert_eq!(outcome.profile.bio, "I write Rust");
        assert_eq!(outcome.user.email, "alice@example.com");
        assert_eq!(outcome.redirect_slug, "alice");
    }

    #[tokio::test]
    async fn test_cannot_take_anothers_email() {
        let (users, profiles) = setup().await;
        register(&users, "alice", "alice@example.com").await;
        let (bob, bob_profile) = register(&users, "bob", "bob@example.com").await;

        let (mut user_input, mut profile_input) = inputs_for(&bob, &bob_profile);
        user_input.email = "alice@example.com".to_string();
        profile_input.bio = "New bio".to_string();

        let result = profiles.update(bob.id, user_input, profile_input).await;

        match result {
            Err(ProfileServiceError::ValidationError(errors)) => {
                assert!(errors.has_field("email"));
            }
            other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
        }

        // Neither record changed
        let (db_bob, db_bob_profile) = profiles.get_by_slug("bob").await.unwrap();
        assert_eq!(db_bob.email, "bob@example.com");
        assert_eq!(db_bob_profile.bio, "");
    }

    #[tokio::test]
    async fn test_keeping_own_email_is_not_a_conflict() {
        let (users, profiles) = setup().await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        // Resubmit the identical payload
        let (user_input, profile_input) = inputs_for(&alice, &alice_profile);

        profiles
            .update(alice.id, user_input, profile_input)
            .await
            .expect("Identity update should succeed");
    }

    #[tokio::test]
    async fn test_cannot_take_anothers_slug() {
        let (users, profiles) = setup().await;
        register(&users, "alice", "alice@example.com").await;
        let (bob, bob_profile) = register(&users, "bob", "bob@example.com").await;

        let (user_input, mut profile_input) = inputs_for(&bob, &bob_profile);
        profile_input.slug = "alice".to_string();

        let result = profiles.update(bob.id, user_input, profile_input).await;

        match result {
            Err(ProfileServiceError::ValidationError(errors)) => {
                assert!(errors.has_field("slug"));
            }
            other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let (users, profiles) = setup().await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        // Valid user change paired with an invalid profile change
        let (mut user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        user_input.first_name = "Alice".to_string();
        profile_input.bio = "x".repeat(crate::models::MAX_BIO_LENGTH + 1);

        let result = profiles.update(alice.id, user_input, profile_input).await;
        assert!(matches!(
            result,
            Err(ProfileServiceError::ValidationError(_))
        ));

        // The valid half of the payload must not have been applied
        let (db_user, db_profile) = profiles.get_by_slug("alice").await.unwrap();
        assert_eq!(db_user.first_name, "");
        assert_eq!(db_profile.bio, "");
    }

    #[tokio::test]
    async fn test_errors_reported_across_both_payloads() {
        let (users, profiles) = setup().await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        let (mut user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        user_input.email = "not-an-email".to_string();
        profile_input.slug = "Has Spaces".to_string();

        match profiles.update(alice.id, user_input, profile_input).await {
            Err(ProfileServiceError::ValidationError(errors)) => {
                assert!(errors.has_field("email"));
                assert!(errors.has_field("slug"));
                // User fields are validated before profile fields
                let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
                let email_pos = fields.iter().position(|f| *f == "email").unwrap();
                let slug_pos = fields.iter().position(|f| *f == "slug").unwrap();
                assert!(email_pos < slug_pos);
            }
            other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_slug_change_updates_redirect() {
        let (users, profiles) = setup().await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        let (user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        profile_input.slug = "alice-writes".to_string();

        let outcome = profiles
            .update(alice.id, user_input, profile_input)
            .await
            .expect("Update failed");

        assert_eq!(outcome.redirect_slug, "alice-writes");
        assert!(profiles.get_by_slug("alice-writes").await.is_ok());
        assert!(matches!(
            profiles.get_by_slug("alice").await,
            Err(ProfileServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_invalid_avatar_extension() {
        let (users, profiles) = setup().await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        let (user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        profile_input.avatar = Some("avatars/alice.exe".to_string());

        match profiles.update(alice.id, user_input, profile_input).await {
            Err(ProfileServiceError::ValidationError(errors)) => {
                assert!(errors.has_field("avatar"));
            }
            other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_accepts_allowed_avatar_extension() {
        let (users, profiles) = setup().await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        let (user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        profile_input.avatar = Some("avatars/alice.PNG".to_string());
        profile_input.birth_date = NaiveDate::from_ymd_opt(1990, 5, 1);

        let outcome = profiles
            .update(alice.id, user_input, profile_input)
            .await
            .expect("Update failed");

        assert_eq!(outcome.profile.avatar.as_deref(), Some("avatars/alice.PNG"));
        assert_eq!(outcome.profile.birth_date, NaiveDate::from_ymd_opt(1990, 5, 1));
    }

    #[tokio::test]
    async fn test_avatar_whitelist_comes_from_config() {
        let upload = UploadConfig {
            allowed_extensions: vec!["png".to_string()],
            ..UploadConfig::default()
        };
        let (users, profiles) = setup_with_upload(upload).await;
        let (alice, alice_profile) = register(&users, "alice", "alice@example.com").await;

        // jpg is in the default whitelist but not in this configuration
        let (user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        profile_input.avatar = Some("avatars/alice.jpg".to_string());

        match profiles.update(alice.id, user_input, profile_input).await {
            Err(ProfileServiceError::ValidationError(errors)) => {
                assert!(errors.has_field("avatar"));
            }
            other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
        }

        let (user_input, mut profile_input) = inputs_for(&alice, &alice_profile);
        profile_input.avatar = Some("avatars/alice.png".to_string());
        profiles
            .update(alice.id, user_input, profile_input)
            .await
            .expect("Configured extension should be accepted");
    }

    #[tokio::test]
    async fn test_update_for_missing_user() {
        let (_users, profiles) = setup().await;

        let result = profiles
            .update(
                9999,
                UserUpdateInput {
                    username: "ghost".to_string(),
                    email: "ghost@example.com".to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                },
                ProfileUpdateInput {
                    slug: "ghost".to_string(),
                    birth_date: None,
                    bio: String::new(),
                    avatar: None,
                },
            )
            .await;

        assert!(matches!(result, Err(ProfileServiceError::NotFound(_))));
    }
}
