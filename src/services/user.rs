//! User service
//!
//! Implements business logic for accounts and authentication:
//! - Registration with a defensive email uniqueness check
//! - Login/logout with opaque session tokens
//! - Session validation and expiry

use crate::db::repositories::{ProfileRepository, SessionRepository, UserRepository};
use crate::models::{Profile, Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation::{
    validate_email, validate_username, ValidationErrors,
};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Minimum accepted password length
const MIN_PASSWORD_LENGTH: usize = 8;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error with field-level details
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Session expired
    #[error("Session expired")]
    SessionExpired,

    /// Session not found
    #[error("Session not found")]
    SessionNotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    /// Desired username
    pub username: String,
    /// Email address
    pub email: String,
    /// Plaintext password
    pub password: String,
    /// Password confirmation, must match `password`
    pub password_confirm: String,
}

/// Login input
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Username or email address
    pub username_or_email: String,
    /// Plaintext password
    pub password: String,
}

/// User service for managing accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new user.
    ///
    /// Creates the account together with an initial profile whose slug is
    /// the username. The email uniqueness check runs before the insert
    /// even though the database enforces it too, so the caller gets a
    /// clean `UserExists` instead of a constraint violation.
    pub async fn register(&self, input: RegisterInput) -> Result<(User, Profile), UserServiceError> {
        self.validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = User::new(input.username, input.email, password_hash);
        let created_user = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        let profile = Profile::for_user(created_user.id, created_user.username.clone());
        let created_profile = self
            .profile_repo
            .create(&profile)
            .await
            .context("Failed to create profile")?;

        tracing::info!(user_id = created_user.id, username = %created_user.username, "User registered");

        Ok((created_user, created_profile))
    }

    /// Login with credentials.
    ///
    /// Accepts a username or an email address. Returns a new session on
    /// success. Unknown account and wrong password produce the same
    /// error message.
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let user = self
            .find_user_by_username_or_email(&input.username_or_email)
            .await?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError("Invalid username or password".to_string())
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;

        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            ));
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: Utc::now() + Duration::days(self.session_expiration_days),
            created_at: Utc::now(),
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(created)
    }

    /// Logout by deleting a session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Validate a session token and return its user.
    ///
    /// An expired session is removed as a side effect.
    pub async fn validate_session(&self, session_id: &str) -> Result<User, UserServiceError> {
        let session = self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get session")?
            .ok_or(UserServiceError::SessionNotFound)?;

        if session.is_expired() {
            self.session_repo
                .delete(session_id)
                .await
                .context("Failed to delete expired session")?;
            return Err(UserServiceError::SessionExpired);
        }

        self.user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?
            .ok_or(UserServiceError::SessionNotFound)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?)
    }

    /// Remove all expired sessions
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to clean up sessions")?)
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if username_or_email.contains('@') {
            Ok(self
                .user_repo
                .get_by_email(username_or_email)
                .await
                .context("Failed to look up user by email")?)
        } else {
            Ok(self
                .user_repo
                .get_by_username(username_or_email)
                .await
                .context("Failed to look up user by username")?)
        }
    }

    fn validate_register_input(&self, input: &RegisterInput) -> Result<(), UserServiceError> {
        let mut errors = ValidationErrors::new();

        validate_username(&mut errors, &input.username);
        validate_email(&mut errors, &input.email);

        if input.password.len() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            );
        }
        if input.password != input.password_confirm {
            errors.add("password_confirm", "Passwords do not match");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(UserServiceError::ValidationError(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxProfileRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};

    async fn setup_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxProfileRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn register_input(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "secure_password".to_string(),
            password_confirm: "secure_password".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_user_and_profile() {
        let service = setup_service().await;

        let (user, profile) = service
            .register(register_input("alice", "alice@example.com"))
            .await
            .expect("Registration failed");

        assert!(user.id > 0);
        assert_eq!(profile.user_id, user.id);
        assert_eq!(profile.slug, "alice");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_username() {
        let service = setup_service().await;
        service
            .register(register_input("alice", "alice@example.com"))
            .await
            .expect("First registration failed");

        let result = service
            .register(register_input("alice", "other@example.com"))
            .await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let service = setup_service().await;
        service
            .register(register_input("alice", "shared@example.com"))
            .await
            .expect("First registration failed");

        let result = service
            .register(register_input("bob", "shared@example.com"))
            .await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_password_mismatch() {
        let service = setup_service().await;
        let mut input = register_input("alice", "alice@example.com");
        input.password_confirm = "different_password".to_string();

        let result = service.register(input).await;

        match result {
            Err(UserServiceError::ValidationError(errors)) => {
                assert!(errors.has_field("password_confirm"));
            }
            other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let service = setup_service().await;

        let result = service.register(register_input("alice", "not-an-email")).await;

        match result {
            Err(UserServiceError::ValidationError(errors)) => {
                assert!(errors.has_field("email"));
            }
            other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_login_with_username_and_email() {
        let service = setup_service().await;
        service
            .register(register_input("alice", "alice@example.com"))
            .await
            .expect("Registration failed");

        let by_username = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "secure_password".to_string(),
            })
            .await
            .expect("Login by username failed");
        assert!(!by_username.is_expired());

        let by_email = service
            .login(LoginInput {
                username_or_email: "alice@example.com".to_string(),
                password: "secure_password".to_string(),
            })
            .await
            .expect("Login by email failed");
        assert!(!by_email.is_expired());
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let service = setup_service().await;
        service
            .register(register_input("alice", "alice@example.com"))
            .await
            .expect("Registration failed");

        let result = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "wrong_password".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_user() {
        let service = setup_service().await;

        let result = service
            .login(LoginInput {
                username_or_email: "ghost".to_string(),
                password: "secure_password".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_session_round_trip() {
        let service = setup_service().await;
        let (user, _) = service
            .register(register_input("alice", "alice@example.com"))
            .await
            .expect("Registration failed");

        let session = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "secure_password".to_string(),
            })
            .await
            .expect("Login failed");

        let validated = service
            .validate_session(&session.id)
            .await
            .expect("Session should be valid");
        assert_eq!(validated.id, user.id);
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let service = setup_service().await;
        service
            .register(register_input("alice", "alice@example.com"))
            .await
            .expect("Registration failed");

        let session = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "secure_password".to_string(),
            })
            .await
            .expect("Login failed");

        service.logout(&session.id).await.expect("Logout failed");

        let result = service.validate_session(&session.id).await;
        assert!(matches!(result, Err(UserServiceError::SessionNotFound)));
    }

    #[tokio::test]
    async fn test_validate_session_unknown_token() {
        let service = setup_service().await;

        let result = service.validate_session("no-such-token").await;

        assert!(matches!(result, Err(UserServiceError::SessionNotFound)));
    }
}
