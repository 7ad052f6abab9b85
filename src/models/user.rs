//! User model
//!
//! This module defines the User entity and the payload type used by the
//! profile edit flow to update account fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
///
/// Contact fields (`first_name`, `last_name`) are editable through the
/// profile edit flow together with the user's `Profile` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique across users)
    pub email: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// Note: The password should already be hashed before calling this
    /// function. Use `services::password::hash_password()` to hash it.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full display name, falling back to the username when names are unset
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Candidate user payload for the profile edit flow.
///
/// All four fields are required; validation happens in the profile service
/// before any write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdateInput {
    /// New username
    pub username: String,
    /// New email address
    pub email: String,
    /// New first name
    pub first_name: String,
    /// New last name
    pub last_name: String,
}

impl UserUpdateInput {
    /// Build an update payload from an existing user (no-op edit)
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }

    /// Apply this payload onto a user record
    pub fn apply(&self, user: &mut User) {
        user.username = self.username.clone();
        user.email = self.email.clone();
        user.first_name = self.first_name.clone();
        user.last_name = self.last_name.clone();
    }
}
