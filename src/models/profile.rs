//! Profile model
//!
//! A Profile is a one-to-one extension of a User: bio, avatar, birth date
//! and the public slug under which the profile page is served. Profiles are
//! mutated only through the profile service's co-update operation, which
//! writes the User and Profile rows in a single transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum bio length in characters
pub const MAX_BIO_LENGTH: usize = 500;

/// Profile entity, owned 1:1 by a User.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier
    pub id: i64,
    /// Owning user ID (unique)
    pub user_id: i64,
    /// URL-safe public identifier (unique)
    pub slug: String,
    /// Date of birth
    pub birth_date: Option<NaiveDate>,
    /// Short biography (bounded length)
    pub bio: String,
    /// Avatar image reference (path under the upload root)
    pub avatar: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create an empty profile for a freshly registered user.
    ///
    /// The slug defaults to the username so the profile page is reachable
    /// immediately after registration.
    pub fn for_user(user_id: i64, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            user_id,
            slug,
            birth_date: None,
            bio: String::new(),
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Candidate profile payload for the profile edit flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdateInput {
    /// New public slug
    pub slug: String,
    /// New birth date (ISO 8601 date)
    pub birth_date: Option<NaiveDate>,
    /// New biography
    pub bio: String,
    /// New avatar reference (unchanged when None)
    pub avatar: Option<String>,
}

impl ProfileUpdateInput {
    /// Build an update payload from an existing profile (no-op edit)
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            slug: profile.slug.clone(),
            birth_date: profile.birth_date,
            bio: profile.bio.clone(),
            avatar: profile.avatar.clone(),
        }
    }

    /// Apply this payload onto a profile record
    pub fn apply(&self, profile: &mut Profile) {
        profile.slug = self.slug.clone();
        profile.birth_date = self.birth_date;
        profile.bio = self.bio.clone();
        if self.avatar.is_some() {
            profile.avatar = self.avatar.clone();
        }
    }
}
