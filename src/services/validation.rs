//! Input validation
//!
//! Field-level validation shared by the service layer. Validation
//! failures are collected per field in `ValidationErrors`, so a single
//! rejected request can report every offending field at once.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::MAX_BIO_LENGTH;

/// Maximum length for usernames and slugs
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length for email addresses
pub const MAX_EMAIL_LENGTH: usize = 255;

/// Validation errors keyed by field name.
///
/// Fields keep the order in which errors were added, so callers that
/// validate user fields before profile fields report them in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<(String, String)>,
}

impl ValidationErrors {
    /// Create an empty error collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push((field.to_string(), message.into()));
    }

    /// True when no errors have been recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Check whether a field has at least one error
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|(f, _)| f == field)
    }

    /// Iterate over (field, message) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// Group messages by field for serialization
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (field, message) in &self.errors {
            map.entry(field.clone()).or_default().push(message.clone());
        }
        map
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.by_field().serialize(serializer)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Validate a username: non-empty, bounded, limited character set.
pub fn validate_username(errors: &mut ValidationErrors, username: &str) {
    if username.trim().is_empty() {
        errors.add("username", "Username is required");
        return;
    }
    if username.len() > MAX_NAME_LENGTH {
        errors.add("username", "Username is too long");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+'))
    {
        errors.add("username", "Username contains invalid characters");
    }
}

/// Validate an email address.
///
/// A lightweight structural check: one '@', non-empty local part, and a
/// domain containing a dot. Deliverability is out of scope.
pub fn validate_email(errors: &mut ValidationErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
        return;
    }
    if email.len() > MAX_EMAIL_LENGTH {
        errors.add("email", "Email is too long");
        return;
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
        errors.add("email", "Enter a valid email address");
    }
}

/// Validate a URL slug: non-empty, bounded, lowercase letters, digits,
/// hyphens and underscores only.
pub fn validate_slug(errors: &mut ValidationErrors, field: &str, slug: &str) {
    if slug.trim().is_empty() {
        errors.add(field, "Slug is required");
        return;
    }
    if slug.len() > MAX_NAME_LENGTH {
        errors.add(field, "Slug is too long");
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        errors.add(field, "Slug may only contain lowercase letters, digits, hyphens and underscores");
    }
}

/// Validate a bio against the maximum length
pub fn validate_bio(errors: &mut ValidationErrors, bio: &str) {
    if bio.chars().count() > MAX_BIO_LENGTH {
        errors.add(
            "bio",
            format!("Bio must be at most {} characters", MAX_BIO_LENGTH),
        );
    }
}

/// Validate a description against the maximum length (same bound as bio)
pub fn validate_description(errors: &mut ValidationErrors, description: &str) {
    if description.chars().count() > MAX_BIO_LENGTH {
        errors.add(
            "description",
            format!("Description must be at most {} characters", MAX_BIO_LENGTH),
        );
    }
}

/// Validate a birth date: must not be in the future.
pub fn validate_birth_date(errors: &mut ValidationErrors, birth_date: chrono::NaiveDate) {
    if birth_date > chrono::Utc::now().date_naive() {
        errors.add("birth_date", "Birth date cannot be in the future");
    }
}

/// Validate a non-empty bounded title
pub fn validate_title(errors: &mut ValidationErrors, title: &str) {
    if title.trim().is_empty() {
        errors.add("title", "Title is required");
    } else if title.len() > 255 {
        errors.add("title", "Title is too long");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_empty_collection() {
        let errors = ValidationErrors::new();
        assert!(errors.is_empty());
        assert_eq!(errors.len(), 0);
    }

    #[test]
    fn test_errors_keep_insertion_order() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Enter a valid email address");
        errors.add("slug", "Slug is required");

        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["email", "slug"]);
    }

    #[test]
    fn test_by_field_groups_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "first");
        errors.add("email", "second");

        let grouped = errors.by_field();
        assert_eq!(grouped["email"], vec!["first", "second"]);
    }

    #[test]
    fn test_validate_username() {
        let mut errors = ValidationErrors::new();
        validate_username(&mut errors, "alice_01");
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        validate_username(&mut errors, "");
        assert!(errors.has_field("username"));

        let mut errors = ValidationErrors::new();
        validate_username(&mut errors, "has spaces");
        assert!(errors.has_field("username"));
    }

    #[test]
    fn test_validate_email() {
        let mut errors = ValidationErrors::new();
        validate_email(&mut errors, "alice@example.com");
        assert!(errors.is_empty());

        for bad in ["", "no-at-sign", "@example.com", "alice@", "alice@nodot", "alice@trailing."] {
            let mut errors = ValidationErrors::new();
            validate_email(&mut errors, bad);
            assert!(errors.has_field("email"), "{:?} should be invalid", bad);
        }
    }

    #[test]
    fn test_validate_slug() {
        let mut errors = ValidationErrors::new();
        validate_slug(&mut errors, "slug", "my-post_1");
        assert!(errors.is_empty());

        for bad in ["", "Has-Caps", "has space", "ünïcode"] {
            let mut errors = ValidationErrors::new();
            validate_slug(&mut errors, "slug", bad);
            assert!(errors.has_field("slug"), "{:?} should be invalid", bad);
        }
    }

    #[test]
    fn test_validate_bio_length() {
        let mut errors = ValidationErrors::new();
        validate_bio(&mut errors, &"x".repeat(crate::models::MAX_BIO_LENGTH));
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        validate_bio(&mut errors, &"x".repeat(crate::models::MAX_BIO_LENGTH + 1));
        assert!(errors.has_field("bio"));
    }

    #[test]
    fn test_validate_birth_date() {
        let mut errors = ValidationErrors::new();
        validate_birth_date(&mut errors, Utc::now().date_naive());
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        validate_birth_date(&mut errors, Utc::now().date_naive() + Duration::days(2));
        assert!(errors.has_field("birth_date"));
    }
}
