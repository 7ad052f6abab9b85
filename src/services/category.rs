//! Category service
//!
//! Business logic for the hierarchical category taxonomy.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryTree, CreateCategoryInput};
use crate::services::validation::{validate_slug, validate_title, ValidationErrors};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error with field-level details
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    category_repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    /// Create a new category service with the given repository
    pub fn new(category_repo: Arc<dyn CategoryRepository>) -> Self {
        Self { category_repo }
    }

    /// Create a new category.
    ///
    /// The parent, when given, must exist; the slug must be unused.
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let mut errors = ValidationErrors::new();
        validate_title(&mut errors, &input.title);
        validate_slug(&mut errors, "slug", &input.slug);

        if !errors.has_field("slug")
            && self
                .category_repo
                .slug_exists(&input.slug)
                .await
                .context("Failed to check category slug")?
        {
            errors.add("slug", "This slug is already taken");
        }

        if let Some(parent_id) = input.parent_id {
            if self
                .category_repo
                .get_by_id(parent_id)
                .await
                .context("Failed to check parent category")?
                .is_none()
            {
                errors.add("parent_id", "Parent category does not exist");
            }
        }

        if !errors.is_empty() {
            return Err(CategoryServiceError::ValidationError(errors));
        }

        let category = Category::new(
            input.title,
            input.slug,
            input.parent_id,
            input.sort_order.unwrap_or(0),
        );

        let created = self
            .category_repo
            .create(&category)
            .await
            .context("Failed to create category")?;

        tracing::info!(category_id = created.id, slug = %created.slug, "Category created");

        Ok(created)
    }

    /// Get a category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        self.category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category '{}' not found", slug)))
    }

    /// Get the full category forest
    pub async fn tree(&self) -> Result<Vec<CategoryTree>, CategoryServiceError> {
        let categories = self
            .category_repo
            .list_all()
            .await
            .context("Failed to list categories")?;

        Ok(CategoryTree::build(categories))
    }

    /// Delete a category
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .is_none()
        {
            return Err(CategoryServiceError::NotFound(format!(
                "Category {} not found",
                id
            )));
        }

        self.category_repo
            .delete(id)
            .await
            .context("Failed to delete category")?;

        Ok(())
    }
}
