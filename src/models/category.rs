//! Category model
//!
//! Categories are a hierarchical taxonomy for posts: each category may have
//! a parent, forming a tree, and every post references exactly one category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity representing a node in the category tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Category title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Parent category ID (None for root categories)
    pub parent_id: Option<i64>,
    /// Sort order within the parent
    pub sort_order: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new Category with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(title: String, slug: String, parent_id: Option<i64>, sort_order: i32) -> Self {
        Self {
            id: 0, // Will be set by the database
            title,
            slug,
            parent_id,
            sort_order,
            created_at: Utc::now(),
        }
    }

    /// Check if this is a root category (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Category with its children for tree representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTree {
    /// The category itself
    #[serde(flatten)]
    pub category: Category,
    /// Child categories
    pub children: Vec<CategoryTree>,
}

impl CategoryTree {
    /// Create a new CategoryTree node with no children
    pub fn new(category: Category) -> Self {
        Self {
            category,
            children: Vec::new(),
        }
    }

    /// Build a forest of trees from a flat category list.
    ///
    /// Categories whose parent is missing from the list are treated as
    /// roots. Siblings keep their `sort_order` ordering from the input.
    pub fn build(categories: Vec<Category>) -> Vec<CategoryTree> {
        use std::collections::HashMap;

        let ids: std::collections::HashSet<i64> = categories.iter().map(|c| c.id).collect();
        let mut children_of: HashMap<i64, Vec<Category>> = HashMap::new();
        let mut roots = Vec::new();

        for category in categories {
            match category.parent_id {
                Some(parent_id) if ids.contains(&parent_id) => {
                    children_of.entry(parent_id).or_default().push(category);
                }
                _ => roots.push(category),
            }
        }

        fn attach(
            category: Category,
            children_of: &mut std::collections::HashMap<i64, Vec<Category>>,
        ) -> CategoryTree {
            let mut node = CategoryTree::new(category);
            if let Some(children) = children_of.remove(&node.category.id) {
                node.children = children
                    .into_iter()
                    .map(|c| attach(c, children_of))
                    .collect();
            }
            node
        }

        roots
            .into_iter()
            .map(|c| attach(c, &mut children_of))
            .collect()
    }
}

/// Input for creating a new category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    /// Category title
    pub title: String,
    /// URL-friendly slug
    pub slug: String,
    /// Parent category ID (optional)
    pub parent_id: Option<i64>,
    /// Sort order within the parent (defaults to 0)
    pub sort_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, slug: &str, parent_id: Option<i64>) -> Category {
        let mut c = Category::new(slug.to_uppercase(), slug.to_string(), parent_id, 0);
        c.id = id;
        c
    }

    #[test]
    fn test_is_root() {
        assert!(category(1, "root", None).is_root());
        assert!(!category(2, "child", Some(1)).is_root());
    }

    #[test]
    fn test_build_tree_nests_children() {
        let flat = vec![
            category(1, "tech", None),
            category(2, "rust", Some(1)),
            category(3, "databases", Some(1)),
            category(4, "life", None),
        ];

        let tree = CategoryTree::build(flat);

        assert_eq!(tree.len(), 2);
        let tech = tree.iter().find(|t| t.category.slug == "tech").unwrap();
        assert_eq!(tech.children.len(), 2);
        let life = tree.iter().find(|t| t.category.slug == "life").unwrap();
        assert!(life.children.is_empty());
    }

    #[test]
    fn test_build_tree_deep_nesting() {
        let flat = vec![
            category(1, "a", None),
            category(2, "b", Some(1)),
            category(3, "c", Some(2)),
        ];

        let tree = CategoryTree::build(flat);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].category.slug, "c");
    }

    #[test]
    fn test_build_tree_orphan_becomes_root() {
        // Parent id 99 is not in the list
        let flat = vec![category(1, "orphan", Some(99))];

        let tree = CategoryTree::build(flat);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.slug, "orphan");
    }
}
