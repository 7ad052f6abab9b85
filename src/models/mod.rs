//! Data models
//!
//! This module contains all data structures used throughout inkpress.
//! Models represent:
//! - Database entities (User, Profile, Post, Category, Session)
//! - Input payloads for the service layer

mod category;
mod post;
mod profile;
mod session;
mod user;

pub use category::{Category, CategoryTree, CreateCategoryInput};
pub use post::{CreatePostInput, Post, PostFilter, PostStatus, UpdatePostInput};
pub use profile::{Profile, ProfileUpdateInput, MAX_BIO_LENGTH};
pub use session::Session;
pub use user::{User, UserUpdateInput};
