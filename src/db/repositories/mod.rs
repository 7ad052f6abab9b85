//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod category;
pub mod post;
pub mod profile;
pub mod session;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
