//! Services layer - Business logic
//!
//! This module contains all business logic services for inkpress.
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod category;
pub mod password;
pub mod post;
pub mod profile;
pub mod user;
pub mod validation;

pub use category::{CategoryService, CategoryServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use profile::{ProfileService, ProfileServiceError, ProfileUpdateOutcome};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
pub use validation::ValidationErrors;
