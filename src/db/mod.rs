//! Database layer
//!
//! This module contains the database abstraction supporting both SQLite
//! and MySQL, code-based migrations, and the repository implementations.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use migrations::run_migrations;
pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
