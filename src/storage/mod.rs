//! # Storage Layer
//!
//! SQLite-backed persistence: connection pool management, embedded schema
//! migrations, and per-entity repositories.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool};
