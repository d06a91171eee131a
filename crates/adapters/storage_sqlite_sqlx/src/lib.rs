//! # plughub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `ConfigStore` port defined in `plughub-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `plughub-app` (for port traits) and `plughub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod config_store;
pub mod error;
pub mod pool;

pub use config_store::SqliteConfigStore;
pub use pool::{Config, Database};
