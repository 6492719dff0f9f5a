//! SQLite persistence layer for the game catalog.
//!
//! Provides schema creation, write operations, read queries, and the
//! [`CatalogStore`] repository trait backed by SQLite (via rusqlite with the
//! bundled feature).

pub mod operations;
pub mod queries;
pub mod schema;
pub mod store;

pub use operations::StoreError;
pub use queries::CatalogStats;
pub use schema::{SchemaError, open_database, open_memory};
pub use store::{CatalogStore, SqliteStore, check_existence};
