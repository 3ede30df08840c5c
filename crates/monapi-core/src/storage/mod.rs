//! Storage boundary and the SQLite implementation.

mod executor;
mod sqlite;

pub use executor::SqlExecutor;
pub use sqlite::{SqliteStore, SCHEMA};
