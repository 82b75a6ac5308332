//! SQLite backend for the Hustings person-history store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write runs the engine operation
//! inside a single SQLite transaction, so a rejected edit, revert or merge
//! leaves no trace.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
