//! SQLite backend for the formbase materialization engine.
//!
//! The engine itself is synchronous and works on a borrowed
//! [`rusqlite::Connection`] ([`ingest`], [`registry`], [`materialize`],
//! [`load`]). [`SqliteStore`] wraps [`tokio_rusqlite`] so every call runs on
//! one dedicated database thread, which also serializes schema changes.

mod ddl;
mod encode;
mod schema;
mod store;

pub mod error;
pub mod ingest;
pub mod load;
pub mod materialize;
pub mod registry;

pub use error::{Error, Result};
pub use materialize::{LiveColumn, LiveTable};
pub use schema::SCHEMA;
pub use store::{SqliteStore, StoreOptions};
