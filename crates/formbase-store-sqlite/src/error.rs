//! Error type for `formbase-store-sqlite`.
//!
//! Only fatal conditions live here; non-fatal issues are collected in
//! [`formbase_core::report::IngestReport`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] formbase_core::Error),

  /// The store connection thread failed or was closed.
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The document id could not be established after registering the name.
  #[error("could not resolve a document id for {doc_name:?}")]
  Registry { doc_name: String },

  /// The document's root row could not be inserted, so none of it would be
  /// stored.
  #[error("root row of {doc_name:?} was rejected: {message}")]
  RootRejected { doc_name: String, message: String },

  /// A table could not be created at all.
  #[error("could not create table {table:?}: {source}")]
  SchemaMigration {
    table:  String,
    #[source]
    source: rusqlite::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
