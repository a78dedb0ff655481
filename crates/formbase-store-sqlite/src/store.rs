//! [`SqliteStore`]: the SQLite implementation of [`DocumentSink`].

use std::path::Path;

use formbase_core::{
  ColumnTypePolicy,
  document::Document,
  ident::ROOT_TABLE,
  report::{DeletionReport, IngestReport},
  sink::DocumentSink,
};
use serde_json::Value;

use crate::{
  Error, Result,
  ingest::{self, IngestOptions},
  materialize::{self, LiveTable},
  registry,
  schema::SCHEMA,
};

/// Settings fixed for the lifetime of a store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// Table receiving the root object of each document.
  pub root_table:  String,
  pub type_policy: ColumnTypePolicy,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self { root_table: ROOT_TABLE.to_owned(), type_policy: ColumnTypePolicy::default() }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A formbase store backed by a single SQLite file.
///
/// Cloning is cheap; clones share one connection, and every operation runs on
/// its dedicated thread one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  options:         StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StoreOptions::default()).await
  }

  pub async fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub fn options(&self) -> &StoreOptions { &self.options }

  /// Look up a registered document without registering it.
  pub async fn find_document(&self, doc_name: String) -> Result<Option<i64>> {
    self
      .conn
      .call(move |conn| Ok(registry::find_document(conn, &doc_name)))
      .await?
  }

  /// Live tables and their columns, in name order.
  pub async fn reflect_schema(&self) -> Result<Vec<LiveTable>> {
    self
      .conn
      .call(|conn| Ok(materialize::reflect_schema(conn)))
      .await?
  }

  /// Drop every derived table and forget every document.
  pub async fn clear(&self) -> Result<Vec<String>> {
    self
      .conn
      .call(|conn| Ok(registry::clear_database(conn)))
      .await?
  }

  /// Close the underlying connection, surfacing any error from doing so.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }
}

// ─── DocumentSink impl ───────────────────────────────────────────────────────

impl DocumentSink for SqliteStore {
  type Error = Error;

  async fn resolve_document_id(&self, doc_name: String) -> Result<i64> {
    self
      .conn
      .call(move |conn| Ok(registry::resolve_document_id(conn, &doc_name)))
      .await?
  }

  async fn ingest(&self, doc_name: String, document: Value) -> Result<IngestReport> {
    let root_table = self.options.root_table.clone();
    let type_policy = self.options.type_policy;

    self
      .conn
      .call(move |conn| {
        let options = IngestOptions { root_table: &root_table, type_policy };
        Ok(ingest::ingest_document(conn, &doc_name, &document, options))
      })
      .await?
  }

  async fn replace(&self, doc_name: String, document: Value) -> Result<IngestReport> {
    let root_table = self.options.root_table.clone();
    let type_policy = self.options.type_policy;

    self
      .conn
      .call(move |conn| {
        let options = IngestOptions { root_table: &root_table, type_policy };
        Ok(ingest::replace_document(conn, &doc_name, &document, options))
      })
      .await?
  }

  async fn delete_document(&self, doc_name: String) -> Result<Option<DeletionReport>> {
    self
      .conn
      .call(move |conn| Ok(registry::delete_document(conn, &doc_name)))
      .await?
  }

  async fn list_documents(&self) -> Result<Vec<Document>> {
    self
      .conn
      .call(|conn| Ok(registry::list_documents(conn)))
      .await?
  }
}
