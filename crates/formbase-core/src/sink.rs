//! The `DocumentSink` trait.
//!
//! Implemented by storage backends (e.g. `formbase-store-sqlite`). Batch
//! ingestion and the CLI depend on this abstraction, not on a concrete
//! backend.

use std::future::Future;

use serde_json::Value;

use crate::{
  document::Document,
  report::{DeletionReport, IngestReport},
};

/// A store that materializes JSON documents into relational tables.
///
/// Ingestion is append-only: ingesting a name that is already registered
/// reuses its id and adds a fresh set of rows. Replacing prior rows is the
/// separate [`DocumentSink::replace`] operation.
pub trait DocumentSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up the id registered for `doc_name`, registering it first if it is
  /// new. Idempotent.
  fn resolve_document_id(
    &self,
    doc_name: String,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Evolve the schema as needed and insert `document` under `doc_name`.
  fn ingest(
    &self,
    doc_name: String,
    document: Value,
  ) -> impl Future<Output = Result<IngestReport, Self::Error>> + Send + '_;

  /// Delete the rows previously stored for `doc_name`, keeping its id, then
  /// ingest `document` in their place.
  fn replace(
    &self,
    doc_name: String,
    document: Value,
  ) -> impl Future<Output = Result<IngestReport, Self::Error>> + Send + '_;

  /// Remove a document and every row tagged with it. Returns `None` if the
  /// name is not registered.
  fn delete_document(
    &self,
    doc_name: String,
  ) -> impl Future<Output = Result<Option<DeletionReport>, Self::Error>> + Send + '_;

  fn list_documents(
    &self,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;
}
