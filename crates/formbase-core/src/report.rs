//! Structured results of ingesting and deleting documents.
//!
//! Fatal problems are returned as errors by the store; everything recorded
//! here is non-fatal and sits alongside an otherwise successful ingestion.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sql_type::{SqlType, TypeConflict};

// ─── Non-fatal issues ────────────────────────────────────────────────────────

/// A column that could not be added to an existing table. Values bound for it
/// are left out of later inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("could not add column {column:?} to table {table:?}: {message}")]
pub struct SchemaMigrationWarning {
  pub table:   String,
  pub column:  String,
  pub message: String,
}

/// A branch of the document whose insert failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("insert into {table:?} at {path} failed: {message}")]
pub struct InsertError {
  pub table:          String,
  /// Location of the branch in the document, e.g. `$.steps[2]`.
  pub path:           String,
  pub message:        String,
  /// Rows already written for this branch's descendants and rolled back.
  pub discarded_rows: usize,
  /// List items under this branch that were never attempted.
  pub orphaned_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedColumn {
  pub table:    String,
  pub column:   String,
  pub sql_type: SqlType,
}

/// A key stored under a suffixed column because another key of the same
/// object already claimed its natural column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedColumn {
  pub table:  String,
  pub key:    String,
  pub column: String,
}

// ─── IngestReport ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestStatus {
  Complete,
  Partial { issues: usize },
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
  pub doc_name:       String,
  pub doc_id:         i64,
  pub ingested_at:    DateTime<Utc>,
  /// Row id of the document's root row, if it was inserted.
  pub root_row:       Option<i64>,
  pub rows_inserted:  usize,
  pub tables_created: Vec<String>,
  pub columns_added:  Vec<AddedColumn>,
  pub renamed:        Vec<RenamedColumn>,
  pub type_conflicts: Vec<TypeConflict>,
  pub warnings:       Vec<SchemaMigrationWarning>,
  pub skipped:        Vec<InsertError>,
}

impl IngestReport {
  pub fn new(doc_name: impl Into<String>, doc_id: i64) -> Self {
    Self {
      doc_name:       doc_name.into(),
      doc_id,
      ingested_at:    Utc::now(),
      root_row:       None,
      rows_inserted:  0,
      tables_created: Vec::new(),
      columns_added:  Vec::new(),
      renamed:        Vec::new(),
      type_conflicts: Vec::new(),
      warnings:       Vec::new(),
      skipped:        Vec::new(),
    }
  }

  pub fn issue_count(&self) -> usize { self.warnings.len() + self.skipped.len() }

  pub fn status(&self) -> IngestStatus {
    match self.issue_count() {
      0 => IngestStatus::Complete,
      issues => IngestStatus::Partial { issues },
    }
  }
}

// ─── Deletion ────────────────────────────────────────────────────────────────

/// Rows removed when a document is deleted or replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
  pub doc_name:     String,
  pub doc_id:       i64,
  /// Table name → rows deleted; tables with no matching rows are omitted.
  pub rows_deleted: BTreeMap<String, usize>,
}

impl DeletionReport {
  pub fn total(&self) -> usize { self.rows_deleted.values().sum() }
}
