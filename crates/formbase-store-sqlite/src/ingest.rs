//! The per-document ingestion pass:
//! `resolve_document_id → infer → ensure_table (per table) → insert`.
//!
//! Each document is ingested in its own transaction. A fatal error rolls the
//! document back and is returned; non-fatal issues end up in the
//! [`IngestReport`]. A rejected root row is fatal, since the document would
//! otherwise be registered with no rows at all. Nothing is retried.

use formbase_core::{ColumnTypePolicy, SchemaMap, report::IngestReport, schema::root_object};
use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use crate::{Error, Result, load::Loader, materialize, registry};

/// Settings for one ingestion pass.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions<'a> {
  pub root_table:  &'a str,
  pub type_policy: ColumnTypePolicy,
}

/// Ingest `document` as `doc_name`, appending to whatever was stored before.
pub fn ingest_document(
  conn: &mut Connection,
  doc_name: &str,
  document: &Value,
  options: IngestOptions<'_>,
) -> Result<IngestReport> {
  let tx = conn.transaction()?;
  let report = ingest_in(&tx, doc_name, document, options)?;
  tx.commit()?;
  Ok(report)
}

/// Delete the rows stored for `doc_name` and ingest `document` in their
/// place, atomically. The document keeps its id.
pub fn replace_document(
  conn: &mut Connection,
  doc_name: &str,
  document: &Value,
  options: IngestOptions<'_>,
) -> Result<IngestReport> {
  let tx = conn.transaction()?;
  if let Some(doc_id) = registry::find_document(&tx, doc_name)? {
    let deleted = registry::purge_rows(&tx, doc_id)?;
    info!(doc_name, doc_id, tables = deleted.len(), "previous rows removed");
  }
  let report = ingest_in(&tx, doc_name, document, options)?;
  tx.commit()?;
  Ok(report)
}

fn ingest_in(
  conn: &Connection,
  doc_name: &str,
  document: &Value,
  options: IngestOptions<'_>,
) -> Result<IngestReport> {
  let object = root_object(document)?;
  let doc_id = registry::resolve_document_id(conn, doc_name)?;

  let mut schema = SchemaMap::new();
  schema.infer(options.root_table, object, options.type_policy);

  let mut report = IngestReport::new(doc_name, doc_id);
  report.type_conflicts = schema.conflicts().to_vec();

  for layout in schema.tables() {
    materialize::ensure_table(conn, layout)?.record(&mut report);
  }

  let root_row = Loader::new(conn, doc_id, &schema, &mut report).insert(options.root_table, object)?;
  let Some(root_row) = root_row else {
    let message = report.skipped.last().map(|e| e.message.clone()).unwrap_or_default();
    return Err(Error::RootRejected { doc_name: doc_name.to_owned(), message });
  };
  report.root_row = Some(root_row);

  info!(
    doc_name,
    doc_id,
    rows = report.rows_inserted,
    tables_created = report.tables_created.len(),
    columns_added = report.columns_added.len(),
    issues = report.issue_count(),
    "document ingested"
  );
  Ok(report)
}
