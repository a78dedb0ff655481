//! Document registry: stable ids for document names, plus the maintenance
//! operations that remove a document's rows.

use std::collections::BTreeMap;

use formbase_core::{
  document::Document,
  ident::{DOC_ID, DOCUMENT_TABLE, quote},
  report::DeletionReport,
};
use rusqlite::{Connection, OptionalExtension as _};
use tracing::{debug, info};

use crate::{Error, Result, encode::RawDocument, materialize};

/// Return the id registered for `doc_name`, registering it first if needed.
///
/// The insert is a no-op when the name already exists (including when a
/// concurrent writer registered it first), so resolving twice always yields
/// the same id and never a duplicate row.
pub fn resolve_document_id(conn: &Connection, doc_name: &str) -> Result<i64> {
  conn.execute(
    "INSERT INTO doc_info (doc_name) VALUES (?1) ON CONFLICT (doc_name) DO NOTHING",
    rusqlite::params![doc_name],
  )?;

  match find_document(conn, doc_name)? {
    Some(doc_id) => {
      debug!(doc_name, doc_id, "document id resolved");
      Ok(doc_id)
    }
    None => Err(Error::Registry { doc_name: doc_name.to_owned() }),
  }
}

pub fn find_document(conn: &Connection, doc_name: &str) -> Result<Option<i64>> {
  Ok(
    conn
      .query_row(
        "SELECT doc_id FROM doc_info WHERE doc_name = ?1",
        rusqlite::params![doc_name],
        |row| row.get(0),
      )
      .optional()?,
  )
}

pub fn list_documents(conn: &Connection) -> Result<Vec<Document>> {
  let mut stmt = conn.prepare("SELECT doc_id, doc_name FROM doc_info ORDER BY doc_id")?;
  let rows = stmt
    .query_map([], RawDocument::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows.into_iter().map(RawDocument::into_document).collect())
}

/// Delete every row tagged with `doc_id` from every table carrying a
/// `doc_id` column, leaving the registry entry in place.
///
/// Rows of one document reference each other in both directions, so foreign
/// key checks are deferred to the end of the enclosing transaction; callers
/// must run this inside one.
pub fn purge_rows(conn: &Connection, doc_id: i64) -> Result<BTreeMap<String, usize>> {
  conn.execute_batch("PRAGMA defer_foreign_keys = ON")?;

  let mut deleted = BTreeMap::new();
  for table in materialize::data_tables(conn)? {
    let tagged = materialize::live_columns(conn, &table)?
      .iter()
      .any(|c| c.name.eq_ignore_ascii_case(DOC_ID));
    if !tagged {
      continue;
    }

    let count = conn.execute(
      &format!("DELETE FROM {} WHERE {} = ?1", quote(&table), quote(DOC_ID)),
      rusqlite::params![doc_id],
    )?;
    if count > 0 {
      debug!(table = %table, doc_id, rows = count, "rows deleted");
      deleted.insert(table, count);
    }
  }
  Ok(deleted)
}

/// Remove `doc_name` and all of its rows. Returns `None` if the name is not
/// registered.
pub fn delete_document(conn: &mut Connection, doc_name: &str) -> Result<Option<DeletionReport>> {
  let tx = conn.transaction()?;

  let Some(doc_id) = find_document(&tx, doc_name)? else {
    return Ok(None);
  };

  let rows_deleted = purge_rows(&tx, doc_id)?;
  tx.execute(
    &format!("DELETE FROM {} WHERE doc_id = ?1", quote(DOCUMENT_TABLE)),
    rusqlite::params![doc_id],
  )?;
  tx.commit()?;

  let report = DeletionReport { doc_name: doc_name.to_owned(), doc_id, rows_deleted };
  info!(doc_name, doc_id, rows = report.total(), "document deleted");
  Ok(Some(report))
}

/// Drop every derived table and empty the registry, leaving a store as it
/// was when first opened. Returns the dropped tables.
pub fn clear_database(conn: &mut Connection) -> Result<Vec<String>> {
  let tx = conn.transaction()?;
  tx.execute_batch("PRAGMA defer_foreign_keys = ON")?;

  let tables = materialize::data_tables(&tx)?;
  // Rows first, so the drops never see a dangling reference.
  for table in &tables {
    tx.execute(&format!("DELETE FROM {}", quote(table)), [])?;
  }
  for table in &tables {
    tx.execute_batch(&format!("DROP TABLE {}", quote(table)))?;
  }
  let documents = tx.execute(&format!("DELETE FROM {}", quote(DOCUMENT_TABLE)), [])?;
  tx.commit()?;

  info!(tables = tables.len(), documents, "store cleared");
  Ok(tables)
}
