//! Schema materializer: reconciles inferred layouts with the live database.
//!
//! Tables are created when absent and gain the columns they are missing.
//! Existing columns are never altered or dropped, so running the same
//! reconciliation twice executes no DDL the second time.

use std::collections::{HashMap, HashSet};

use formbase_core::{
  ColumnDef, SqlType, TableLayout,
  ident::{DOC_ID, DOCUMENT_TABLE, fold},
  report::{AddedColumn, IngestReport, SchemaMigrationWarning},
};
use rusqlite::{Connection, OptionalExtension as _};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Error, Result, ddl};

// ─── Reflection ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveColumn {
  pub name:          String,
  pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveTable {
  pub name:    String,
  pub columns: Vec<LiveColumn>,
}

/// True if `table` names a table or view, compared case-insensitively.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
        rusqlite::params![table],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Columns of `table` in declaration order; empty if the table is absent.
pub fn live_columns(conn: &Connection, table: &str) -> Result<Vec<LiveColumn>> {
  let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
  let columns = stmt
    .query_map(rusqlite::params![table], |row| {
      Ok(LiveColumn { name: row.get(0)?, declared_type: row.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(columns)
}

/// Every table except the registry and SQLite's internal tables.
pub fn data_tables(conn: &Connection) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT name FROM sqlite_master
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' AND name <> ?1
     ORDER BY name",
  )?;
  let tables = stmt
    .query_map(rusqlite::params![DOCUMENT_TABLE], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(tables)
}

/// The live layout of every data table.
pub fn reflect_schema(conn: &Connection) -> Result<Vec<LiveTable>> {
  data_tables(conn)?
    .into_iter()
    .map(|name| {
      let columns = live_columns(conn, &name)?;
      Ok(LiveTable { name, columns })
    })
    .collect()
}

// ─── Migration ───────────────────────────────────────────────────────────────

/// What [`ensure_table`] changed.
#[derive(Debug, Clone, Default)]
pub struct Migration {
  pub table:    String,
  pub created:  bool,
  pub added:    Vec<ColumnDef>,
  pub warnings: Vec<SchemaMigrationWarning>,
}

impl Migration {
  fn new(table: &str) -> Self { Self { table: table.to_owned(), ..Self::default() } }

  /// True when nothing was executed against the database.
  pub fn is_noop(&self) -> bool {
    !self.created && self.added.is_empty() && self.warnings.is_empty()
  }

  pub fn record(self, report: &mut IngestReport) {
    if self.created {
      report.tables_created.push(self.table.clone());
    }
    report.columns_added.extend(self.added.into_iter().map(|c| AddedColumn {
      table:    self.table.clone(),
      column:   c.name,
      sql_type: c.sql_type,
    }));
    report.warnings.extend(self.warnings);
  }
}

/// Create `layout`'s table if absent, otherwise add the columns it lacks.
///
/// A table that cannot be created is fatal ([`Error::SchemaMigration`]); a
/// column that cannot be added becomes a warning and the remaining columns are
/// still attempted.
pub fn ensure_table(conn: &Connection, layout: &TableLayout) -> Result<Migration> {
  let table = layout.name();
  let mut migration = Migration::new(table);

  if !table_exists(conn, table)? {
    conn
      .execute_batch(&ddl::create_table(layout))
      .map_err(|source| Error::SchemaMigration { table: table.to_owned(), source })?;
    info!(table, columns = layout.len(), "table created");
    migration.created = true;
  }

  // Reflect even after creating: a concurrent writer may have created a
  // narrower table first.
  let mut live: HashSet<String> = live_columns(conn, table)?
    .into_iter()
    .map(|c| fold(&c.name))
    .collect();
  let wanted = std::iter::once(ColumnDef::new(DOC_ID, SqlType::Integer)).chain(layout.columns());
  add_missing_columns(conn, table, &mut live, wanted, &mut migration);

  if migration.is_noop() {
    debug!(table, "schema up to date");
  }
  Ok(migration)
}

/// Add every column of `wanted` not already in `live`, updating `live` as
/// columns appear.
pub fn add_missing_columns<I>(
  conn: &Connection,
  table: &str,
  live: &mut HashSet<String>,
  wanted: I,
  migration: &mut Migration,
) where
  I: IntoIterator<Item = ColumnDef>,
{
  for column in wanted {
    let key = fold(&column.name);
    if live.contains(&key) {
      continue;
    }

    match conn.execute_batch(&ddl::add_column(table, &column)) {
      Ok(()) => {
        info!(table, column = %column.name, sql_type = %column.sql_type, "column added");
        live.insert(key);
        migration.added.push(column);
      }
      // Another writer added it between reflection and ALTER.
      Err(e) if e.to_string().contains("duplicate column name") => {
        live.insert(key);
      }
      Err(e) => {
        warn!(table, column = %column.name, error = %e, "could not add column");
        migration.warnings.push(SchemaMigrationWarning {
          table:   table.to_owned(),
          column:  column.name,
          message: e.to_string(),
        });
      }
    }
  }
}

// ─── Column cache ────────────────────────────────────────────────────────────

/// Live column names per table, loaded lazily for the duration of one
/// ingestion.
#[derive(Debug, Default)]
pub struct ColumnCache {
  tables: HashMap<String, HashSet<String>>,
}

impl ColumnCache {
  /// Folded column names of `table`, or `None` if the table does not exist.
  pub fn columns(&mut self, conn: &Connection, table: &str) -> Result<Option<&mut HashSet<String>>> {
    if !self.tables.contains_key(table) {
      let live = live_columns(conn, table)?;
      if live.is_empty() {
        return Ok(None);
      }
      self
        .tables
        .insert(table.to_owned(), live.into_iter().map(|c| fold(&c.name)).collect());
    }
    Ok(self.tables.get_mut(table))
  }

  /// Forget everything, e.g. after DDL was rolled back.
  pub fn clear(&mut self) { self.tables.clear(); }
}
