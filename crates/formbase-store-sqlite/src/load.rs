//! Recursive loader: inserts a document tree table by table.
//!
//! Single-object children are inserted before their parent so the parent row
//! can hold `{key}_id`; list items are inserted after it and carry
//! `parent_pk`. Every row carries the document's `doc_id`.
//!
//! Each branch runs inside a savepoint. When a row cannot be inserted the
//! savepoint is rolled back, discarding the children already written for it,
//! and the failure is recorded; sibling branches are unaffected.

use formbase_core::{
  ColumnDef, SchemaMap, SqlType, TableLayout,
  ident::{DOC_ID, PARENT_KEY, child_table, fold},
  report::{IngestReport, InsertError, RenamedColumn},
  shape::{Cell, FieldShape, fields},
};
use rusqlite::Connection;
use serde_json::{Map, Value};
use tracing::{info, trace, warn};

use crate::{
  Result, ddl,
  encode::encode_cell,
  materialize::{self, ColumnCache, Migration},
};

struct Pending {
  column: ColumnDef,
  cell:   Cell,
}

/// Inserts documents into tables reconciled from `schema`.
pub struct Loader<'a> {
  conn:   &'a Connection,
  doc_id: i64,
  schema: &'a SchemaMap,
  live:   ColumnCache,
  report: &'a mut IngestReport,
}

impl<'a> Loader<'a> {
  pub fn new(
    conn: &'a Connection,
    doc_id: i64,
    schema: &'a SchemaMap,
    report: &'a mut IngestReport,
  ) -> Self {
    Self { conn, doc_id, schema, live: ColumnCache::default(), report }
  }

  /// Insert `object` and everything below it into `table`.
  ///
  /// Returns the new row id, or `None` if this row's insert failed (the
  /// failure is in the report). `Err` is reserved for store failures that
  /// make further inserts meaningless.
  pub fn insert(&mut self, table: &str, object: &Map<String, Value>) -> Result<Option<i64>> {
    self.insert_branch(table, object, None, "$")
  }

  fn insert_branch(
    &mut self,
    table: &str,
    object: &Map<String, Value>,
    parent: Option<(&str, i64)>,
    path: &str,
  ) -> Result<Option<i64>> {
    self.conn.execute_batch("SAVEPOINT branch")?;
    let rows_before = self.report.rows_inserted;
    let added_before = self.report.columns_added.len();
    let created_before = self.report.tables_created.len();

    let mut pending: Vec<Pending> = Vec::new();
    if let Some((parent_table, parent_pk)) = parent {
      pending.push(Pending {
        column: ColumnDef::new(PARENT_KEY, SqlType::Integer).referencing(parent_table),
        cell:   Cell::Integer(parent_pk),
      });
    }

    let mut deferred = Vec::new();
    for field in fields(object) {
      if field.renamed
        && let Some(column) = &field.column
      {
        self.note_rename(table, field.key, column);
      }

      match (field.shape, field.column) {
        (FieldShape::Scalar(v), Some(name)) => {
          let sql_type = self
            .schema
            .column_type(table, &name)
            .or_else(|| SqlType::of_scalar(v))
            .unwrap_or(SqlType::Text);
          pending.push(Pending { column: ColumnDef::new(name, sql_type), cell: Cell::from_json(v) });
        }
        (FieldShape::ScalarList(items), Some(name)) => {
          pending.push(Pending {
            column: ColumnDef::new(name, SqlType::Text),
            cell:   Cell::from_list(items),
          });
        }
        (FieldShape::Object(child), Some(name)) => {
          let sub_table = child_table(table, field.key);
          let child_id =
            self.insert_branch(&sub_table, child, None, &child_path(path, field.key))?;
          pending.push(Pending {
            column: ColumnDef::new(name, SqlType::Integer).referencing(sub_table),
            cell:   Cell::from_row_id(child_id),
          });
        }
        (FieldShape::Rows(items), _) => {
          if !items.is_empty() {
            deferred.push((field.key, child_table(table, field.key), items));
          }
        }
        (_, None) => {}
      }
    }

    self.heal_columns(table, &mut pending)?;

    let mut columns: Vec<&str> = vec![DOC_ID];
    let mut values = vec![rusqlite::types::Value::Integer(self.doc_id)];
    for p in &pending {
      columns.push(&p.column.name);
      values.push(encode_cell(p.cell.clone()));
    }

    let inserted = self
      .conn
      .execute(&ddl::insert(table, &columns), rusqlite::params_from_iter(values));

    let row_id = match inserted {
      Ok(_) => self.conn.last_insert_rowid(),
      Err(e) => {
        self.conn.execute_batch("ROLLBACK TO branch; RELEASE branch")?;
        // DDL inside the savepoint was undone as well.
        self.live.clear();
        self.report.columns_added.truncate(added_before);
        self.report.tables_created.truncate(created_before);

        let discarded_rows = self.report.rows_inserted - rows_before;
        self.report.rows_inserted = rows_before;
        let orphaned_items = deferred.iter().map(|(_, _, items)| items.len()).sum();

        warn!(table, path, error = %e, discarded_rows, orphaned_items, "insert failed, branch skipped");
        self.report.skipped.push(InsertError {
          table: table.to_owned(),
          path: path.to_owned(),
          message: e.to_string(),
          discarded_rows,
          orphaned_items,
        });
        return Ok(None);
      }
    };
    self.report.rows_inserted += 1;
    trace!(table, path, row_id, "row inserted");

    for (key, sub_table, items) in deferred {
      for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{i}]", child_path(path, key));
        self.insert_branch(&sub_table, item, Some((table, row_id)), &item_path)?;
      }
    }

    self.conn.execute_batch("RELEASE branch")?;
    Ok(Some(row_id))
  }

  /// Make sure every pending column exists, creating the table or adding
  /// columns as needed. Columns that cannot be added are dropped from
  /// `pending` (their warning is already in the report).
  fn heal_columns(&mut self, table: &str, pending: &mut Vec<Pending>) -> Result<()> {
    let Some(live) = self.live.columns(self.conn, table)? else {
      let mut layout = TableLayout::new(table);
      for p in pending.iter() {
        let c = &p.column;
        layout.observe(&c.name, Some(c.sql_type), c.references.as_deref(), Default::default());
      }
      materialize::ensure_table(self.conn, &layout)?.record(self.report);
      return Ok(());
    };

    if pending.iter().all(|p| live.contains(&fold(&p.column.name))) {
      return Ok(());
    }

    let mut migration = Migration { table: table.to_owned(), ..Migration::default() };
    let wanted = pending.iter().map(|p| p.column.clone());
    materialize::add_missing_columns(self.conn, table, live, wanted, &mut migration);
    pending.retain(|p| live.contains(&fold(&p.column.name)));
    migration.record(self.report);
    Ok(())
  }

  fn note_rename(&mut self, table: &str, key: &str, column: &str) {
    let seen = self.report.renamed.iter().any(|r| r.table == table && r.key == key);
    if !seen {
      info!(table, key, column, "key stored under a suffixed column");
      self.report.renamed.push(RenamedColumn {
        table:  table.to_owned(),
        key:    key.to_owned(),
        column: column.to_owned(),
      });
    }
  }
}

/// `path` extended by `key`: `$.b` for plain keys, `$["Batch No."]` for keys
/// that would make the path ambiguous.
fn child_path(path: &str, key: &str) -> String {
  let plain = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
  if plain {
    format!("{path}.{key}")
  } else {
    format!("{path}[{}]", Value::from(key))
  }
}

#[cfg(test)]
mod tests {
  use super::child_path;

  #[test]
  fn awkward_keys_are_bracketed() {
    assert_eq!(child_path("$", "items"), "$.items");
    assert_eq!(child_path("$.a", "Batch No."), "$.a[\"Batch No.\"]");
    assert_eq!(child_path("$", "x[0]"), "$[\"x[0]\"]");
    assert_eq!(child_path("$", "say \"hi\""), "$[\"say \\\"hi\\\"\"]");
    assert_eq!(child_path("$", ""), "$[\"\"]");
  }
}
