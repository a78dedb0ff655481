//! Schema inference: walks JSON documents and accumulates the table/column
//! layout needed to store them.
//!
//! A [`SchemaMap`] is an explicit value owned by the caller. Inferring several
//! documents into the same map merges their layouts before anything is
//! materialized; nothing is cached between ingestions.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::{
  Error, Result,
  ident::{PARENT_KEY, child_table, fold},
  shape::{FieldShape, fields, kind_name},
  sql_type::{ColumnTypePolicy, SqlType, TypeConflict},
};

// ─── ColumnDef ───────────────────────────────────────────────────────────────

/// A data column of an inferred table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
  pub name:       String,
  pub sql_type:   SqlType,
  /// Table whose surrogate key this column references.
  pub references: Option<String>,
}

impl ColumnDef {
  pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
    Self { name: name.into(), sql_type, references: None }
  }

  pub fn referencing(mut self, table: impl Into<String>) -> Self {
    self.references = Some(table.into());
    self
  }
}

#[derive(Debug, Clone)]
struct Slot {
  name:       String,
  /// `None` while only nulls have been seen.
  sql_type:   Option<SqlType>,
  references: Option<String>,
}

// ─── TableLayout ─────────────────────────────────────────────────────────────

/// Inferred shape of one table.
///
/// Holds data columns only; the surrogate key and `doc_id` are implied for
/// every table and added by the materializer. Columns are keyed
/// case-insensitively and iterate in lexicographic order.
#[derive(Debug, Clone)]
pub struct TableLayout {
  name:    String,
  columns: BTreeMap<String, Slot>,
}

impl TableLayout {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), columns: BTreeMap::new() }
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn len(&self) -> usize { self.columns.len() }

  pub fn is_empty(&self) -> bool { self.columns.is_empty() }

  /// Data columns in lexicographic order. Columns only ever seen as `null`
  /// resolve to `TEXT`.
  pub fn columns(&self) -> impl Iterator<Item = ColumnDef> + '_ {
    self.columns.values().map(Slot::to_def)
  }

  pub fn column(&self, name: &str) -> Option<ColumnDef> {
    self.columns.get(&fold(name)).map(Slot::to_def)
  }

  /// Add or update a column; returns a conflict if the observed type does not
  /// fit the one already recorded. Narrower observations (an integer in a
  /// `REAL` column) fit and are not conflicts.
  pub fn observe(
    &mut self,
    column: &str,
    observed: Option<SqlType>,
    references: Option<&str>,
    policy: ColumnTypePolicy,
  ) -> Option<TypeConflict> {
    let slot = self.columns.entry(fold(column)).or_insert_with(|| {
      trace!(table = %self.name, column, "new column");
      Slot { name: column.to_owned(), sql_type: None, references: None }
    });

    if slot.references.is_none() {
      slot.references = references.map(str::to_owned);
    }

    match (slot.sql_type, observed) {
      (_, None) => None,
      (None, Some(t)) => {
        slot.sql_type = Some(t);
        None
      }
      (Some(current), Some(observed)) if observed > current => {
        let resolved = policy.resolve(current, observed);
        slot.sql_type = Some(resolved);
        Some(TypeConflict {
          table: self.name.clone(),
          column: slot.name.clone(),
          current,
          observed,
          resolved,
        })
      }
      _ => None,
    }
  }
}

impl Slot {
  fn to_def(&self) -> ColumnDef {
    ColumnDef {
      name:       self.name.clone(),
      sql_type:   self.sql_type.unwrap_or(SqlType::Text),
      references: self.references.clone(),
    }
  }
}

// ─── SchemaMap ───────────────────────────────────────────────────────────────

/// Table name → inferred layout, accumulated over one or more documents.
#[derive(Debug, Clone, Default)]
pub struct SchemaMap {
  tables:    BTreeMap<String, TableLayout>,
  conflicts: Vec<TypeConflict>,
}

impl SchemaMap {
  pub fn new() -> Self { Self::default() }

  /// Infer the layout of a whole document rooted at `table`.
  pub fn infer_document(
    &mut self,
    table: &str,
    document: &Value,
    policy: ColumnTypePolicy,
  ) -> Result<()> {
    let object = root_object(document)?;
    self.infer(table, object, policy);
    Ok(())
  }

  /// Walk `object` and merge its layout into the map under `table`.
  pub fn infer(
    &mut self,
    table: &str,
    object: &Map<String, Value>,
    policy: ColumnTypePolicy,
  ) {
    self.infer_object(table, object, None, policy);
    debug!(table, tables = self.tables.len(), "schema inferred");
  }

  fn infer_object(
    &mut self,
    table: &str,
    object: &Map<String, Value>,
    parent: Option<&str>,
    policy: ColumnTypePolicy,
  ) {
    self.layout_mut(table);
    if let Some(parent) = parent {
      self.observe(table, PARENT_KEY, Some(SqlType::Integer), Some(parent), policy);
    }

    for field in fields(object) {
      match (field.shape, field.column) {
        (FieldShape::Scalar(v), Some(column)) => {
          self.observe(table, &column, SqlType::of_scalar(v), None, policy);
        }
        (FieldShape::ScalarList(_), Some(column)) => {
          self.observe(table, &column, Some(SqlType::Text), None, policy);
        }
        (FieldShape::Object(child), Some(column)) => {
          let sub_table = child_table(table, field.key);
          self.infer_object(&sub_table, child, None, policy);
          self.observe(table, &column, Some(SqlType::Integer), Some(&sub_table), policy);
        }
        (FieldShape::Rows(items), _) => {
          let sub_table = child_table(table, field.key);
          for item in &items {
            self.infer_object(&sub_table, item, Some(table), policy);
          }
        }
        // Only rows go without a column.
        (_, None) => {}
      }
    }
  }

  fn layout_mut(&mut self, table: &str) -> &mut TableLayout {
    self
      .tables
      .entry(table.to_owned())
      .or_insert_with(|| TableLayout::new(table))
  }

  fn observe(
    &mut self,
    table: &str,
    column: &str,
    observed: Option<SqlType>,
    references: Option<&str>,
    policy: ColumnTypePolicy,
  ) {
    let conflict = self
      .layout_mut(table)
      .observe(column, observed, references, policy);
    if let Some(conflict) = conflict {
      let seen = self.conflicts.iter().any(|c| {
        c.table == conflict.table
          && c.column == conflict.column
          && c.observed == conflict.observed
      });
      if !seen {
        debug!(
          table = %conflict.table,
          column = %conflict.column,
          current = %conflict.current,
          observed = %conflict.observed,
          resolved = %conflict.resolved,
          "column type conflict"
        );
        self.conflicts.push(conflict);
      }
    }
  }

  /// Layouts in lexicographic table order; a parent always precedes the
  /// tables derived from it.
  pub fn tables(&self) -> impl Iterator<Item = &TableLayout> { self.tables.values() }

  pub fn table(&self, name: &str) -> Option<&TableLayout> { self.tables.get(name) }

  pub fn column_type(&self, table: &str, column: &str) -> Option<SqlType> {
    self.table(table)?.column(column).map(|c| c.sql_type)
  }

  pub fn conflicts(&self) -> &[TypeConflict] { &self.conflicts }

  pub fn len(&self) -> usize { self.tables.len() }

  pub fn is_empty(&self) -> bool { self.tables.is_empty() }
}

/// The root object of a document, or [`Error::NotAnObject`].
pub fn root_object(document: &Value) -> Result<&Map<String, Value>> {
  document
    .as_object()
    .ok_or(Error::NotAnObject { found: kind_name(document) })
}
