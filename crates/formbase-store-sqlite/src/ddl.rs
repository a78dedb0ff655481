//! SQL text generation for derived tables.
//!
//! Every identifier is quoted; JSON keys reach this module unchanged and may
//! contain spaces, punctuation or quotes.

use formbase_core::{
  ColumnDef, TableLayout,
  ident::{DOC_ID, DOCUMENT_TABLE, PRIMARY_KEY, quote},
};

fn column_clause(column: &ColumnDef) -> String {
  let mut clause = format!("{} {}", quote(&column.name), column.sql_type.as_sql());
  if let Some(target) = &column.references {
    clause.push_str(&format!(" REFERENCES {}({})", quote(target), quote(PRIMARY_KEY)));
  }
  clause
}

/// `CREATE TABLE IF NOT EXISTS` with the surrogate key, the document foreign
/// key and every inferred column.
pub fn create_table(layout: &TableLayout) -> String {
  let mut clauses = vec![
    format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(PRIMARY_KEY)),
    format!(
      "{} INTEGER NOT NULL REFERENCES {}({})",
      quote(DOC_ID),
      quote(DOCUMENT_TABLE),
      quote(DOC_ID)
    ),
  ];
  clauses.extend(layout.columns().map(|c| column_clause(&c)));
  format!(
    "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
    quote(layout.name()),
    clauses.join(",\n    ")
  )
}

pub fn add_column(table: &str, column: &ColumnDef) -> String {
  format!("ALTER TABLE {} ADD COLUMN {}", quote(table), column_clause(column))
}

/// Positional insert of `columns`, bound as `?1 .. ?n`.
pub fn insert(table: &str, columns: &[&str]) -> String {
  let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
  let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    quote(table),
    names.join(", "),
    params.join(", ")
  )
}
