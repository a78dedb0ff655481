//! Conversions between engine values and the representations bound to or
//! read from SQLite.

use formbase_core::{document::Document, shape::Cell};
use rusqlite::types::Value as SqlValue;

pub fn encode_cell(cell: Cell) -> SqlValue {
  match cell {
    Cell::Null => SqlValue::Null,
    Cell::Integer(i) => SqlValue::Integer(i),
    Cell::Real(f) => SqlValue::Real(f),
    Cell::Text(s) => SqlValue::Text(s),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `doc_info` row.
pub struct RawDocument {
  pub doc_id:   i64,
  pub doc_name: String,
}

impl RawDocument {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { doc_id: row.get(0)?, doc_name: row.get(1)? })
  }

  pub fn into_document(self) -> Document {
    Document { doc_id: self.doc_id, doc_name: self.doc_name }
  }
}
