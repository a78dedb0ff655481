//! Fixed DDL for the SQLite store.
//!
//! Only the document registry is static; every data table is derived from the
//! documents themselves (see [`crate::materialize`]).

/// Connection setup and registry DDL; idempotent thanks to
/// `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per source document. Rows are never updated; deletion is an
-- explicit maintenance operation.
CREATE TABLE IF NOT EXISTS doc_info (
    doc_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_name TEXT NOT NULL UNIQUE
);
";
