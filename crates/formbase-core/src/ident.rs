//! Naming rules for generated tables and columns.
//!
//! Table names are derived from the key path (`{parent}_{key}`); column names
//! are the JSON keys themselves, except where a key would collide with a
//! column the engine manages.

use std::borrow::Cow;

/// Registry table mapping document names to ids.
pub const DOCUMENT_TABLE: &str = "doc_info";
/// Default table for the root object of every document.
pub const ROOT_TABLE: &str = "main_table";

/// Surrogate key present on every data table.
pub const PRIMARY_KEY: &str = "pk";
/// Owning document, present on every data table.
pub const DOC_ID: &str = "doc_id";
/// Link from a list item's row to the row that owns the list.
pub const PARENT_KEY: &str = "parent_pk";

const RESERVED: [&str; 3] = [PRIMARY_KEY, DOC_ID, PARENT_KEY];
const UNNAMED: &str = "unnamed_field";

fn stem(key: &str) -> &str { if key.is_empty() { UNNAMED } else { key } }

/// Column storing the scalar under `key`.
///
/// Keys equal to an engine column are suffixed with `_field`; the empty key
/// becomes `unnamed_field`.
pub fn column_for_key(key: &str) -> Cow<'_, str> {
  if key.is_empty() {
    Cow::Borrowed(UNNAMED)
  } else if RESERVED.iter().any(|r| same_identifier(r, key)) {
    Cow::Owned(format!("{key}_field"))
  } else {
    Cow::Borrowed(key)
  }
}

/// Column on the parent row holding the id of a single-object child.
pub fn foreign_key_column(key: &str) -> String { format!("{}_id", stem(key)) }

/// Table holding the objects found under `key` in `parent`.
pub fn child_table(parent: &str, key: &str) -> String {
  format!("{parent}_{}", stem(key))
}

/// Quote an identifier for interpolation into SQL.
pub fn quote(ident: &str) -> String {
  format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Identifier equality as SQLite sees it (ASCII case-insensitive).
pub fn same_identifier(a: &str, b: &str) -> bool { a.eq_ignore_ascii_case(b) }

/// Normalised form used as a map key for case-insensitive lookups.
pub fn fold(ident: &str) -> String { ident.to_ascii_lowercase() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reserved_keys_are_renamed() {
    assert_eq!(column_for_key("doc_id"), "doc_id_field");
    assert_eq!(column_for_key("PK"), "PK_field");
    assert_eq!(column_for_key("parent_pk"), "parent_pk_field");
    assert_eq!(column_for_key("batch_no"), "batch_no");
    assert_eq!(column_for_key(""), "unnamed_field");
  }

  #[test]
  fn derived_names() {
    assert_eq!(child_table("main_table", "b"), "main_table_b");
    assert_eq!(child_table("main_table", ""), "main_table_unnamed_field");
    assert_eq!(foreign_key_column("b"), "b_id");
  }

  #[test]
  fn quoting_escapes_embedded_quotes() {
    assert_eq!(quote("plain"), "\"plain\"");
    assert_eq!(quote("Batch No."), "\"Batch No.\"");
    assert_eq!(quote("a\"b"), "\"a\"\"b\"");
  }
}
