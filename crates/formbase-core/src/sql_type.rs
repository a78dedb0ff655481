//! Column types and the policy that settles conflicting observations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── SqlType ─────────────────────────────────────────────────────────────────

/// Declared type of a materialized column.
///
/// Variants are ordered from narrowest to widest; widening a column moves it
/// to the right and never back.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
  Integer,
  Real,
  Text,
}

impl SqlType {
  pub fn as_sql(self) -> &'static str {
    match self {
      SqlType::Integer => "INTEGER",
      SqlType::Real => "REAL",
      SqlType::Text => "TEXT",
    }
  }

  /// The type a scalar JSON value asks for.
  ///
  /// Whole numbers that fit in an `i64` are `INTEGER`, every other number is
  /// `REAL`, and strings, booleans and anything else are `TEXT`. `null`
  /// carries no type information and yields `None`.
  pub fn of_scalar(value: &Value) -> Option<Self> {
    match value {
      Value::Null => None,
      Value::Number(n) if n.is_i64() => Some(SqlType::Integer),
      Value::Number(_) => Some(SqlType::Real),
      _ => Some(SqlType::Text),
    }
  }

  /// Smallest type able to hold values of both `self` and `other`.
  pub fn widen(self, other: Self) -> Self { self.max(other) }
}

impl std::fmt::Display for SqlType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_sql())
  }
}

// ─── ColumnTypePolicy ────────────────────────────────────────────────────────

/// How a column's type is decided when the same key is observed with
/// different scalar types during one inference pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTypePolicy {
  /// Widen along `INTEGER → REAL → TEXT`.
  #[default]
  Widen,
  /// Keep the first non-null type observed; later values are stored as-is
  /// under that declared type.
  FirstSeen,
}

impl ColumnTypePolicy {
  pub fn resolve(self, current: SqlType, observed: SqlType) -> SqlType {
    match self {
      ColumnTypePolicy::Widen => current.widen(observed),
      ColumnTypePolicy::FirstSeen => current,
    }
  }
}

/// A key observed with two different types within one inference pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConflict {
  pub table:    String,
  pub column:   String,
  pub current:  SqlType,
  pub observed: SqlType,
  pub resolved: SqlType,
}
