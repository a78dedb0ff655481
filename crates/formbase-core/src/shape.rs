//! Classification of JSON field values into the shapes the engine stores.
//!
//! | JSON value                     | Shape          | Stored as                    |
//! |--------------------------------|----------------|------------------------------|
//! | string, number, bool, null     | `Scalar`       | column on the current table  |
//! | object                         | `Object`       | child table + `{key}_id`     |
//! | list holding any object        | `Rows`         | child table rows, `parent_pk`|
//! | non-empty list without objects | `ScalarList`   | `TEXT` column, JSON-encoded  |
//! | empty list                     | `Rows` (empty) | nothing                      |
//!
//! In a list mixing objects and other values, each non-object item becomes a
//! row of the child table with its value under the `value` column.
//!
//! Every field that lands in a column of its object's table gets a column of
//! its own (see [`fields`]), so no two keys of one object ever write to the
//! same column.

use std::{borrow::Cow, collections::HashSet};

use serde_json::{Map, Value};

use crate::ident::{DOC_ID, PARENT_KEY, PRIMARY_KEY, column_for_key, fold, foreign_key_column};

/// Column used for non-object items of a mixed list.
pub const WRAPPED_VALUE: &str = "value";

pub enum FieldShape<'a> {
  Scalar(&'a Value),
  Object(&'a Map<String, Value>),
  Rows(Vec<Cow<'a, Map<String, Value>>>),
  ScalarList(&'a [Value]),
}

pub fn classify(value: &Value) -> FieldShape<'_> {
  match value {
    Value::Object(map) => FieldShape::Object(map),
    Value::Array(items) if items.is_empty() => FieldShape::Rows(Vec::new()),
    Value::Array(items) if !items.iter().any(Value::is_object) => {
      FieldShape::ScalarList(items)
    }
    Value::Array(items) => FieldShape::Rows(
      items
        .iter()
        .map(|item| match item {
          Value::Object(map) => Cow::Borrowed(map),
          other => {
            let mut wrapped = Map::new();
            wrapped.insert(WRAPPED_VALUE.to_owned(), other.clone());
            Cow::Owned(wrapped)
          }
        })
        .collect(),
    ),
    scalar => FieldShape::Scalar(scalar),
  }
}

/// JSON name of a value's kind, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// One key of an object, classified and assigned its column.
pub struct Field<'a> {
  pub key:     &'a str,
  pub shape:   FieldShape<'a>,
  /// Column on the object's own table: the value for scalars and scalar
  /// lists, the child's row id for objects. `None` for rows.
  pub column:  Option<String>,
  /// The natural column name was already taken by another key of the same
  /// object and `column` carries a numeric suffix.
  pub renamed: bool,
}

/// Classify every key of `object` and assign each a distinct column.
///
/// Scalars and scalar lists claim their names first, in key order; links to
/// object children (`{key}_id`) come after them. A name already claimed,
/// compared case-insensitively, gets the first free `_1`, `_2`, ... suffix.
/// The assignment depends only on the object, so inference and loading
/// always agree.
pub fn fields(object: &Map<String, Value>) -> Vec<Field<'_>> {
  let mut claimed: HashSet<String> =
    [PRIMARY_KEY, DOC_ID, PARENT_KEY].into_iter().map(fold).collect();

  let shapes: Vec<(&str, FieldShape<'_>)> =
    object.iter().map(|(key, value)| (key.as_str(), classify(value))).collect();

  let mut columns: Vec<Option<(String, bool)>> = vec![None; shapes.len()];
  for (slot, (key, shape)) in columns.iter_mut().zip(&shapes) {
    if matches!(shape, FieldShape::Scalar(_) | FieldShape::ScalarList(_)) {
      *slot = Some(claim(&mut claimed, &column_for_key(key)));
    }
  }
  for (slot, (key, shape)) in columns.iter_mut().zip(&shapes) {
    if matches!(shape, FieldShape::Object(_)) {
      *slot = Some(claim(&mut claimed, &foreign_key_column(key)));
    }
  }

  shapes
    .into_iter()
    .zip(columns)
    .map(|((key, shape), column)| {
      let renamed = column.as_ref().is_some_and(|(_, renamed)| *renamed);
      Field { key, shape, column: column.map(|(name, _)| name), renamed }
    })
    .collect()
}

fn claim(claimed: &mut HashSet<String>, natural: &str) -> (String, bool) {
  if claimed.insert(fold(natural)) {
    return (natural.to_owned(), false);
  }
  let mut n = 1;
  loop {
    let candidate = format!("{natural}_{n}");
    if claimed.insert(fold(&candidate)) {
      return (candidate, true);
    }
    n += 1;
  }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single value ready to be bound into an insert, independent of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
}

impl Cell {
  /// Encode a JSON value for storage.
  ///
  /// Booleans become `"true"`/`"false"`; lists and objects that reach a
  /// column are stored as compact JSON text.
  pub fn from_json(value: &Value) -> Self {
    match value {
      Value::Null => Cell::Null,
      Value::Bool(b) => Cell::Text(b.to_string()),
      Value::Number(n) => match n.as_i64() {
        Some(i) => Cell::Integer(i),
        None => n.as_f64().map_or_else(|| Cell::Text(n.to_string()), Cell::Real),
      },
      Value::String(s) => Cell::Text(s.clone()),
      Value::Array(_) | Value::Object(_) => Cell::Text(value.to_string()),
    }
  }

  /// Encode a list without objects as a single text cell.
  pub fn from_list(items: &[Value]) -> Self {
    Cell::Text(Value::Array(items.to_vec()).to_string())
  }

  pub fn from_row_id(id: Option<i64>) -> Self {
    id.map_or(Cell::Null, Cell::Integer)
  }
}
