//! Registered source documents.

use serde::{Deserialize, Serialize};

/// One ingested source file, identified by its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub doc_id:   i64,
  pub doc_name: String,
}
