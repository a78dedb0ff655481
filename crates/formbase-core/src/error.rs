//! Error types for `formbase-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Documents are stored starting from a JSON object; anything else has no
  /// column names to offer.
  #[error("document root must be a JSON object, found {found}")]
  NotAnObject { found: &'static str },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
