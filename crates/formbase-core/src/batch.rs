//! Batch ingestion over any [`DocumentSink`].
//!
//! A fatal error for one document is recorded and the batch moves on to the
//! next document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
  report::{IngestReport, IngestStatus},
  sink::DocumentSink,
};

/// Whether documents whose name is already registered are appended to or
/// replace their previous rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
  #[default]
  Append,
  Replace,
}

/// What happened to one document of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DocumentOutcome {
  Complete { report: IngestReport },
  Partial { report: IngestReport },
  Failed { doc_name: String, reason: String },
}

impl DocumentOutcome {
  pub fn from_report(report: IngestReport) -> Self {
    match report.status() {
      IngestStatus::Complete => DocumentOutcome::Complete { report },
      IngestStatus::Partial { .. } => DocumentOutcome::Partial { report },
    }
  }

  pub fn failed(doc_name: impl Into<String>, reason: impl ToString) -> Self {
    DocumentOutcome::Failed { doc_name: doc_name.into(), reason: reason.to_string() }
  }

  pub fn doc_name(&self) -> &str {
    match self {
      DocumentOutcome::Complete { report } | DocumentOutcome::Partial { report } => {
        &report.doc_name
      }
      DocumentOutcome::Failed { doc_name, .. } => doc_name,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
  pub outcomes: Vec<DocumentOutcome>,
}

impl BatchSummary {
  pub fn push(&mut self, outcome: DocumentOutcome) { self.outcomes.push(outcome); }

  pub fn complete(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| matches!(o, DocumentOutcome::Complete { .. }))
      .count()
  }

  pub fn partial(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| matches!(o, DocumentOutcome::Partial { .. }))
      .count()
  }

  pub fn failed(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| matches!(o, DocumentOutcome::Failed { .. }))
      .count()
  }

  pub fn has_failures(&self) -> bool { self.failed() > 0 }
}

/// Ingest a single document, turning a fatal error into a `Failed` outcome.
pub async fn ingest_document<S: DocumentSink>(
  sink: &S,
  doc_name: String,
  document: Value,
  mode: BatchMode,
) -> DocumentOutcome {
  let result = match mode {
    BatchMode::Append => sink.ingest(doc_name.clone(), document).await,
    BatchMode::Replace => sink.replace(doc_name.clone(), document).await,
  };

  match result {
    Ok(report) => {
      info!(
        doc_name = %report.doc_name,
        doc_id = report.doc_id,
        rows = report.rows_inserted,
        issues = report.issue_count(),
        "document ingested"
      );
      DocumentOutcome::from_report(report)
    }
    Err(e) => {
      warn!(doc_name = %doc_name, error = %e, "document failed");
      DocumentOutcome::failed(doc_name, e)
    }
  }
}

/// Ingest `(doc_name, document)` pairs in order.
pub async fn ingest_batch<S, I>(sink: &S, documents: I, mode: BatchMode) -> BatchSummary
where
  S: DocumentSink,
  I: IntoIterator<Item = (String, Value)>,
{
  let mut summary = BatchSummary::default();
  for (doc_name, document) in documents {
    summary.push(ingest_document(sink, doc_name, document, mode).await);
  }
  info!(
    complete = summary.complete(),
    partial = summary.partial(),
    failed = summary.failed(),
    "batch finished"
  );
  summary
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use serde_json::json;

  use super::*;
  use crate::{
    document::Document,
    report::{DeletionReport, InsertError},
  };

  #[derive(Debug, thiserror::Error)]
  #[error("rejected {0}")]
  struct Rejected(String);

  /// Accepts objects, rejects everything else, and reports a skipped branch
  /// for documents carrying a `"broken"` key.
  #[derive(Default)]
  struct FakeSink {
    names: Mutex<Vec<String>>,
  }

  impl FakeSink {
    fn id_for(&self, doc_name: &str) -> i64 {
      let mut names = self.names.lock().unwrap();
      match names.iter().position(|n| n == doc_name) {
        Some(i) => i as i64 + 1,
        None => {
          names.push(doc_name.to_owned());
          names.len() as i64
        }
      }
    }
  }

  impl DocumentSink for FakeSink {
    type Error = Rejected;

    async fn resolve_document_id(&self, doc_name: String) -> Result<i64, Rejected> {
      Ok(self.id_for(&doc_name))
    }

    async fn ingest(&self, doc_name: String, document: Value) -> Result<IngestReport, Rejected> {
      if !document.is_object() {
        return Err(Rejected(doc_name));
      }
      let mut report = IngestReport::new(doc_name.clone(), self.id_for(&doc_name));
      if document.get("broken").is_some() {
        report.skipped.push(InsertError {
          table:          "main_table_broken".into(),
          path:           "$.broken".into(),
          message:        "constraint failed".into(),
          discarded_rows: 0,
          orphaned_items: 0,
        });
      }
      Ok(report)
    }

    async fn replace(&self, doc_name: String, document: Value) -> Result<IngestReport, Rejected> {
      self.ingest(doc_name, document).await
    }

    async fn delete_document(&self, _doc_name: String) -> Result<Option<DeletionReport>, Rejected> {
      Ok(None)
    }

    async fn list_documents(&self) -> Result<Vec<Document>, Rejected> {
      Ok(vec![])
    }
  }

  #[tokio::test]
  async fn batch_classifies_documents() {
    let sink = FakeSink::default();
    let summary = ingest_batch(
      &sink,
      vec![
        ("ok.json".to_owned(), json!({ "a": 1 })),
        ("partial.json".to_owned(), json!({ "broken": {} })),
        ("bad.json".to_owned(), json!([1, 2])),
        ("ok2.json".to_owned(), json!({ "a": 2 })),
      ],
      BatchMode::Append,
    )
    .await;

    assert_eq!(summary.complete(), 2);
    assert_eq!(summary.partial(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(summary.has_failures());

    let names: Vec<_> = summary.outcomes.iter().map(DocumentOutcome::doc_name).collect();
    assert_eq!(names, ["ok.json", "partial.json", "bad.json", "ok2.json"]);
    assert!(matches!(
      &summary.outcomes[2],
      DocumentOutcome::Failed { reason, .. } if reason == "rejected bad.json"
    ));
  }

  #[test]
  fn summary_serializes_with_outcome_tag() {
    let mut summary = BatchSummary::default();
    summary.push(DocumentOutcome::failed("x.json", "unreadable"));
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["outcomes"][0]["outcome"], "failed");
    assert_eq!(json["outcomes"][0]["reason"], "unreadable");
  }
}
