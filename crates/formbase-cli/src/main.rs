//! `formbase`: materialize JSON documents into SQLite tables.
//!
//! # Usage
//!
//! ```
//! formbase ingest forms/ extra.json
//! formbase --database ~/forms.db ingest --replace GP-218.json
//! formbase documents
//! formbase schema
//! formbase delete GP-218.json
//! formbase clear --yes
//! ```
//!
//! Settings come from `formbase.toml` (or `--config`) and `FORMBASE_*`
//! environment variables; `--database` overrides both.

mod input;
mod settings;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use formbase_core::{
  batch::{self, BatchMode, BatchSummary, DocumentOutcome},
  report::IngestReport,
  sink::DocumentSink,
};
use formbase_store_sqlite::SqliteStore;
use settings::{Settings, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "formbase", version, about = "Materialize JSON documents into SQLite tables")]
struct Cli {
  /// Path to a TOML config file (default: formbase.toml, if present).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// SQLite database file; overrides the configured `database_path`.
  #[arg(short, long, value_name = "PATH")]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Ingest JSON files, or every `*.json` file of a directory.
  Ingest {
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Replace the stored rows of documents that were ingested before.
    #[arg(long)]
    replace: bool,

    /// Print the batch summary as JSON.
    #[arg(long)]
    json: bool,
  },
  /// List registered documents.
  Documents,
  /// Print every derived table with its columns.
  Schema,
  /// Delete a document and all of its rows.
  Delete { doc_name: String },
  /// Drop every derived table and forget every document.
  Clear {
    /// Confirm that all stored data should be removed.
    #[arg(long)]
    yes: bool,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  // Logs go to stderr so `--json` output stays clean.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(cli.config.as_deref())?;
  let database_path = cli
    .database
    .as_deref()
    .map(expand_tilde)
    .unwrap_or_else(|| settings.database_path.clone());

  let store = SqliteStore::open_with(&database_path, settings.store_options())
    .await
    .with_context(|| format!("failed to open store at {database_path:?}"))?;

  let code = match cli.command {
    Command::Ingest { paths, replace, json } => {
      let mode = if replace { BatchMode::Replace } else { BatchMode::Append };
      let summary = ingest(&store, &paths, mode).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
      } else {
        print_summary(&summary);
      }
      if summary.has_failures() { ExitCode::FAILURE } else { ExitCode::SUCCESS }
    }
    Command::Documents => {
      for doc in store.list_documents().await.context("failed to list documents")? {
        println!("{:>6}  {}", doc.doc_id, doc.doc_name);
      }
      ExitCode::SUCCESS
    }
    Command::Schema => {
      for table in store.reflect_schema().await.context("failed to read schema")? {
        println!("{}", table.name);
        for column in table.columns {
          println!("  {:<32} {}", column.name, column.declared_type);
        }
      }
      ExitCode::SUCCESS
    }
    Command::Delete { doc_name } => {
      match store
        .delete_document(doc_name.clone())
        .await
        .with_context(|| format!("failed to delete {doc_name:?}"))?
      {
        Some(report) => {
          println!("deleted {} (doc_id {}, {} rows)", report.doc_name, report.doc_id, report.total());
          for (table, rows) in &report.rows_deleted {
            println!("  {table:<32} {rows}");
          }
          ExitCode::SUCCESS
        }
        None => {
          eprintln!("no document named {doc_name:?}");
          ExitCode::FAILURE
        }
      }
    }
    Command::Clear { yes: false } => {
      eprintln!("refusing to clear {database_path:?} without --yes");
      ExitCode::FAILURE
    }
    Command::Clear { yes: true } => {
      let dropped = store.clear().await.context("failed to clear store")?;
      println!("cleared {database_path:?}: {} tables dropped", dropped.len());
      ExitCode::SUCCESS
    }
  };

  store.close().await.context("failed to close store")?;
  Ok(code)
}

// ─── Ingest ───────────────────────────────────────────────────────────────────

/// Ingest every file under `paths` in order. Unreadable or malformed files
/// become `Failed` outcomes; the rest of the batch still runs.
async fn ingest(
  store: &SqliteStore,
  paths: &[PathBuf],
  mode: BatchMode,
) -> anyhow::Result<BatchSummary> {
  let files = input::collect_files(paths)?;
  tracing::info!(files = files.len(), ?mode, "starting ingestion");

  let mut summary = BatchSummary::default();
  for path in files {
    let doc_name = input::doc_name(&path);
    let outcome = match input::read_document(&path) {
      Ok(document) => batch::ingest_document(store, doc_name, document, mode).await,
      Err(e) => {
        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
        DocumentOutcome::failed(doc_name, format!("{e:#}"))
      }
    };
    summary.push(outcome);
  }
  Ok(summary)
}

fn print_summary(summary: &BatchSummary) {
  for outcome in &summary.outcomes {
    match outcome {
      DocumentOutcome::Complete { report } => print_report("complete", report),
      DocumentOutcome::Partial { report } => {
        print_report("partial", report);
        for warning in &report.warnings {
          println!("    warning: {warning}");
        }
        for skipped in &report.skipped {
          println!(
            "    skipped: {skipped} ({} rows discarded, {} items orphaned)",
            skipped.discarded_rows, skipped.orphaned_items
          );
        }
      }
      DocumentOutcome::Failed { doc_name, reason } => {
        println!("{:<9} {doc_name}: {reason}", "failed");
      }
    }
  }
  println!(
    "{} complete, {} partial, {} failed",
    summary.complete(),
    summary.partial(),
    summary.failed()
  );
}

fn print_report(label: &str, report: &IngestReport) {
  println!(
    "{label:<9} {} (doc_id {}): {} rows, {} tables created, {} columns added",
    report.doc_name,
    report.doc_id,
    report.rows_inserted,
    report.tables_created.len(),
    report.columns_added.len()
  );
  for conflict in &report.type_conflicts {
    println!(
      "    type conflict: {}.{} {} vs {}, stored as {}",
      conflict.table, conflict.column, conflict.current, conflict.observed, conflict.resolved
    );
  }
  for renamed in &report.renamed {
    println!("    renamed: {}.{:?} stored as {}", renamed.table, renamed.key, renamed.column);
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  #[test]
  fn cli_definition_is_valid() { Cli::command().debug_assert(); }

  #[test]
  fn ingest_flags_parse() {
    let cli = Cli::parse_from(["formbase", "-d", "x.db", "ingest", "--replace", "a.json", "dir"]);
    assert_eq!(cli.database, Some(PathBuf::from("x.db")));
    match cli.command {
      Command::Ingest { paths, replace, json } => {
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("dir")]);
        assert!(replace);
        assert!(!json);
      }
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn clear_needs_confirmation_flag() {
    let cli = Cli::parse_from(["formbase", "clear"]);
    assert!(matches!(cli.command, Command::Clear { yes: false }));
    let cli = Cli::parse_from(["formbase", "clear", "--yes"]);
    assert!(matches!(cli.command, Command::Clear { yes: true }));
  }

  #[test]
  fn ingest_requires_a_path() {
    assert!(Cli::try_parse_from(["formbase", "ingest"]).is_err());
  }

  #[tokio::test]
  async fn unreadable_files_fail_without_stopping_the_batch() {
    let dir = std::env::temp_dir().join(format!("formbase-cli-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("a.json"), r#"{"a": 1, "d": [{"e": 2}]}"#).unwrap();
    std::fs::write(dir.join("b.json"), "not json").unwrap();
    std::fs::write(dir.join("c.json"), "[1, 2]").unwrap();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let summary = ingest(&store, &[dir.clone()], BatchMode::Append).await.unwrap();

    let names: Vec<_> = summary.outcomes.iter().map(|o| o.doc_name()).collect();
    assert_eq!(names, ["a.json", "b.json", "c.json"]);
    assert_eq!(summary.complete(), 1);
    assert_eq!(summary.failed(), 2);
    assert_eq!(store.list_documents().await.unwrap().len(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
  }
}
