//! Locating and reading the JSON files handed to `formbase ingest`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde_json::Value;

fn is_json(path: &Path) -> bool {
  path
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Expand `paths` into the files to ingest, in order. Directories contribute
/// their `*.json` files (not recursively), sorted by name; files are taken
/// as given.
pub fn collect_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for path in paths {
    if !path.is_dir() {
      files.push(path.clone());
      continue;
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path)
      .with_context(|| format!("failed to read directory {}", path.display()))?
    {
      let entry = entry.with_context(|| format!("failed to read directory {}", path.display()))?;
      let entry = entry.path();
      if entry.is_file() && is_json(&entry) {
        entries.push(entry);
      }
    }
    entries.sort();
    files.extend(entries);
  }
  Ok(files)
}

/// The name a file is registered under: its file name.
pub fn doc_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

pub fn read_document(path: &Path) -> anyhow::Result<Value> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}
