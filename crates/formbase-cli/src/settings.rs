//! Layered configuration: defaults, then `formbase.toml` (or `--config`),
//! then `FORMBASE_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use formbase_core::{ColumnTypePolicy, ident::ROOT_TABLE};
use formbase_store_sqlite::StoreOptions;
use serde::Deserialize;

const DEFAULT_CONFIG: &str = "formbase.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite file holding the registry and every derived table.
  pub database_path: PathBuf,
  pub root_table:    String,
  pub type_policy:   ColumnTypePolicy,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database_path: PathBuf::from("formbase.db"),
      root_table:    ROOT_TABLE.to_owned(),
      type_policy:   ColumnTypePolicy::default(),
    }
  }
}

impl Settings {
  /// Read settings. An explicit `config` file must exist; the default one
  /// is optional.
  pub fn load(config: Option<&Path>) -> anyhow::Result<Self> {
    let file = match config {
      Some(path) => config::File::from(path.to_path_buf()).required(true),
      None => config::File::from(PathBuf::from(DEFAULT_CONFIG)).required(false),
    };

    let settings: Self = config::Config::builder()
      .add_source(file)
      .add_source(config::Environment::with_prefix("FORMBASE"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise Settings")?;

    Ok(Self { database_path: expand_tilde(&settings.database_path), ..settings })
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions { root_table: self.root_table.clone(), type_policy: self.type_policy }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
