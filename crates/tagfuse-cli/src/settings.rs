//! Runtime configuration, read from `tagfuse.toml` and `TAGFUSE_*` variables.
//!
//! ```toml
//! store_path = "~/.local/share/tagfuse/tags.db"
//!
//! [matching]
//! preset = "strict"
//! jaccard_threshold = 0.85
//!
//! [merge]
//! alias_policy = "orphan"
//! ```
//!
//! Nested keys use `__` in the environment, e.g. `TAGFUSE_MATCHING__PRESET`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use tagfuse_core::{
  history::AliasPolicy,
  normalize::StopWords,
  similarity::{MatchConfig, Preset},
};

// ─── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store_path: PathBuf,
  pub matching:   MatchingSettings,
  pub merge:      MergeSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/tagfuse/tags.db"),
      matching:   MatchingSettings::default(),
      merge:      MergeSettings::default(),
    }
  }
}

/// A preset plus optional per-field overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
  pub preset:            Preset,
  pub max_edits:         Option<usize>,
  pub max_edits_long:    Option<usize>,
  pub long_name_len:     Option<usize>,
  pub jaccard_threshold: Option<f64>,
  pub stop_words:        Option<Vec<String>>,
}

impl MatchingSettings {
  pub fn resolve(&self) -> MatchConfig {
    let mut cfg = self.preset.config();
    if let Some(v) = self.max_edits {
      cfg.max_edits = v;
    }
    if let Some(v) = self.max_edits_long {
      cfg.max_edits_long = v;
    }
    if let Some(v) = self.long_name_len {
      cfg.long_name_len = v;
    }
    if let Some(v) = self.jaccard_threshold {
      cfg.jaccard_threshold = v;
    }
    if let Some(words) = &self.stop_words {
      cfg.stop_words = StopWords::new(words);
    }
    cfg
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
  pub alias_policy: AliasPolicy,
}

// ─── Loading ──────────────────────────────────────────────────────────────────

/// Layer the optional config file under the environment and deserialise.
pub fn load(path: &Path) -> anyhow::Result<Settings> {
  let raw = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("TAGFUSE")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .with_context(|| format!("failed to read config file {}", path.display()))?;

  let mut settings: Settings = raw
    .try_deserialize()
    .context("failed to deserialise settings")?;
  settings.store_path = expand_tilde(&settings.store_path);
  Ok(settings)
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
