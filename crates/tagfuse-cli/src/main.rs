//! `tagfuse`, an operator surface for the tag vocabulary.
//!
//! # Usage
//!
//! ```
//! tagfuse tag photo-17 Beach "Sunset" --kind manual
//! tagfuse groups --json
//! tagfuse merge beach beaches "Beach " --by alice
//! tagfuse alias add seaside beach
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tagfuse_core::{similarity::Preset, tag::TagKind};
use tagfuse_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Deduplicate and merge a tag vocabulary")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tagfuse.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

/// Tags are referred to by id, by exact name, or by alias, in that order.
#[derive(Subcommand)]
enum Command {
  /// Attach tags to an item, creating them as needed.
  Tag {
    item:  String,
    #[arg(required = true)]
    names: Vec<String>,
    #[arg(long, value_enum, default_value_t = KindArg::Manual)]
    kind:  KindArg,
    /// Confidence score; kept only for AI kinds.
    #[arg(long)]
    confidence: Option<f64>,
  },

  /// Detach a tag from an item.
  Untag {
    item: String,
    tag:  String,
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
  },

  /// List every tag, or the tags of one item.
  Tags {
    #[arg(long)]
    item: Option<String>,
  },

  /// Find tags whose name contains a substring.
  Search {
    query: String,
    #[arg(long, default_value_t = 20)]
    limit: usize,
  },

  /// Propose groups of probable duplicates.
  Groups {
    /// Print the groups as JSON.
    #[arg(long)]
    json:   bool,
    /// Use this preset instead of the configured matching settings.
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,
  },

  /// Absorb source tags into a target tag.
  Merge {
    target:      String,
    #[arg(required = true)]
    sources:     Vec<String>,
    /// Actor recorded in the merge history.
    #[arg(long)]
    by:          Option<String>,
    /// Kind of the target, when its name is shared across kinds.
    #[arg(long, value_enum)]
    target_kind: Option<KindArg>,
    /// Kind of every source given by name.
    #[arg(long, value_enum)]
    source_kind: Option<KindArg>,
  },

  /// Manage alternate names.
  #[command(subcommand)]
  Alias(AliasCommand),

  /// Declare two tags not to be duplicates.
  Ignore {
    a:      String,
    b:      String,
    #[arg(long, value_enum)]
    a_kind: Option<KindArg>,
    #[arg(long, value_enum)]
    b_kind: Option<KindArg>,
  },

  /// Show merge history, newest first.
  History {
    #[arg(long)]
    target: Option<String>,
  },

  /// Rebuild item tags from the legacy metadata table.
  Sync,
}

#[derive(Subcommand)]
enum AliasCommand {
  Add {
    name:   String,
    target: String,
    #[arg(long, value_enum)]
    kind:   Option<KindArg>,
  },
  Get { name: String },
  List {
    #[arg(long)]
    target: Option<String>,
  },
  Rm { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
  Ai,
  Manual,
  AiDetailed,
}

impl From<KindArg> for TagKind {
  fn from(k: KindArg) -> Self {
    match k {
      KindArg::Ai => Self::Ai,
      KindArg::Manual => Self::Manual,
      KindArg::AiDetailed => Self::AiDetailed,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
  Strict,
  Balanced,
  Aggressive,
}

impl From<PresetArg> for Preset {
  fn from(p: PresetArg) -> Self {
    match p {
      PresetArg::Strict => Self::Strict,
      PresetArg::Balanced => Self::Balanced,
      PresetArg::Aggressive => Self::Aggressive,
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = settings::load(&cli.config)?;

  if let Some(parent) = settings.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  commands::run(&store, &settings, cli.command).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn merge_accepts_kinds_for_both_sides() {
    let cli = Cli::try_parse_from([
      "tagfuse", "merge", "cat", "cat", "--target-kind", "manual", "--source-kind", "ai",
    ])
    .unwrap();

    let Command::Merge { target_kind, source_kind, sources, .. } = cli.command else {
      panic!("expected merge");
    };
    assert_eq!(sources, ["cat"]);
    assert!(matches!(target_kind, Some(KindArg::Manual)));
    assert!(matches!(source_kind, Some(KindArg::Ai)));
  }

  #[test]
  fn ignore_and_alias_add_accept_kinds() {
    let cli = Cli::try_parse_from(["tagfuse", "ignore", "cat", "cat", "--b-kind", "ai-detailed"])
      .unwrap();
    assert!(matches!(
      cli.command,
      Command::Ignore { a_kind: None, b_kind: Some(KindArg::AiDetailed), .. }
    ));

    let cli = Cli::try_parse_from(["tagfuse", "alias", "add", "kitty", "cat", "--kind", "ai"])
      .unwrap();
    assert!(matches!(
      cli.command,
      Command::Alias(AliasCommand::Add { kind: Some(KindArg::Ai), .. })
    ));
  }
}
