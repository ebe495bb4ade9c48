//! Subcommand handlers.

use anyhow::{Context as _, bail};
use tagfuse_core::{
  alias::AliasResolver,
  grouping::{DuplicateGroup, IgnoredPairs, group_duplicates},
  merge::MergeEngine,
  similarity::Preset,
  store::TagStore,
  sync::MetadataSyncer,
  tag::{Tag, TagId, TagKind, sort_for_grouping},
};
use tagfuse_store_sqlite::SqliteStore;
use tracing::info;
use uuid::Uuid;

use crate::{AliasCommand, Command, settings::Settings};

pub async fn run(store: &SqliteStore, settings: &Settings, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Tag { item, names, kind, confidence } => {
      let kind = TagKind::from(kind);
      for name in &names {
        let tag_id = store
          .get_or_create_tag(name, kind, confidence)
          .await
          .with_context(|| format!("failed to create tag {name:?}"))?;
        store.add_tag_to_item(&item, tag_id).await?;
      }
      println!("tagged {item} with {} tag(s)", names.len());
    }

    Command::Untag { item, tag, kind } => {
      let tag = resolve_tag(store, &tag, kind.map(TagKind::from)).await?;
      if store.remove_tag_from_item(&item, tag.tag_id).await? {
        println!("removed {} from {item}", tag.name);
      } else {
        println!("{item} was not tagged {}", tag.name);
      }
    }

    Command::Tags { item } => {
      let tags = match &item {
        Some(item) => store.get_tags_for_item(item).await?,
        None => store.list_tags().await?,
      };
      tags.iter().for_each(print_tag);
    }

    Command::Search { query, limit } => {
      store.search_tags(&query, limit).await?.iter().for_each(print_tag);
    }

    Command::Groups { json, preset } => {
      let config = match preset {
        Some(p) => Preset::from(p).config(),
        None => settings.matching.resolve(),
      };
      let groups = duplicate_groups(store, &config).await?;
      info!(groups = groups.len(), "duplicate groups proposed");

      if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
      } else {
        for group in &groups {
          print_tag(&group.target);
          for candidate in &group.candidates {
            print!("  ~ ");
            print_tag(candidate);
          }
        }
      }
    }

    Command::Merge { target, sources, by, target_kind, source_kind } => {
      let target = resolve_tag(store, &target, target_kind.map(TagKind::from)).await?;
      let source_kind = source_kind.map(TagKind::from);
      let mut source_ids = Vec::with_capacity(sources.len());
      for source in &sources {
        source_ids.push(resolve_tag(store, source, source_kind).await?.tag_id);
      }

      let outcome = MergeEngine::new(store)
        .with_alias_policy(settings.merge.alias_policy)
        .merge_tags(target.tag_id, &source_ids, by.as_deref())
        .await?;

      println!("merged {} tag(s) into {}", outcome.applied.len(), target.name);
      for failure in &outcome.failed {
        eprintln!("  failed {}: {}", failure.source_tag_id, failure.error);
      }
      if !outcome.is_complete() {
        bail!("{} source(s) were not merged", outcome.failed.len());
      }
    }

    Command::Alias(cmd) => run_alias(store, cmd).await?,

    Command::Ignore { a, b, a_kind, b_kind } => {
      let a = resolve_tag(store, &a, a_kind.map(TagKind::from)).await?;
      let b = resolve_tag(store, &b, b_kind.map(TagKind::from)).await?;
      store.ignore_match(a.tag_id, b.tag_id).await?;
      println!("{} and {} will no longer be proposed together", a.name, b.name);
    }

    Command::History { target } => {
      let target = match &target {
        Some(t) => Some(resolve_tag_id(store, t).await?),
        None => None,
      };
      for record in store.merge_history(target).await? {
        println!(
          "{}  {} ({}) -> {}{}",
          record.merged_at.format("%Y-%m-%d %H:%M:%S"),
          record.source_tag_name.as_deref().unwrap_or("?"),
          record.source_tag_id,
          record.target_tag_id,
          record.merged_by.map(|by| format!("  by {by}")).unwrap_or_default(),
        );
      }
    }

    Command::Sync => {
      let processed = MetadataSyncer::new(store).sync_all_tags_from_metadata().await?;
      println!("synced {processed} item(s)");
    }
  }

  Ok(())
}

async fn run_alias(store: &SqliteStore, cmd: AliasCommand) -> anyhow::Result<()> {
  let aliases = AliasResolver::new(store);
  match cmd {
    AliasCommand::Add { name, target, kind } => {
      let target = resolve_tag(store, &target, kind.map(TagKind::from)).await?;
      let alias = aliases.create_tag_alias(&name, target.tag_id).await?;
      println!("{} -> {}", alias.alias_name, target.name);
    }
    AliasCommand::Get { name } => match aliases.get_tag_by_alias(&name).await? {
      Some(tag) => print_tag(&tag),
      None => println!("{name:?} does not resolve to a tag"),
    },
    AliasCommand::List { target } => {
      let target = match &target {
        Some(t) => Some(resolve_tag(store, t, None).await?.tag_id),
        None => None,
      };
      for alias in aliases.list_aliases(target).await? {
        println!("{} -> {}", alias.alias_name, alias.target_tag_id);
      }
    }
    AliasCommand::Rm { name } => {
      if !aliases.remove_alias(&name).await? {
        bail!("no alias named {name:?}");
      }
    }
  }
  Ok(())
}

/// Every stored tag grouped into probable duplicates, minus ignored pairs.
pub async fn duplicate_groups(
  store: &SqliteStore,
  config: &tagfuse_core::similarity::MatchConfig,
) -> anyhow::Result<Vec<DuplicateGroup>> {
  let mut tags = store.list_tags().await?;
  sort_for_grouping(&mut tags);

  let ignored: IgnoredPairs = store
    .ignored_matches()
    .await?
    .into_iter()
    .map(|m| (m.tag_id_a, m.tag_id_b))
    .collect();

  Ok(group_duplicates(&tags, config, &ignored))
}

/// Look a tag up by id, exact (normalized) name, or alias.
///
/// A name shared by tags of several kinds is ambiguous unless `kind` is set.
pub async fn resolve_tag(
  store: &SqliteStore,
  reference: &str,
  kind: Option<TagKind>,
) -> anyhow::Result<Tag> {
  if let Ok(id) = Uuid::parse_str(reference) {
    return store
      .get_tag(id)
      .await?
      .with_context(|| format!("no tag with id {id}"));
  }

  let mut named: Vec<Tag> = store
    .find_tags_by_name(reference)
    .await?
    .into_iter()
    .filter(|t| kind.is_none_or(|k| t.kind == k))
    .collect();

  match named.len() {
    0 => {}
    1 => return Ok(named.remove(0)),
    _ => bail!("{reference:?} names tags of several kinds; pass --kind"),
  }

  AliasResolver::new(store)
    .get_tag_by_alias(reference)
    .await?
    .with_context(|| format!("no tag or alias named {reference:?}"))
}

/// Like [`resolve_tag`], but a bare id is accepted even if the tag is gone.
async fn resolve_tag_id(store: &SqliteStore, reference: &str) -> anyhow::Result<TagId> {
  match Uuid::parse_str(reference) {
    Ok(id) => Ok(id),
    Err(_) => Ok(resolve_tag(store, reference, None).await?.tag_id),
  }
}

fn print_tag(tag: &Tag) {
  let confidence = tag
    .confidence
    .map(|c| format!("  ({c:.2})"))
    .unwrap_or_default();
  println!("{}  {:<11}  {}{confidence}", tag.tag_id, tag.kind.as_str(), tag.name);
}

#[cfg(test)]
mod tests {
  use tagfuse_core::similarity::MatchConfig;

  use super::*;

  async fn store() -> SqliteStore {
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store")
  }

  #[tokio::test]
  async fn resolves_by_id_name_and_alias() {
    let s = store().await;
    let beach = s.get_or_create_tag("Beach", TagKind::Manual, None).await.unwrap();
    s.get_or_create_tag("Beach house", TagKind::Manual, None).await.unwrap();
    AliasResolver::new(&s).create_tag_alias("seaside", beach).await.unwrap();

    for reference in [beach.to_string(), "  beach".to_owned(), "Seaside".to_owned()] {
      let tag = resolve_tag(&s, &reference, None).await.unwrap();
      assert_eq!(tag.tag_id, beach, "reference {reference:?}");
    }
    assert!(resolve_tag(&s, "dune", None).await.is_err());
  }

  #[tokio::test]
  async fn exact_name_wins_over_many_substring_hits() {
    let s = store().await;
    let cat = s.get_or_create_tag("cat", TagKind::Manual, None).await.unwrap();
    for n in 0..600 {
      s.get_or_create_tag(&format!("Acat {n:03}"), TagKind::Manual, None)
        .await
        .unwrap();
    }

    let tag = resolve_tag(&s, "cat", None).await.unwrap();
    assert_eq!(tag.tag_id, cat);
  }

  #[tokio::test]
  async fn name_shared_across_kinds_needs_a_kind() {
    let s = store().await;
    s.get_or_create_tag("cat", TagKind::Manual, None).await.unwrap();
    let ai = s.get_or_create_tag("cat", TagKind::Ai, None).await.unwrap();

    assert!(resolve_tag(&s, "cat", None).await.is_err());
    let tag = resolve_tag(&s, "cat", Some(TagKind::Ai)).await.unwrap();
    assert_eq!(tag.tag_id, ai);
  }

  #[tokio::test]
  async fn ignored_pairs_are_left_out_of_groups() {
    let s = store().await;
    let cat = s.get_or_create_tag("cat", TagKind::Manual, None).await.unwrap();
    let cats = s.get_or_create_tag("cats", TagKind::Manual, None).await.unwrap();

    let groups = duplicate_groups(&s, &MatchConfig::default()).await.unwrap();
    assert_eq!(groups.len(), 1);

    s.ignore_match(cats, cat).await.unwrap();
    assert!(duplicate_groups(&s, &MatchConfig::default()).await.unwrap().is_empty());
  }
}
