//! One-time migration from legacy per-item tag lists.
//!
//! Legacy data is expected to be imperfect: a list that fails to parse is
//! treated as empty, never as an error. Store failures still propagate.

use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  store::{LegacyMetadata, MetadataSource, TagStore},
  tag::TagKind,
};

/// Decode a JSON-encoded list of tag names. Missing, blank, malformed or
/// non-array input yields an empty list.
pub fn parse_tag_list(encoded: Option<&str>) -> Vec<String> {
  let Some(raw) = encoded.map(str::trim).filter(|s| !s.is_empty()) else {
    return Vec::new();
  };
  match serde_json::from_str::<Vec<String>>(raw) {
    Ok(names) => names,
    Err(e) => {
      warn!(error = %e, "unparseable legacy tag list, treating as empty");
      Vec::new()
    }
  }
}

/// The `(name, kind)` tags described by one legacy record, AI tags first.
///
/// `None` when both decoded lists are empty. Blank names are dropped after
/// that check, so a record holding only blank names yields `Some(vec![])`.
pub fn legacy_tags(record: &LegacyMetadata) -> Option<Vec<(String, TagKind)>> {
  let ai = parse_tag_list(record.ai_tags.as_deref());
  let manual = parse_tag_list(record.manual_tags.as_deref());
  if ai.is_empty() && manual.is_empty() {
    return None;
  }

  let tags = ai
    .into_iter()
    .map(|name| (name, TagKind::Ai))
    .chain(manual.into_iter().map(|name| (name, TagKind::Manual)))
    .filter(|(name, _)| !name.trim().is_empty())
    .collect();
  Some(tags)
}

/// Rebuilds item/tag associations from a [`MetadataSource`].
pub struct MetadataSyncer<'s, S> {
  store: &'s S,
}

impl<'s, S> MetadataSyncer<'s, S>
where
  S: TagStore + MetadataSource,
{
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Replace the tag set of every item that has legacy tags. Returns the
  /// number of items processed; items whose lists are both empty are skipped
  /// and not counted. An item listing only blank names is processed and ends
  /// up with no tags.
  ///
  /// Destructive: associations not present in the legacy lists are removed.
  pub async fn sync_all_tags_from_metadata(&self) -> Result<usize> {
    let records = MetadataSource::legacy_metadata(self.store)
      .await
      .map_err(Error::store)?;
    info!(records = records.len(), "starting legacy tag sync");

    let mut count = 0;
    for record in &records {
      let Some(tags) = legacy_tags(record) else {
        debug!(item = %record.item_id, "no legacy tags, skipping");
        continue;
      };

      self
        .store
        .replace_item_tags(&record.item_id, tags)
        .await
        .map_err(Error::store)?;
      count += 1;
    }

    info!(processed = count, "legacy tag sync complete");
    Ok(count)
  }
}
