//! Greedy clustering of tags into proposed merge groups.
//!
//! The grouper only proposes. Whether a group is merged, and into which
//! target, is decided outside this crate.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
  similarity::{MatchConfig, classify_pair},
  tag::{Tag, TagId},
};

/// A proposed merge: `candidates` look like duplicates of `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
  pub target:     Tag,
  pub candidates: Vec<Tag>,
}

/// Pairs a reviewer has declared "not duplicates". Order-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredPairs(BTreeSet<(TagId, TagId)>);

impl IgnoredPairs {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, a: TagId, b: TagId) { self.0.insert(ordered(a, b)); }

  pub fn contains(&self, a: TagId, b: TagId) -> bool { self.0.contains(&ordered(a, b)) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<(TagId, TagId)> for IgnoredPairs {
  fn from_iter<I: IntoIterator<Item = (TagId, TagId)>>(iter: I) -> Self {
    let mut pairs = Self::new();
    for (a, b) in iter {
      pairs.insert(a, b);
    }
    pairs
  }
}

fn ordered(a: TagId, b: TagId) -> (TagId, TagId) { if a <= b { (a, b) } else { (b, a) } }

/// Cluster `tags` into duplicate groups.
///
/// Single pass, first root wins: each tag not yet claimed opens a group and
/// claims every later unclaimed tag it matches. The result depends on the
/// order of `tags`, so callers must supply a deterministic one (see
/// [`crate::tag::sort_for_grouping`]). Tags that match nothing form no group.
/// Runs `O(n²)` classifications.
pub fn group_duplicates(
  tags: &[Tag],
  config: &MatchConfig,
  ignored: &IgnoredPairs,
) -> Vec<DuplicateGroup> {
  let mut processed: HashSet<TagId> = HashSet::new();
  let mut groups = Vec::new();

  for (i, root) in tags.iter().enumerate() {
    if processed.contains(&root.tag_id) {
      continue;
    }

    let mut candidates = Vec::new();
    for candidate in &tags[i + 1..] {
      if candidate.tag_id == root.tag_id || processed.contains(&candidate.tag_id) {
        continue;
      }
      if ignored.contains(root.tag_id, candidate.tag_id) {
        continue;
      }
      if classify_pair(root, candidate, config) {
        processed.insert(candidate.tag_id);
        candidates.push(candidate.clone());
      }
    }

    if !candidates.is_empty() {
      processed.insert(root.tag_id);
      groups.push(DuplicateGroup { target: root.clone(), candidates });
    }
  }

  groups
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};

  use super::*;
  use crate::tag::TagKind;

  fn tags(names: &[&str]) -> Vec<Tag> {
    let base = Utc::now();
    names
      .iter()
      .enumerate()
      .map(|(i, name)| {
        let mut tag = Tag::new(name, TagKind::Manual, None);
        tag.created_at = base + Duration::seconds(i as i64);
        tag
      })
      .collect()
  }

  fn names(group: &DuplicateGroup) -> (String, Vec<String>) {
    (
      group.target.name.clone(),
      group.candidates.iter().map(|t| t.name.clone()).collect(),
    )
  }

  #[test]
  fn plural_and_stop_word_groups() {
    let tags = tags(&["rouge", "rouges", "noir et blanc", "noir blanc", "paysage"]);
    let groups = group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new());

    assert_eq!(groups.len(), 2);
    assert_eq!(names(&groups[0]), ("rouge".into(), vec!["rouges".into()]));
    assert_eq!(
      names(&groups[1]),
      ("noir et blanc".into(), vec!["noir blanc".into()])
    );
  }

  #[test]
  fn first_root_wins_over_non_transitive_chain() {
    // cart~cat and cat~bat, but cart and bat are two edits apart on a short
    // root. Once "cat" is claimed by "cart", "bat" has nothing left to match.
    let tags = tags(&["cart", "cat", "bat"]);
    let groups = group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new());
    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), ("cart".into(), vec!["cat".into()]));
  }

  #[test]
  fn long_roots_absorb_two_edit_variants() {
    let tags = tags(&["abcdefg", "abcdefx", "abcdexy", "zzz"]);
    let groups = group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].candidates.len(), 2);
  }

  #[test]
  fn each_tag_lands_in_at_most_one_group() {
    let tags = tags(&["cat", "cats", "dog", "dogs"]);
    let groups = group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new());
    let targets: Vec<_> = groups.iter().map(|g| g.target.name.as_str()).collect();
    assert_eq!(targets, ["cat", "dog"]);
    assert!(groups.iter().all(|g| g.candidates.len() == 1));
  }

  #[test]
  fn order_changes_the_target() {
    let mut tags = tags(&["rouges", "rouge"]);
    let groups = group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new());
    assert_eq!(groups[0].target.name, "rouges");

    tags.reverse();
    let groups = group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new());
    assert_eq!(groups[0].target.name, "rouge");
  }

  #[test]
  fn ignored_pairs_are_skipped_in_either_order() {
    let tags = tags(&["sunset", "sunsets"]);
    let ignored: IgnoredPairs = [(tags[1].tag_id, tags[0].tag_id)].into_iter().collect();
    let groups = group_duplicates(&tags, &MatchConfig::default(), &ignored);
    assert!(groups.is_empty());
  }

  #[test]
  fn unique_tags_form_no_groups() {
    let tags = tags(&["paysage", "portrait", "macro"]);
    assert!(group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new()).is_empty());
  }

  #[test]
  fn kinds_are_grouped_together() {
    let mut tags = tags(&["Beach", "beach"]);
    tags[1].kind = TagKind::Ai;
    let groups = group_duplicates(&tags, &MatchConfig::default(), &IgnoredPairs::new());
    assert_eq!(groups.len(), 1);
  }
}
