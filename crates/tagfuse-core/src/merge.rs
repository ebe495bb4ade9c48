//! Multi-source tag merges.
//!
//! Each source is absorbed independently through
//! [`TagStore::absorb_tag`]: a failure on one source is recorded and the
//! remaining sources are still processed. Merges are audited but cannot be
//! undone.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  history::{AliasPolicy, TagMerge},
  store::TagStore,
  tag::TagId,
};

/// A source tag that could not be absorbed.
#[derive(Debug)]
pub struct MergeFailure {
  pub source_tag_id: TagId,
  pub error:         Error,
}

/// Per-source result of [`MergeEngine::merge_tags`].
#[derive(Debug, Default)]
pub struct MergeOutcome {
  /// Sources absorbed, in request order.
  pub applied: Vec<TagId>,
  /// Sources left untouched (or partially touched, for non-atomic stores).
  pub failed:  Vec<MergeFailure>,
  /// Audit records appended, one per applied source.
  pub records: Vec<TagMerge>,
}

impl MergeOutcome {
  pub fn is_complete(&self) -> bool { self.failed.is_empty() }

  /// Sources worth retrying.
  pub fn failed_ids(&self) -> Vec<TagId> {
    self.failed.iter().map(|f| f.source_tag_id).collect()
  }
}

/// Executes merges against a [`TagStore`].
pub struct MergeEngine<'s, S> {
  store:        &'s S,
  alias_policy: AliasPolicy,
}

impl<'s, S: TagStore> MergeEngine<'s, S> {
  pub fn new(store: &'s S) -> Self {
    Self { store, alias_policy: AliasPolicy::default() }
  }

  pub fn with_alias_policy(mut self, policy: AliasPolicy) -> Self {
    self.alias_policy = policy;
    self
  }

  /// Absorb every tag in `source_tag_ids` into `target_tag_id`.
  ///
  /// Sources equal to the target, and repeats of a source already handled in
  /// this call, are skipped without a record. A missing source is reported in
  /// `failed` as [`Error::TagNotFound`]. Fails up front only if the target
  /// does not exist or cannot be read.
  pub async fn merge_tags(
    &self,
    target_tag_id: TagId,
    source_tag_ids: &[TagId],
    merged_by: Option<&str>,
  ) -> Result<MergeOutcome> {
    if self
      .store
      .get_tag(target_tag_id)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      return Err(Error::TagNotFound(target_tag_id));
    }

    let mut outcome = MergeOutcome::default();
    let mut seen: HashSet<TagId> = HashSet::new();

    for &source_id in source_tag_ids {
      if source_id == target_tag_id || !seen.insert(source_id) {
        debug!(%source_id, "skipping self or repeated merge source");
        continue;
      }

      let absorbed = self
        .store
        .absorb_tag(
          target_tag_id,
          source_id,
          merged_by.map(str::to_owned),
          self.alias_policy,
        )
        .await;

      match absorbed {
        Ok(Some(record)) => {
          debug!(%source_id, target = %target_tag_id, "absorbed tag");
          outcome.applied.push(source_id);
          outcome.records.push(record);
        }
        Ok(None) => {
          warn!(%source_id, "merge source does not exist");
          outcome.failed.push(MergeFailure {
            source_tag_id: source_id,
            error:         Error::TagNotFound(source_id),
          });
        }
        Err(e) => {
          warn!(%source_id, error = %e, "failed to absorb tag");
          outcome.failed.push(MergeFailure {
            source_tag_id: source_id,
            error:         Error::store(e),
          });
        }
      }
    }

    info!(
      target = %target_tag_id,
      applied = outcome.applied.len(),
      failed = outcome.failed.len(),
      "merge finished"
    );
    Ok(outcome)
  }
}
