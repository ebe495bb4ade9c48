//! Alternate names resolving to canonical tags.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  history::TagAlias,
  normalize::normalize,
  store::TagStore,
  tag::{Tag, TagId},
};

/// Creates and resolves aliases through a [`TagStore`].
pub struct AliasResolver<'s, S> {
  store: &'s S,
}

impl<'s, S: TagStore> AliasResolver<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Create an alias named `alias_name` (normalized) for `target_tag_id`.
  ///
  /// Alias names are unique across all targets: if any alias already
  /// normalizes to the same string this fails with [`Error::AlreadyExists`].
  pub async fn create_tag_alias(
    &self,
    alias_name: &str,
    target_tag_id: TagId,
  ) -> Result<TagAlias> {
    let alias_name = normalize(alias_name);
    if alias_name.is_empty() {
      return Err(Error::Validation("alias name must not be empty".into()));
    }

    if self
      .store
      .find_alias(&alias_name)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Err(Error::AlreadyExists(format!("alias {alias_name:?}")));
    }

    if self
      .store
      .get_tag(target_tag_id)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      return Err(Error::TagNotFound(target_tag_id));
    }

    let alias = TagAlias {
      alias_id: Uuid::new_v4(),
      alias_name,
      target_tag_id,
      created_at: Utc::now(),
    };
    self
      .store
      .insert_alias(alias.clone())
      .await
      .map_err(Error::store)?;

    debug!(alias = %alias.alias_name, target = %target_tag_id, "alias created");
    Ok(alias)
  }

  /// Resolve an alias to its tag, read fresh from the store.
  ///
  /// Returns `None` if no alias has this name, or if its target no longer
  /// exists.
  pub async fn get_tag_by_alias(&self, alias_name: &str) -> Result<Option<Tag>> {
    let alias_name = normalize(alias_name);
    let Some(alias) = self
      .store
      .find_alias(&alias_name)
      .await
      .map_err(Error::store)?
    else {
      return Ok(None);
    };

    self
      .store
      .get_tag(alias.target_tag_id)
      .await
      .map_err(Error::store)
  }

  /// Aliases, optionally restricted to one target.
  pub async fn list_aliases(&self, target: Option<TagId>) -> Result<Vec<TagAlias>> {
    self.store.list_aliases(target).await.map_err(Error::store)
  }

  /// Delete an alias by name. Returns whether one existed.
  pub async fn remove_alias(&self, alias_name: &str) -> Result<bool> {
    let alias_name = normalize(alias_name);
    self
      .store
      .delete_alias(&alias_name)
      .await
      .map_err(Error::store)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{memory::MemoryStore, tag::TagKind};

  #[tokio::test]
  async fn alias_resolves_case_insensitively() {
    let store = MemoryStore::default();
    let face = store.get_or_create_tag("face", TagKind::Manual, None).await.unwrap();
    let resolver = AliasResolver::new(&store);

    let alias = resolver.create_tag_alias("  Visage ", face).await.unwrap();
    assert_eq!(alias.alias_name, "visage");

    for lookup in ["visage", "VISAGE", " Visage"] {
      let tag = resolver.get_tag_by_alias(lookup).await.unwrap().unwrap();
      assert_eq!(tag.tag_id, face);
    }
  }

  #[tokio::test]
  async fn alias_names_are_globally_unique() {
    let store = MemoryStore::default();
    let a = store.get_or_create_tag("bw", TagKind::Manual, None).await.unwrap();
    let b = store.get_or_create_tag("mono", TagKind::Manual, None).await.unwrap();
    let resolver = AliasResolver::new(&store);

    resolver.create_tag_alias("b&w", a).await.unwrap();
    let err = resolver.create_tag_alias(" B&W ", b).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
    let err = resolver.create_tag_alias("b&w", a).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
  }

  #[tokio::test]
  async fn many_aliases_for_one_tag() {
    let store = MemoryStore::default();
    let t = store.get_or_create_tag("black and white", TagKind::Manual, None).await.unwrap();
    let resolver = AliasResolver::new(&store);
    for name in ["b&w", "bw", "monochrome"] {
      resolver.create_tag_alias(name, t).await.unwrap();
    }
    assert_eq!(resolver.list_aliases(Some(t)).await.unwrap().len(), 3);
    assert_eq!(resolver.get_tag_by_alias("bw").await.unwrap().unwrap().tag_id, t);
  }

  #[tokio::test]
  async fn empty_alias_is_a_validation_error() {
    let store = MemoryStore::default();
    let t = store.get_or_create_tag("x", TagKind::Manual, None).await.unwrap();
    let err = AliasResolver::new(&store).create_tag_alias("   ", t).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn alias_to_missing_tag_is_rejected() {
    let store = MemoryStore::default();
    let err = AliasResolver::new(&store)
      .create_tag_alias("ghost", Uuid::new_v4())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::TagNotFound(_)));
  }

  #[tokio::test]
  async fn unknown_or_orphaned_alias_is_none() {
    let store = MemoryStore::default();
    let t = store.get_or_create_tag("temp", TagKind::Manual, None).await.unwrap();
    let resolver = AliasResolver::new(&store);
    assert!(resolver.get_tag_by_alias("nonexistent").await.unwrap().is_none());

    resolver.create_tag_alias("tmp", t).await.unwrap();
    store.delete_tag(t).await.unwrap();
    assert!(resolver.get_tag_by_alias("tmp").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn remove_alias_reports_existence() {
    let store = MemoryStore::default();
    let t = store.get_or_create_tag("sea", TagKind::Manual, None).await.unwrap();
    let resolver = AliasResolver::new(&store);
    resolver.create_tag_alias("mer", t).await.unwrap();

    assert!(resolver.remove_alias("MER").await.unwrap());
    assert!(!resolver.remove_alias("mer").await.unwrap());
    assert!(resolver.get_tag_by_alias("mer").await.unwrap().is_none());
  }
}
