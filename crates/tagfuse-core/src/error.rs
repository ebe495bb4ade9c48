//! Error types for `tagfuse-core`.

use thiserror::Error;

use crate::tag::TagId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation error: {0}")]
  Validation(String),

  #[error("already exists: {0}")]
  AlreadyExists(String),

  #[error("tag not found: {0}")]
  TagNotFound(TagId),

  /// An opaque failure reported by the [`TagStore`](crate::store::TagStore).
  /// The backend's own error is kept as the source.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
