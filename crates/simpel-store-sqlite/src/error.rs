//! Error type for `simpel-store-sqlite`.

use simpel_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A business rule refused the operation. Nothing was written.
  #[error(transparent)]
  Domain(#[from] simpel_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored value could not be decoded into its domain type.
  #[error("corrupt column value: {0}")]
  Corrupt(String),
}

impl StoreError for Error {
  fn domain(&self) -> Option<&simpel_core::Error> {
    match self {
      Self::Domain(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
