//! Error type for `perfil-store-sqlite`.

use perfil_core::{RepoError, profile::ProfileId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to update or delete a document that was not found.
  #[error("profile not found: {0}")]
  ProfileNotFound(ProfileId),
}

/// Map the backend error into the core taxonomy at the trait boundary.
/// SQLite has no network failure mode, so everything that is not a typed
/// not-found collapses into `Unknown`.
impl From<Error> for RepoError {
  fn from(e: Error) -> Self {
    match e {
      Error::ProfileNotFound(id) => RepoError::NotFound(id),
      other => RepoError::Unknown(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
