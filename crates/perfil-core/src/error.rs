//! Error taxonomy shared across the workspace.
//!
//! Three families, one per boundary: `AuthError` for the identity service,
//! `ValidationError` for synchronous field checks, `RepoError` for profile
//! mutations. Variants are cloneable so they can travel through watch
//! channels as part of session state.

use thiserror::Error;

use crate::{identity::Uid, profile::ProfileId};

// ─── Identity service ────────────────────────────────────────────────────────

/// Errors surfaced by the identity service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("email already in use: {0}")]
  EmailInUse(String),

  #[error("network error: {0}")]
  Network(String),

  #[error("identity service error: {0}")]
  Unknown(String),
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// A field-level validation failure. Returned synchronously; a mutation that
/// fails validation never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
  /// The offending field, named as in the document shape.
  pub field:  &'static str,
  pub reason: String,
}

impl ValidationError {
  pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
    Self { field, reason: reason.into() }
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

/// Errors surfaced by profile mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
  /// The mutation was rejected before reaching the store.
  #[error(transparent)]
  Invalid(#[from] ValidationError),

  /// The document no longer exists (e.g. concurrently deleted).
  #[error("profile not found: {0}")]
  NotFound(ProfileId),

  /// A prior document for this uid was detected by the best-effort
  /// existence check. Not a transactional guarantee.
  #[error("a profile already exists for uid {0}")]
  AlreadyExists(Uid),

  #[error("network error: {0}")]
  Network(String),

  #[error("store error: {0}")]
  Unknown(String),
}
