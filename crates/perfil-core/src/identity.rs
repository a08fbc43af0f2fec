//! Identity — the authenticated subject produced by the identity service.
//!
//! An identity exists only while a session is signed in; it is never stored
//! alongside profile documents. The `uid` is the sole link between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, session-scoped subject id assigned by the identity service.
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
  pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Uid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// The authenticated subject. Carries only the stable `uid`; everything
/// meaningful about the person lives in their [`Profile`](crate::Profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub uid: Uid,
}
