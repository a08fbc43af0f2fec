//! Profile — the single mutable record per identity.
//!
//! Serde renames keep the serialized shape identical to the document stored
//! in the remote collection (`anioGraduacion`, not `anio_graduacion`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Uid;

/// Store-assigned document identifier, opaque to the core.
/// Assigned at creation, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
  pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProfileId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// The one editable record describing a person, keyed by `uid`.
///
/// `id`, `uid` and `creado` are set once at creation and never rewritten.
/// At most one profile document exists per `uid` — a design assumption, not
/// a store-level constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub id:              ProfileId,
  pub uid:             Uid,
  pub nombre:          String,
  pub correo:          String,
  pub titulo:          String,
  #[serde(rename = "anioGraduacion")]
  pub anio_graduacion: i32,
  pub creado:          DateTime<Utc>,
  /// Always `true` in current scope; no soft-delete workflow is exercised.
  pub activo:          bool,
}

// ─── Form input ──────────────────────────────────────────────────────────────

/// Raw, unvalidated edit form — exactly what a form submits, all strings.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
  pub nombre:          String,
  pub correo:          String,
  pub titulo:          String,
  /// Year as typed; parsed and range-checked by the validator.
  pub anio_graduacion: String,
}

/// Raw registration form: the profile fields plus the password consumed by
/// the identity service during sign-up.
#[derive(Debug, Clone, Default)]
pub struct RegistrationFields {
  pub contrasena: String,
  pub profile:    ProfileFields,
}

// ─── Validated values ────────────────────────────────────────────────────────

/// The validated editable field set — output of the validator, input to the
/// store's update primitive. Never carries `uid`, `id` or `creado`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileValues {
  pub nombre:          String,
  pub correo:          String,
  pub titulo:          String,
  pub anio_graduacion: i32,
}

/// Input to [`ProfileStore::insert`](crate::store::ProfileStore::insert).
/// The document id is always assigned by the store; it is not accepted from
/// callers.
#[derive(Debug, Clone)]
pub struct NewProfile {
  pub uid:    Uid,
  pub values: ProfileValues,
  pub creado: DateTime<Utc>,
  pub activo: bool,
}

// ─── Change feed ─────────────────────────────────────────────────────────────

/// The kind of mutation a store announced on its push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
  Created,
  Updated,
  Deleted,
}

/// Payload of the store's push channel: which uid's document set changed.
/// Subscribers re-query and reconcile; the change itself carries no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChange {
  pub uid: Uid,
  pub op:  ChangeOp,
}
