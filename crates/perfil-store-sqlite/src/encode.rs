//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; ids as hyphenated lowercase
//! UUID strings; `activo` as an integer flag.

use chrono::{DateTime, Utc};
use perfil_core::{
  identity::Uid,
  profile::{Profile, ProfileId},
};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Row shape read back from the `profiles` table, before timestamp decoding.
pub struct RawProfile {
  pub id:              String,
  pub uid:             String,
  pub nombre:          String,
  pub correo:          String,
  pub titulo:          String,
  pub anio_graduacion: i32,
  pub creado:          String,
  pub activo:          bool,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      id:              ProfileId::new(self.id),
      uid:             Uid::new(self.uid),
      nombre:          self.nombre,
      correo:          self.correo,
      titulo:          self.titulo,
      anio_graduacion: self.anio_graduacion,
      creado:          decode_dt(&self.creado)?,
      activo:          self.activo,
    })
  }
}
