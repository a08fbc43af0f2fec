//! [`SqliteIdentityGateway`] — a local identity service.
//!
//! Stands in for the remote identity collaborator: accounts live in the
//! `accounts` table with argon2 PHC password hashes, and identity changes
//! are pushed through a watch channel so the session layer observes
//! sign-in/sign-out exactly as it would from a remote push channel.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use chrono::Utc;
use perfil_core::{
  error::AuthError,
  gateway::IdentityGateway,
  identity::{Identity, Uid},
};
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{Result, encode::encode_dt, schema::SCHEMA};

/// A single-session identity service backed by the same SQLite file as the
/// profile store.
///
/// Cloning is cheap; clones share the session, so a sign-out through one
/// clone is observed by every subscriber.
#[derive(Clone)]
pub struct SqliteIdentityGateway {
  conn:     tokio_rusqlite::Connection,
  identity: watch::Sender<Option<Identity>>,
}

impl SqliteIdentityGateway {
  /// Open (or create) the account database at `path`.
  pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_conn(conn).await
  }

  /// Open an in-memory account database — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_conn(conn).await
  }

  async fn with_conn(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    let (identity, _) = watch::channel(None);
    Ok(Self { conn, identity })
  }
}

fn db_err(e: tokio_rusqlite::Error) -> AuthError {
  AuthError::Unknown(e.to_string())
}

fn is_unique_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

impl IdentityGateway for SqliteIdentityGateway {
  async fn sign_in(
    &self,
    correo: &str,
    contrasena: &str,
  ) -> Result<Identity, AuthError> {
    let correo_owned = correo.to_owned();

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uid, password_hash FROM accounts WHERE correo = ?1",
              rusqlite::params![correo_owned],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    // Unknown email and wrong password are indistinguishable to the caller.
    let (uid, hash) = row.ok_or(AuthError::InvalidCredentials)?;

    let parsed = PasswordHash::new(&hash)
      .map_err(|e| AuthError::Unknown(e.to_string()))?;
    Argon2::default()
      .verify_password(contrasena.as_bytes(), &parsed)
      .map_err(|_| AuthError::InvalidCredentials)?;

    let identity = Identity { uid: Uid::new(uid) };
    tracing::debug!(uid = %identity.uid, "signed in");
    self.identity.send_replace(Some(identity.clone()));
    Ok(identity)
  }

  async fn sign_up(
    &self,
    correo: &str,
    contrasena: &str,
  ) -> Result<Identity, AuthError> {
    let uid = Uid::new(Uuid::new_v4().hyphenated().to_string());

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(contrasena.as_bytes(), &salt)
      .map_err(|e| AuthError::Unknown(e.to_string()))?
      .to_string();

    let uid_str      = uid.as_str().to_owned();
    let correo_owned = correo.to_owned();
    let created_at   = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts (uid, correo, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![uid_str, correo_owned, hash, created_at],
        )?;
        Ok(())
      })
      .await;

    match inserted {
      Ok(()) => {}
      Err(e) if is_unique_violation(&e) => {
        tracing::warn!(correo, "sign-up rejected; email already in use");
        return Err(AuthError::EmailInUse(correo.to_owned()));
      }
      Err(e) => return Err(db_err(e)),
    }

    let identity = Identity { uid };
    tracing::info!(uid = %identity.uid, "account created");
    self.identity.send_replace(Some(identity.clone()));
    Ok(identity)
  }

  async fn sign_out(&self) -> Result<(), AuthError> {
    tracing::debug!("signed out");
    self.identity.send_replace(None);
    Ok(())
  }

  fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
    self.identity.subscribe()
  }
}
