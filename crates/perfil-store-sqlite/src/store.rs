//! [`SqliteStore`] — the SQLite implementation of [`ProfileStore`].

use std::path::Path;

use perfil_core::{
  identity::Uid,
  profile::{ChangeOp, NewProfile, Profile, ProfileChange, ProfileId, ProfileValues},
  store::ProfileStore,
};
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawProfile, encode_dt},
  schema::SCHEMA,
};

/// Capacity of the change feed. A subscriber that falls further behind than
/// this observes a lag error and re-queries instead of losing events
/// silently.
const CHANGE_FEED_CAPACITY: usize = 64;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A profile collection backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and clones
/// share one change feed.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  changes: broadcast::Sender<ProfileChange>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_conn(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_conn(conn).await
  }

  async fn with_conn(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
    let store = Self { conn, changes };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Announce a durable mutation on the change feed.
  fn publish(&self, uid: Uid, op: ChangeOp) {
    tracing::debug!(%uid, ?op, "profile change published");
    // No live subscribers is fine.
    let _ = self.changes.send(ProfileChange { uid, op });
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  async fn find_by_uid(&self, uid: &Uid) -> Result<Vec<Profile>> {
    let uid_str = uid.as_str().to_owned();

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, uid, nombre, correo, titulo, anio_graduacion,
                  creado, activo
           FROM profiles
           WHERE uid = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![uid_str], |row| {
            Ok(RawProfile {
              id:              row.get(0)?,
              uid:             row.get(1)?,
              nombre:          row.get(2)?,
              correo:          row.get(3)?,
              titulo:          row.get(4)?,
              anio_graduacion: row.get(5)?,
              creado:          row.get(6)?,
              activo:          row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn insert(&self, profile: NewProfile) -> Result<ProfileId> {
    let NewProfile { uid, values, creado, activo } = profile;

    let id = ProfileId::new(Uuid::new_v4().hyphenated().to_string());

    let id_str     = id.as_str().to_owned();
    let uid_str    = uid.as_str().to_owned();
    let creado_str = encode_dt(creado);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (
             id, uid, nombre, correo, titulo, anio_graduacion, creado, activo
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            uid_str,
            values.nombre,
            values.correo,
            values.titulo,
            values.anio_graduacion,
            creado_str,
            activo,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.publish(uid, ChangeOp::Created);
    Ok(id)
  }

  async fn update_fields(
    &self,
    id: &ProfileId,
    values: &ProfileValues,
  ) -> Result<()> {
    let id_str = id.as_str().to_owned();
    let v      = values.clone();

    // Look up the owning uid first; the change feed needs it and a missing
    // row is the typed not-found case.
    let uid: Option<String> = self
      .conn
      .call(move |conn| {
        let uid: Option<String> = conn
          .query_row(
            "SELECT uid FROM profiles WHERE id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;

        if uid.is_none() {
          return Ok(None);
        }

        conn.execute(
          "UPDATE profiles
           SET nombre = ?1, correo = ?2, titulo = ?3, anio_graduacion = ?4
           WHERE id = ?5",
          rusqlite::params![
            v.nombre,
            v.correo,
            v.titulo,
            v.anio_graduacion,
            id_str,
          ],
        )?;
        Ok(uid)
      })
      .await?;

    match uid {
      Some(uid) => {
        self.publish(Uid::new(uid), ChangeOp::Updated);
        Ok(())
      }
      None => Err(Error::ProfileNotFound(id.clone())),
    }
  }

  async fn delete(&self, id: &ProfileId) -> Result<()> {
    let id_str = id.as_str().to_owned();

    let uid: Option<String> = self
      .conn
      .call(move |conn| {
        let uid: Option<String> = conn
          .query_row(
            "SELECT uid FROM profiles WHERE id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;

        if uid.is_none() {
          return Ok(None);
        }

        conn.execute(
          "DELETE FROM profiles WHERE id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(uid)
      })
      .await?;

    match uid {
      Some(uid) => {
        self.publish(Uid::new(uid), ChangeOp::Deleted);
        Ok(())
      }
      None => Err(Error::ProfileNotFound(id.clone())),
    }
  }

  fn changes(&self) -> broadcast::Receiver<ProfileChange> {
    self.changes.subscribe()
  }
}
