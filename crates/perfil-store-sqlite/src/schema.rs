//! SQL schema for the Perfil SQLite backend.
//!
//! Executed once at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`, so the store and the identity gateway can
//! each run it against the same file.

/// Full schema DDL.
///
/// Note: `profiles.uid` deliberately carries no UNIQUE constraint. The
/// one-document-per-uid rule is a documented assumption handled by
/// reconciliation on the read path, mirroring a document store that cannot
/// enforce it either.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS profiles (
    id              TEXT PRIMARY KEY,
    uid             TEXT NOT NULL,
    nombre          TEXT NOT NULL,
    correo          TEXT NOT NULL,
    titulo          TEXT NOT NULL,
    anio_graduacion INTEGER NOT NULL,
    creado          TEXT NOT NULL,   -- RFC 3339 UTC; set once at creation
    activo          INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS profiles_uid_idx ON profiles(uid);

CREATE TABLE IF NOT EXISTS accounts (
    uid           TEXT PRIMARY KEY,
    correo        TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,    -- argon2 PHC string
    created_at    TEXT NOT NULL
);

PRAGMA user_version = 1;
";
