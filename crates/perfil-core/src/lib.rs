//! Core types and trait definitions for the Perfil profile-sync engine.
//!
//! This crate is deliberately free of database and I/O dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod clock;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod profile;
pub mod store;
pub mod validate;

pub use error::{AuthError, RepoError, ValidationError};
pub use identity::{Identity, Uid};
pub use profile::{Profile, ProfileId};
