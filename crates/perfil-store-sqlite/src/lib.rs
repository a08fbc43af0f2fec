//! SQLite backend for the Perfil profile store and local identity service.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Mutations are announced on a
//! broadcast channel, which is what drives live profile subscriptions.

mod encode;
mod gateway;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use gateway::SqliteIdentityGateway;
pub use store::SqliteStore;
