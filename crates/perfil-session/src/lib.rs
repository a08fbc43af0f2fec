//! The session-bound profile synchronization and mutation layer.
//!
//! Binds identity-change events from an [`IdentityGateway`] to the lifecycle
//! of a live profile subscription, reconciles store snapshots into a single
//! authoritative view, and performs validated mutations. The UI layer is an
//! external collaborator: it renders whatever this crate exposes and
//! forwards user intents into it.
//!
//! [`IdentityGateway`]: perfil_core::gateway::IdentityGateway

pub mod coordinator;
pub mod repository;
pub mod subscription;

pub use coordinator::{SessionCoordinator, SessionState};
pub use repository::ProfileRepository;
pub use subscription::{ProfileSubscription, ProfileView, SubscriptionHandle};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a panicking holder poisoned it.
/// Critical sections here never leave state half-written.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests;
