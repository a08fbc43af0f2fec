//! The `IdentityGateway` trait — the identity-service boundary.
//!
//! The core consumes sign-in/sign-up/sign-out plus a push channel that
//! delivers the current identity (or `None`) whenever the signed-in state
//! changes, including at initial subscription. The wire protocol behind it
//! is the collaborator's own concern.

use std::future::Future;

use tokio::sync::watch;

use crate::{error::AuthError, identity::Identity};

/// Abstraction over a remote identity service.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait IdentityGateway: Send + Sync {
  /// Authenticate an existing account.
  fn sign_in<'a>(
    &'a self,
    correo: &'a str,
    contrasena: &'a str,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  /// Create a new account and sign it in.
  fn sign_up<'a>(
    &'a self,
    correo: &'a str,
    contrasena: &'a str,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  /// End the current session. Destroys no profile data.
  fn sign_out(
    &self,
  ) -> impl Future<Output = Result<(), AuthError>> + Send + '_;

  /// Identity-change notifications. A watch channel holds the current value,
  /// so new subscribers observe the present signed-in state immediately.
  fn identity_changes(&self) -> watch::Receiver<Option<Identity>>;
}
