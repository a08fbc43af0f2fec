//! [`SessionCoordinator`] — the top-level session state machine.
//!
//! Binds identity-change events from the gateway to the lifecycle of the
//! profile subscription, and owns the single source of truth for what the
//! UI should show. There is no global "current user": session state flows
//! through this coordinator explicitly.
//!
//! Transitions:
//!
//! ```text
//! SignedOut --sign_in/sign_up--> Authenticating
//! Authenticating --success-----> SignedIn      (subscription opens)
//! Authenticating --failure-----> Error         (acknowledge -> SignedOut)
//! SignedIn  --sign_out---------> SignedOut     (subscription closes first)
//! SignedIn  --gateway: none----> SignedOut     (external expiry)
//! ```

use std::sync::{Arc, Mutex};

use perfil_core::{
  error::AuthError,
  gateway::IdentityGateway,
  identity::Identity,
  store::ProfileStore,
};
use tokio::{
  sync::{broadcast, watch},
  task::JoinHandle,
};

use crate::{
  lock,
  subscription::{ProfileSubscription, ProfileView, SubscriptionHandle},
};

/// What the UI should show right now.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
  SignedOut,
  Authenticating,
  SignedIn(Identity),
  Error(AuthError),
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// Sole owner of the active subscription handle. One logical session per
/// instance; there is no terminal state.
pub struct SessionCoordinator<G, S> {
  inner:   Arc<Inner<G, S>>,
  watcher: JoinHandle<()>,
}

struct Inner<G, S> {
  gateway:      Arc<G>,
  subscription: ProfileSubscription<S>,
  state:        watch::Sender<SessionState>,
  active:       Mutex<Option<SubscriptionHandle>>,
}

impl<G, S> SessionCoordinator<G, S>
where
  G: IdentityGateway + 'static,
  S: ProfileStore + 'static,
{
  pub fn new(gateway: Arc<G>, store: Arc<S>) -> Self {
    let (state, _) = watch::channel(SessionState::SignedOut);

    let inner = Arc::new(Inner {
      gateway: Arc::clone(&gateway),
      subscription: ProfileSubscription::new(store),
      state,
      active: Mutex::new(None),
    });

    // Follow the gateway's push channel; the initial delivery resolves the
    // starting state, later ones cover externally-triggered expiry and
    // restore.
    let watcher = tokio::spawn(watch_identity(gateway, Arc::clone(&inner)));

    Self { inner, watcher }
  }

  /// Current session state as an observable value.
  pub fn state(&self) -> watch::Receiver<SessionState> {
    self.inner.state.subscribe()
  }

  /// The active subscription's update stream, if signed in.
  pub fn profile_updates(&self) -> Option<broadcast::Receiver<ProfileView>> {
    lock(&self.inner.active).as_mut().map(SubscriptionHandle::updates)
  }

  pub async fn sign_in(
    &self,
    correo: &str,
    contrasena: &str,
  ) -> Result<Identity, AuthError> {
    self.inner.state.send_replace(SessionState::Authenticating);
    match self.inner.gateway.sign_in(correo, contrasena).await {
      Ok(identity) => {
        self.inner.complete_authentication(identity.clone());
        Ok(identity)
      }
      Err(e) => {
        self.inner.state.send_replace(SessionState::Error(e.clone()));
        Err(e)
      }
    }
  }

  pub async fn sign_up(
    &self,
    correo: &str,
    contrasena: &str,
  ) -> Result<Identity, AuthError> {
    self.inner.state.send_replace(SessionState::Authenticating);
    match self.inner.gateway.sign_up(correo, contrasena).await {
      Ok(identity) => {
        self.inner.complete_authentication(identity.clone());
        Ok(identity)
      }
      Err(e) => {
        self.inner.state.send_replace(SessionState::Error(e.clone()));
        Err(e)
      }
    }
  }

  /// Tear down the session. The subscription closes before the transition
  /// completes, so no stale profile emission can follow the sign-out. Local
  /// teardown proceeds even when the remote sign-out fails; the error is
  /// still surfaced.
  pub async fn sign_out(&self) -> Result<(), AuthError> {
    self.inner.close_active();
    let result = self.inner.gateway.sign_out().await;
    self.inner.state.send_replace(SessionState::SignedOut);
    if let Err(e) = &result {
      tracing::warn!(error = %e, "remote sign-out failed; session closed locally");
    }
    result
  }

  /// Acknowledge a surfaced authentication error, returning to `SignedOut`.
  pub fn acknowledge_error(&self) {
    let is_error =
      matches!(&*self.inner.state.borrow(), SessionState::Error(_));
    if is_error {
      self.inner.state.send_replace(SessionState::SignedOut);
    }
  }
}

impl<G, S> Drop for SessionCoordinator<G, S> {
  fn drop(&mut self) { self.watcher.abort(); }
}

// ─── Identity watcher ────────────────────────────────────────────────────────

async fn watch_identity<G, S>(gateway: Arc<G>, inner: Arc<Inner<G, S>>)
where
  G: IdentityGateway + 'static,
  S: ProfileStore + 'static,
{
  let mut rx = gateway.identity_changes();
  loop {
    let current = rx.borrow_and_update().clone();
    inner.apply_identity(current);
    if rx.changed().await.is_err() {
      break;
    }
  }
}

impl<G, S> Inner<G, S>
where
  G: IdentityGateway + 'static,
  S: ProfileStore + 'static,
{
  fn complete_authentication(&self, identity: Identity) {
    self.open_for(&identity);
    self.state.send_replace(SessionState::SignedIn(identity));
  }

  /// React to a gateway identity delivery.
  fn apply_identity(&self, identity: Option<Identity>) {
    let current = self.state.borrow().clone();
    match (current, identity) {
      (SessionState::SignedIn(_), None) => {
        tracing::info!("session expired externally; signing out");
        self.close_active();
        self.state.send_replace(SessionState::SignedOut);
      }
      (SessionState::SignedIn(old), Some(new)) if old.uid != new.uid => {
        // Identity switch: the old stream stops emitting before the new
        // one starts.
        tracing::info!(uid = %new.uid, "identity switched");
        self.close_active();
        self.complete_authentication(new);
      }
      (SessionState::SignedOut, Some(identity)) => {
        tracing::info!(uid = %identity.uid, "session restored externally");
        self.complete_authentication(identity);
      }
      // Authenticating: the in-flight sign-in/sign-up call finalises its
      // own transition. Error: held until acknowledged.
      _ => {}
    }
  }

  fn open_for(&self, identity: &Identity) {
    let handle = self.subscription.open(identity);
    *lock(&self.active) = Some(handle);
  }

  fn close_active(&self) {
    if let Some(handle) = lock(&self.active).take() {
      self.subscription.close(&handle);
    }
  }
}
