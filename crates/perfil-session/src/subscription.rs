//! [`ProfileSubscription`] — one live uid-filtered query against the profile
//! collection, republished as reconciled snapshots.
//!
//! At most one subscription is open per instance. Opening while one is open
//! supersedes the old stream first; closing is idempotent and guarantees no
//! emission races past the call. Both are enforced with an epoch counter
//! checked under the same lock every emission takes, so superseded handles
//! are suppressed even if the underlying task has not been torn down yet.

use std::sync::{Arc, Mutex};

use perfil_core::{
  identity::{Identity, Uid},
  profile::Profile,
  store::ProfileStore,
};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::lock;

/// The reconciled view of a uid's document set: `None` until a document
/// exists (still loading or not yet created).
pub type ProfileView = Option<Profile>;

/// Buffered emissions per subscription. A listener this far behind observes
/// a lag error rather than silently dropped snapshots.
const EMISSION_BUFFER: usize = 64;

struct Gate {
  epoch: u64,
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Handle to an open subscription, returned by
/// [`ProfileSubscription::open`].
pub struct SubscriptionHandle {
  epoch:   u64,
  sender:  broadcast::Sender<ProfileView>,
  primary: Option<broadcast::Receiver<ProfileView>>,
}

impl SubscriptionHandle {
  /// The update stream. The first call returns the receiver created before
  /// the subscription task started, so the initial snapshot is never
  /// missed; later calls behave like [`SubscriptionHandle::subscribe`].
  pub fn updates(&mut self) -> broadcast::Receiver<ProfileView> {
    self.primary.take().unwrap_or_else(|| self.sender.subscribe())
  }

  /// An additional listener; observes only snapshots reconciled after this
  /// call.
  pub fn subscribe(&self) -> broadcast::Receiver<ProfileView> {
    self.sender.subscribe()
  }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// Owns the single live query for the current session's identity.
pub struct ProfileSubscription<S> {
  store: Arc<S>,
  gate:  Arc<Mutex<Gate>>,
  task:  Mutex<Option<JoinHandle<()>>>,
}

impl<S> ProfileSubscription<S>
where
  S: ProfileStore + 'static,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      gate: Arc::new(Mutex::new(Gate { epoch: 0 })),
      task: Mutex::new(None),
    }
  }

  /// Open a live subscription for `identity`. Any subscription already open
  /// is superseded first: its stream stops emitting before the new task
  /// starts.
  pub fn open(&self, identity: &Identity) -> SubscriptionHandle {
    let mut task = lock(&self.task);

    let epoch = {
      let mut gate = lock(&self.gate);
      gate.epoch += 1;
      gate.epoch
    };
    if let Some(old) = task.take() {
      old.abort();
    }

    let (sender, primary) = broadcast::channel(EMISSION_BUFFER);
    let uid = identity.uid.clone();
    tracing::debug!(%uid, epoch, "profile subscription opened");

    *task = Some(tokio::spawn(run(
      Arc::clone(&self.store),
      Arc::clone(&self.gate),
      epoch,
      uid,
      sender.clone(),
    )));

    SubscriptionHandle { epoch, sender, primary: Some(primary) }
  }

  /// Close a subscription. Idempotent; a handle already closed or
  /// superseded is a no-op. After this returns, the handle's stream emits
  /// nothing further.
  pub fn close(&self, handle: &SubscriptionHandle) {
    let mut task = lock(&self.task);

    {
      let mut gate = lock(&self.gate);
      if gate.epoch != handle.epoch {
        return;
      }
      gate.epoch += 1;
    }

    tracing::debug!(epoch = handle.epoch, "profile subscription closed");
    if let Some(old) = task.take() {
      old.abort();
    }
  }
}

impl<S> Drop for ProfileSubscription<S> {
  fn drop(&mut self) {
    if let Some(task) = lock(&self.task).take() {
      task.abort();
    }
  }
}

// ─── Subscription task ───────────────────────────────────────────────────────

async fn run<S: ProfileStore>(
  store: Arc<S>,
  gate: Arc<Mutex<Gate>>,
  epoch: u64,
  uid: Uid,
  sender: broadcast::Sender<ProfileView>,
) {
  // Subscribe to the change feed before the initial query so a write that
  // lands in between is not missed.
  let mut changes = store.changes();

  if !query_and_emit(&*store, &gate, epoch, &uid, &sender).await {
    return;
  }

  loop {
    match changes.recv().await {
      Ok(change) if change.uid == uid => {}
      Ok(_) => continue,
      Err(broadcast::error::RecvError::Lagged(missed)) => {
        tracing::debug!(%uid, missed, "change feed lagged; refreshing");
      }
      Err(broadcast::error::RecvError::Closed) => break,
    }

    if !query_and_emit(&*store, &gate, epoch, &uid, &sender).await {
      break;
    }
  }
}

/// Re-query the store and emit the reconciled view. Returns `false` once the
/// subscription has been superseded.
async fn query_and_emit<S: ProfileStore>(
  store: &S,
  gate: &Mutex<Gate>,
  epoch: u64,
  uid: &Uid,
  sender: &broadcast::Sender<ProfileView>,
) -> bool {
  match store.find_by_uid(uid).await {
    Ok(snapshot) => emit(gate, epoch, sender, reconcile(uid, snapshot)),
    Err(e) => {
      // Read-path failure: keep the subscription alive; the next change
      // triggers another attempt.
      tracing::warn!(%uid, error = %e, "profile snapshot query failed");
      true
    }
  }
}

fn emit(
  gate: &Mutex<Gate>,
  epoch: u64,
  sender: &broadcast::Sender<ProfileView>,
  view: ProfileView,
) -> bool {
  // The epoch is checked under the same lock `close` bumps it, so nothing
  // is emitted once `close` (or a superseding `open`) has returned.
  let gate = lock(gate);
  if gate.epoch != epoch {
    return false;
  }
  let _ = sender.send(view);
  true
}

/// Fold a snapshot into the single authoritative view. More than one
/// document per uid violates the design assumption; availability wins on
/// the read path: keep the first in snapshot order and log the anomaly.
pub(crate) fn reconcile(uid: &Uid, snapshot: Vec<Profile>) -> ProfileView {
  if snapshot.len() > 1 {
    tracing::warn!(
      %uid,
      count = snapshot.len(),
      "multiple profile documents for one uid; keeping the first"
    );
  }
  snapshot.into_iter().next()
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use perfil_core::profile::ProfileId;

  use super::*;

  fn profile(nombre: &str) -> Profile {
    Profile {
      id:              ProfileId::new(format!("id-{nombre}")),
      uid:             Uid::new("uid-1"),
      nombre:          nombre.into(),
      correo:          "a@b.com".into(),
      titulo:          "Ing.".into(),
      anio_graduacion: 2024,
      creado:          Utc::now(),
      activo:          true,
    }
  }

  #[test]
  fn empty_snapshot_reconciles_to_none() {
    assert_eq!(reconcile(&Uid::new("uid-1"), vec![]), None);
  }

  #[test]
  fn single_document_is_the_view() {
    let view = reconcile(&Uid::new("uid-1"), vec![profile("Ana")]);
    assert_eq!(view.unwrap().nombre, "Ana");
  }

  #[test]
  fn duplicate_documents_keep_the_first() {
    let view =
      reconcile(&Uid::new("uid-1"), vec![profile("First"), profile("Second")]);
    assert_eq!(view.unwrap().nombre, "First");
  }
}
