//! Behavioural tests for the session layer against the in-memory SQLite
//! backend: subscription lifecycle, coordinator transitions, and the full
//! registration round trip.

use std::{sync::Arc, time::Duration};

use perfil_core::{
  error::{AuthError, RepoError},
  gateway::IdentityGateway,
  identity::{Identity, Uid},
  profile::ProfileFields,
  store::ProfileStore,
};
use perfil_store_sqlite::{SqliteIdentityGateway, SqliteStore};
use tokio::{
  sync::{broadcast, watch},
  time::timeout,
};

use crate::{
  ProfileRepository, ProfileSubscription, ProfileView, SessionCoordinator,
  SessionState,
};

const WAIT: Duration = Duration::from_secs(2);
/// Long enough for a stray emission to surface, short enough to keep the
/// suite fast.
const QUIET: Duration = Duration::from_millis(150);

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

async fn gateway() -> Arc<SqliteIdentityGateway> {
  Arc::new(
    SqliteIdentityGateway::open_in_memory()
      .await
      .expect("in-memory gateway"),
  )
}

fn identity(uid: &str) -> Identity {
  Identity { uid: Uid::new(uid) }
}

fn fields(nombre: &str, anio: &str) -> ProfileFields {
  ProfileFields {
    nombre:          nombre.into(),
    correo:          "a@b.com".into(),
    titulo:          "Ing.".into(),
    anio_graduacion: anio.into(),
  }
}

async fn next(rx: &mut broadcast::Receiver<ProfileView>) -> ProfileView {
  timeout(WAIT, rx.recv())
    .await
    .expect("no emission within deadline")
    .expect("stream closed")
}

async fn assert_silent(rx: &mut broadcast::Receiver<ProfileView>) {
  // A closed channel is silence: closing a subscription drops every sender
  // clone, so the superseded receiver observes `Closed`, not data.
  match timeout(QUIET, rx.recv()).await {
    Err(_) | Ok(Err(broadcast::error::RecvError::Closed)) => {}
    Ok(result) => {
      panic!("unexpected emission on a closed or foreign stream: {result:?}")
    }
  }
}

async fn wait_for_state(
  rx: &mut watch::Receiver<SessionState>,
  want: SessionState,
) {
  timeout(WAIT, async {
    loop {
      if *rx.borrow_and_update() == want {
        return;
      }
      rx.changed().await.expect("state channel closed");
    }
  })
  .await
  .unwrap_or_else(|_| panic!("state never became {want:?}"));
}

// ─── Subscription lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn subscription_emits_none_before_a_profile_exists() {
  let store = store().await;
  let sub   = ProfileSubscription::new(Arc::clone(&store));

  let mut handle = sub.open(&identity("uid-1"));
  let mut rx     = handle.updates();

  assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn subscription_follows_create_update_delete() {
  let store = store().await;
  let sub   = ProfileSubscription::new(Arc::clone(&store));
  let repo  = ProfileRepository::new(Arc::clone(&store));
  let ident = identity("uid-1");

  let mut handle = sub.open(&ident);
  let mut rx     = handle.updates();
  assert_eq!(next(&mut rx).await, None);

  let id = repo.create(&ident, &fields("Ana", "2024")).await.unwrap();
  let view = next(&mut rx).await.expect("profile after create");
  assert_eq!(view.nombre, "Ana");
  assert_eq!(view.uid, ident.uid);

  repo.update(&id, &fields("Ana", "2025")).await.unwrap();
  let view = next(&mut rx).await.expect("profile after update");
  assert_eq!(view.anio_graduacion, 2025);
  assert_eq!(view.id, id);

  repo.delete(&id).await.unwrap();
  assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn close_suppresses_further_emissions() {
  let store = store().await;
  let sub   = ProfileSubscription::new(Arc::clone(&store));
  let repo  = ProfileRepository::new(Arc::clone(&store));
  let ident = identity("uid-1");

  let mut handle = sub.open(&ident);
  let mut rx     = handle.updates();
  assert_eq!(next(&mut rx).await, None);

  sub.close(&handle);
  sub.close(&handle); // idempotent

  repo.create(&ident, &fields("Ana", "2024")).await.unwrap();
  assert_silent(&mut rx).await;
}

#[tokio::test]
async fn reopen_supersedes_without_interleaving() {
  let store = store().await;
  let sub   = ProfileSubscription::new(Arc::clone(&store));
  let repo  = ProfileRepository::new(Arc::clone(&store));

  let first  = identity("uid-1");
  let second = identity("uid-2");

  let mut old_handle = sub.open(&first);
  let mut old_rx     = old_handle.updates();
  assert_eq!(next(&mut old_rx).await, None);

  // Identity switch without an explicit close.
  let mut new_handle = sub.open(&second);
  let mut new_rx     = new_handle.updates();
  assert_eq!(next(&mut new_rx).await, None);

  // A write for the first identity reaches neither stream: the old one is
  // superseded, the new one is filtered to the second uid.
  repo.create(&first, &fields("Ana", "2024")).await.unwrap();
  assert_silent(&mut old_rx).await;
  assert_silent(&mut new_rx).await;

  let mut f = fields("Benito", "2020");
  f.correo = "b@c.com".into();
  repo.create(&second, &f).await.unwrap();
  let view = next(&mut new_rx).await.expect("second identity's profile");
  assert_eq!(view.nombre, "Benito");
}

// ─── Repository rules ────────────────────────────────────────────────────────

#[tokio::test]
async fn validation_failure_never_reaches_the_store() {
  let store = store().await;
  let repo  = ProfileRepository::new(Arc::clone(&store));
  let ident = identity("uid-1");

  let mut feed = store.changes();

  let err = repo.create(&ident, &fields("Ana", "1899")).await.unwrap_err();
  assert!(matches!(err, RepoError::Invalid(_)));

  assert!(store.find_by_uid(&ident.uid).await.unwrap().is_empty());
  assert!(matches!(
    feed.try_recv(),
    Err(broadcast::error::TryRecvError::Empty)
  ));
}

#[tokio::test]
async fn second_create_for_a_uid_already_exists() {
  let store = store().await;
  let repo  = ProfileRepository::new(Arc::clone(&store));
  let ident = identity("uid-1");

  repo.create(&ident, &fields("Ana", "2024")).await.unwrap();
  let err = repo.create(&ident, &fields("Ana", "2024")).await.unwrap_err();
  assert!(matches!(err, RepoError::AlreadyExists(_)));
}

#[tokio::test]
async fn delete_then_update_is_not_found() {
  let store = store().await;
  let repo  = ProfileRepository::new(Arc::clone(&store));
  let ident = identity("uid-1");

  let id = repo.create(&ident, &fields("Ana", "2024")).await.unwrap();
  repo.delete(&id).await.unwrap();

  assert!(matches!(
    repo.update(&id, &fields("Ana", "2025")).await.unwrap_err(),
    RepoError::NotFound(_)
  ));
  assert!(matches!(
    repo.delete(&id).await.unwrap_err(),
    RepoError::NotFound(_)
  ));
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_sign_out_cycle() {
  let gateway = gateway().await;
  let store   = store().await;
  let coord   = SessionCoordinator::new(gateway, Arc::clone(&store));
  let repo    = ProfileRepository::new(Arc::clone(&store));

  let mut state = coord.state();
  assert_eq!(*state.borrow(), SessionState::SignedOut);

  let ident = coord.sign_up("a@b.com", "pw123456").await.unwrap();
  wait_for_state(&mut state, SessionState::SignedIn(ident.clone())).await;

  let mut rx = coord.profile_updates().expect("signed in");
  assert_eq!(next(&mut rx).await, None);

  repo.create(&ident, &fields("Ana", "2024")).await.unwrap();
  assert_eq!(next(&mut rx).await.unwrap().nombre, "Ana");

  coord.sign_out().await.unwrap();
  wait_for_state(&mut state, SessionState::SignedOut).await;
  assert!(coord.profile_updates().is_none());

  // The closed stream stays quiet even when the document changes again.
  store
    .delete(&store.find_by_uid(&ident.uid).await.unwrap()[0].id)
    .await
    .unwrap();
  assert_silent(&mut rx).await;
}

#[tokio::test]
async fn failed_sign_in_surfaces_error_until_acknowledged() {
  let coord = SessionCoordinator::new(gateway().await, store().await);

  let err = coord.sign_in("nobody@b.com", "pw").await.unwrap_err();
  assert_eq!(err, AuthError::InvalidCredentials);

  let mut state = coord.state();
  assert_eq!(
    *state.borrow(),
    SessionState::Error(AuthError::InvalidCredentials)
  );

  coord.acknowledge_error();
  wait_for_state(&mut state, SessionState::SignedOut).await;
}

#[tokio::test]
async fn external_expiry_forces_sign_out() {
  let gateway = gateway().await;
  let coord   = SessionCoordinator::new(Arc::clone(&gateway), store().await);

  let ident = coord.sign_up("a@b.com", "pw123456").await.unwrap();
  let mut state = coord.state();
  wait_for_state(&mut state, SessionState::SignedIn(ident)).await;
  let mut rx = coord.profile_updates().expect("signed in");
  assert_eq!(next(&mut rx).await, None);

  // The identity service ends the session out-of-band.
  gateway.sign_out().await.unwrap();

  wait_for_state(&mut state, SessionState::SignedOut).await;
  assert_silent(&mut rx).await;
}

#[tokio::test]
async fn external_sign_in_restores_the_session() {
  let gateway = gateway().await;
  let coord   = SessionCoordinator::new(Arc::clone(&gateway), store().await);

  let mut state = coord.state();
  assert_eq!(*state.borrow(), SessionState::SignedOut);
  assert!(coord.profile_updates().is_none());

  // The identity service delivers a session the coordinator did not start;
  // the coordinator follows it into SignedIn and opens a subscription.
  let ident = gateway.sign_up("a@b.com", "pw123456").await.unwrap();
  wait_for_state(&mut state, SessionState::SignedIn(ident)).await;

  let mut rx = coord.profile_updates().expect("restored session");
  assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn identity_switch_reopens_for_the_new_uid() {
  let gateway = gateway().await;
  let store   = store().await;
  let coord   =
    SessionCoordinator::new(Arc::clone(&gateway), Arc::clone(&store));
  let repo    = ProfileRepository::new(Arc::clone(&store));

  let first = coord.sign_up("a@b.com", "pw123456").await.unwrap();
  let mut state = coord.state();
  wait_for_state(&mut state, SessionState::SignedIn(first.clone())).await;

  let mut first_rx = coord.profile_updates().expect("signed in");
  assert_eq!(next(&mut first_rx).await, None);
  let id = repo.create(&first, &fields("Ana", "2024")).await.unwrap();
  assert_eq!(next(&mut first_rx).await.unwrap().nombre, "Ana");

  // The identity service switches accounts out-of-band.
  let second = gateway.sign_up("b@c.com", "pw123456").await.unwrap();
  assert_ne!(second.uid, first.uid);
  wait_for_state(&mut state, SessionState::SignedIn(second.clone())).await;

  let mut second_rx = coord.profile_updates().expect("still signed in");
  assert_eq!(next(&mut second_rx).await, None);

  // A write for the first identity reaches neither the superseded stream
  // nor the new uid-filtered one.
  repo.update(&id, &fields("Ana", "2025")).await.unwrap();
  assert_silent(&mut first_rx).await;
  assert_silent(&mut second_rx).await;

  let mut f = fields("Benito", "2020");
  f.correo = "b@c.com".into();
  repo.create(&second, &f).await.unwrap();
  assert_eq!(next(&mut second_rx).await.unwrap().nombre, "Benito");
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_round_trip() {
  let gateway = gateway().await;
  let store   = store().await;
  let coord   = SessionCoordinator::new(gateway, Arc::clone(&store));
  let repo    = ProfileRepository::new(Arc::clone(&store));

  // Sign up, then create the profile — two steps, not a transaction.
  let ident = coord.sign_up("a@b.com", "pw123456").await.unwrap();
  let mut rx = coord.profile_updates().expect("signed in");
  assert_eq!(next(&mut rx).await, None, "no profile document yet");

  let id = repo.create(&ident, &fields("Ana", "2024")).await.unwrap();

  let created = next(&mut rx).await.expect("profile appears");
  assert_eq!(created.nombre, "Ana");
  assert_eq!(created.anio_graduacion, 2024);
  assert_eq!(created.uid, ident.uid);
  assert!(created.activo);

  repo.update(&id, &fields("Ana", "2025")).await.unwrap();
  let updated = next(&mut rx).await.expect("profile after update");
  assert_eq!(updated.anio_graduacion, 2025);
  assert_eq!(updated.uid, created.uid);
  assert_eq!(updated.id, created.id);
  assert_eq!(updated.creado, created.creado);

  repo.delete(&id).await.unwrap();
  assert_eq!(next(&mut rx).await, None, "profile gone after delete");
}
