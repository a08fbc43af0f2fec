//! [`ProfileRepository`] — validated create/update/delete against the
//! profile collection.
//!
//! Validation failures never reach the store. Mutations are fire-and-forget
//! relative to the live subscription: success means the store accepted the
//! write durably, not that the next emission already reflects it — the
//! subscription observes the change through the store's own push channel.

use std::sync::Arc;

use perfil_core::{
  clock::{Clock, SystemClock},
  error::RepoError,
  identity::Identity,
  profile::{NewProfile, ProfileFields, ProfileId},
  store::ProfileStore,
  validate::validate_profile_edit,
};

pub struct ProfileRepository<S, C = SystemClock> {
  store: Arc<S>,
  clock: C,
}

impl<S: ProfileStore> ProfileRepository<S> {
  pub fn new(store: Arc<S>) -> Self { Self::with_clock(store, SystemClock) }
}

impl<S: ProfileStore, C: Clock> ProfileRepository<S, C> {
  pub fn with_clock(store: Arc<S>, clock: C) -> Self { Self { store, clock } }

  /// Create the profile document for a freshly signed-up identity.
  ///
  /// The password was already consumed by the identity service, so the
  /// registration rules apply minus `contrasena`. The uniqueness check is
  /// best-effort, not a transactional guarantee.
  pub async fn create(
    &self,
    identity: &Identity,
    fields: &ProfileFields,
  ) -> Result<ProfileId, RepoError> {
    let values = validate_profile_edit(fields, self.clock.current_year())?;

    let existing = self
      .store
      .find_by_uid(&identity.uid)
      .await
      .map_err(Into::into)?;
    if !existing.is_empty() {
      return Err(RepoError::AlreadyExists(identity.uid.clone()));
    }

    let id = self
      .store
      .insert(NewProfile {
        uid:    identity.uid.clone(),
        values,
        creado: self.clock.now(),
        activo: true,
      })
      .await
      .map_err(Into::into)?;

    tracing::info!(uid = %identity.uid, %id, "profile created");
    Ok(id)
  }

  /// Rewrite the editable fields of an existing profile. `uid`, the
  /// document id and `creado` are never touched.
  pub async fn update(
    &self,
    id: &ProfileId,
    fields: &ProfileFields,
  ) -> Result<(), RepoError> {
    let values = validate_profile_edit(fields, self.clock.current_year())?;

    self
      .store
      .update_fields(id, &values)
      .await
      .map_err(Into::into)?;

    tracing::info!(%id, "profile updated");
    Ok(())
  }

  /// Delete a profile by id. Does not destroy the owning identity.
  pub async fn delete(&self, id: &ProfileId) -> Result<(), RepoError> {
    self.store.delete(id).await.map_err(Into::into)?;
    tracing::info!(%id, "profile deleted");
    Ok(())
  }
}
