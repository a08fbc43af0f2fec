//! The `ProfileStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `perfil-store-sqlite`).
//! Higher layers (`perfil-session`) depend on this abstraction, not on any
//! concrete backend. The core issues only four primitives against the
//! profile collection: filtered query by uid, create, update-by-id,
//! delete-by-id — plus the store's own push channel.

use std::future::Future;

use tokio::sync::broadcast;

use crate::{
  error::RepoError,
  identity::Uid,
  profile::{NewProfile, Profile, ProfileChange, ProfileId, ProfileValues},
};

/// Abstraction over the remote document collection holding profiles.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + Into<RepoError> + Send + Sync + 'static;

  /// Equality-filtered query: every document whose `uid` matches, in the
  /// store's snapshot order. More than one result violates the
  /// one-document-per-uid assumption; callers reconcile defensively.
  fn find_by_uid<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + 'a;

  /// Persist a new document and return its store-assigned id.
  fn insert(
    &self,
    profile: NewProfile,
  ) -> impl Future<Output = Result<ProfileId, Self::Error>> + Send + '_;

  /// Rewrite only the editable fields of an existing document. `uid`, the
  /// document id and `creado` are never touched. Fails if the document no
  /// longer exists.
  fn update_fields<'a>(
    &'a self,
    id: &'a ProfileId,
    values: &'a ProfileValues,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a document by id. Fails if it no longer exists.
  fn delete<'a>(
    &'a self,
    id: &'a ProfileId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The store's push mechanism: one [`ProfileChange`] per accepted
  /// mutation, delivered after the write is durable. Receivers that fall
  /// behind observe a lag error, not silently dropped events.
  fn changes(&self) -> broadcast::Receiver<ProfileChange>;
}
