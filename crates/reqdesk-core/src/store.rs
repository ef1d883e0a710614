//! The `RequestStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `reqdesk-store-sqlite`).
//! The engine and the front ends depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  request::{NewRequest, Request, RequestId, Status},
  user::{ActorIdentity, User, UserId},
};

/// Abstraction over a reqdesk storage backend.
///
/// Every write is a single atomic statement (or one transaction for the
/// batch delete). Status-changing writes are compare-and-swap on the status
/// the caller last observed, so a transition that lost a race is reported as
/// `false` instead of silently overwriting the winner.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RequestStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Return the user for `identity`, creating a non-admin record on first
  /// contact.
  fn ensure_user(
    &self,
    identity: ActorIdentity,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn find_user(
    &self,
    external_id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Set the admin flag, creating the user if needed. A supplied handle
  /// replaces the stored one.
  fn grant_admin(
    &self,
    identity: ActorIdentity,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Clear the admin flag. Returns `None` if no such user exists.
  fn revoke_admin(
    &self,
    external_id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_admins(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Requests ──────────────────────────────────────────────────────────

  /// Persist a new request in [`Status::New`]. Timestamps are set by the
  /// store.
  fn insert_request(
    &self,
    creator: UserId,
    input: NewRequest,
  ) -> impl Future<Output = Result<Request, Self::Error>> + Send + '_;

  fn get_request(
    &self,
    id: RequestId,
  ) -> impl Future<Output = Result<Option<Request>, Self::Error>> + Send + '_;

  /// All non-deleted requests whose status is one of `statuses`, in id order.
  fn list_by_status<'a>(
    &'a self,
    statuses: &'a [Status],
  ) -> impl Future<Output = Result<Vec<Request>, Self::Error>> + Send + 'a;

  /// Every completed or cancelled request, soft-deleted rows included, in
  /// id order.
  fn list_finished_all(&self) -> impl Future<Output = Result<Vec<Request>, Self::Error>> + Send + '_;

  /// Overwrite the mutable columns of `request` if its stored status is
  /// still `expected`. Returns whether a row was written.
  fn update_request<'a>(
    &'a self,
    expected: Status,
    request: &'a Request,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Permanently delete a request if its stored status is still `expected`.
  fn delete_request(
    &self,
    id: RequestId,
    expected: Status,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Permanently delete every listed request that is still completed or
  /// cancelled, in one transaction. Rows that became active again are kept.
  /// Returns the number of rows removed.
  fn delete_requests<'a>(
    &'a self,
    ids: &'a [RequestId],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}
