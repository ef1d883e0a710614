//! [`Engine`], the request lifecycle engine.
//!
//! Owns the authorization rules and the transition table, delegating all
//! persistence to a [`RequestStore`].

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  lifecycle::{self, Event, Outcome},
  request::{NewRequest, Request, RequestId, Status},
  retention::{self, RetentionPolicy},
  store::RequestStore,
  user::{ActorIdentity, User, UserId},
};

pub struct Engine<S> {
  store:     S,
  retention: RetentionPolicy,
}

impl<S: RequestStore> Engine<S> {
  pub fn new(store: S, retention: RetentionPolicy) -> Self { Self { store, retention } }

  pub fn store(&self) -> &S { &self.store }

  pub fn retention(&self) -> RetentionPolicy { self.retention }

  // ── Users ─────────────────────────────────────────────────────────────

  /// Resolve the actor behind an inbound event, registering them on first
  /// contact.
  pub async fn register(&self, identity: ActorIdentity) -> Result<User> {
    self.store.ensure_user(identity).await.map_err(Error::store)
  }

  /// Look up a user by id, e.g. to render a `completed_by` reference.
  pub async fn user(&self, user_id: UserId) -> Result<Option<User>> {
    self.store.get_user(user_id).await.map_err(Error::store)
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create a request on behalf of an administrator.
  pub async fn create(&self, creator: &User, input: NewRequest) -> Result<Request> {
    if !creator.is_admin {
      return Err(Error::Unauthorized { actor: creator.user_id, action: "create requests" });
    }
    input.validate()?;

    let request = self
      .store
      .insert_request(creator.user_id, input)
      .await
      .map_err(Error::store)?;

    tracing::info!(
      request_id = request.request_id,
      creator = creator.user_id,
      priority = %request.priority,
      "request created"
    );
    Ok(request)
  }

  /// Fire `event` on request `id` as `actor`.
  ///
  /// On success returns the request as persisted; for [`Event::Delete`] this
  /// is the last state before the row was removed.
  pub async fn transition(&self, id: RequestId, event: Event, actor: &User) -> Result<Request> {
    let current = self
      .store
      .get_request(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RequestNotFound(id))?;

    let result = match lifecycle::plan(&current, event, actor, Utc::now())? {
      Outcome::Update(next) => {
        let written = self
          .store
          .update_request(current.status, &next)
          .await
          .map_err(Error::store)?;
        written.then_some(next)
      }
      Outcome::Destroy => {
        let deleted = self
          .store
          .delete_request(id, current.status)
          .await
          .map_err(Error::store)?;
        deleted.then_some(current.clone())
      }
    };

    match result {
      Some(request) => {
        tracing::info!(
          request_id = id,
          event = event.verb(),
          actor = actor.user_id,
          from = %current.status,
          to = %request.status,
          "request transitioned"
        );
        Ok(request)
      }
      None => Err(self.lost_race(id, event).await),
    }
  }

  /// Explain why a compare-and-swap write found nothing to change.
  async fn lost_race(&self, id: RequestId, event: Event) -> Error {
    tracing::warn!(request_id = id, event = event.verb(), "concurrent change detected");
    match self.store.get_request(id).await {
      Ok(Some(now)) => Error::InvalidTransition { from: now.status, event },
      Ok(None) => Error::RequestNotFound(id),
      Err(e) => Error::store(e),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Requests that still need attention, newest first.
  pub async fn list_active(&self) -> Result<Vec<Request>> {
    let mut requests = self
      .store
      .list_by_status(&Status::ACTIVE)
      .await
      .map_err(Error::store)?;
    requests.sort_by(|a, b| {
      b.created_at.cmp(&a.created_at).then(b.request_id.cmp(&a.request_id))
    });
    Ok(requests)
  }

  /// Requests completed within the last `within_days` days, newest first.
  pub async fn list_completed(&self, within_days: i64) -> Result<Vec<Request>> {
    self.list_finished(Status::Completed, within_days, Utc::now()).await
  }

  /// Requests cancelled within the last `within_days` days, newest first.
  pub async fn list_cancelled(&self, within_days: i64) -> Result<Vec<Request>> {
    self.list_finished(Status::Cancelled, within_days, Utc::now()).await
  }

  async fn list_finished(
    &self,
    status: Status,
    within_days: i64,
    now: DateTime<Utc>,
  ) -> Result<Vec<Request>> {
    let mut requests: Vec<Request> = self
      .store
      .list_by_status(&[status])
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|r| retention::is_within(r, now, within_days))
      .collect();
    requests.sort_by_key(|r| std::cmp::Reverse(RetentionPolicy::reference_time(r)));
    Ok(requests)
  }

  // ── Retention ─────────────────────────────────────────────────────────

  /// Permanently delete every finished request older than the retention
  /// window, soft-deleted rows included. Returns the number of requests
  /// removed.
  pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let expired: Vec<RequestId> = self
      .store
      .list_finished_all()
      .await
      .map_err(Error::store)?
      .iter()
      .filter(|r| self.retention.is_expired(r, now))
      .map(|r| r.request_id)
      .collect();

    if expired.is_empty() {
      return Ok(0);
    }

    let removed = self.store.delete_requests(&expired).await.map_err(Error::store)?;
    tracing::info!(removed, retention_days = self.retention.days, "retention sweep finished");
    Ok(removed)
  }
}
