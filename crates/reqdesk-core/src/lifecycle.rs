//! The request state machine.
//!
//! ```text
//!            accept (employee)                 restore (admin)
//! new ─────────────────────────► completed ──────────────────► new
//!  │  in_progress ──accept──────►    │
//!  │                                 └──delete (admin)──► destroyed
//!  ├──reject (admin)──────────► cancelled ──restore (admin)──► new
//!  └──cancel (anyone)─────────►    │
//!     in_progress ──cancel────►    └──delete (admin)──► destroyed
//! ```
//!
//! [`plan`] is pure: it checks the guard, finds the matching row of the
//! transition table and returns the request as it should be persisted. The
//! engine is responsible for loading and storing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  request::{Request, Status},
  user::User,
};

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
  Accept,
  Reject,
  Cancel,
  Restore,
  Delete,
}

impl Event {
  pub fn verb(self) -> &'static str {
    match self {
      Self::Accept => "accept",
      Self::Reject => "reject",
      Self::Cancel => "cancel",
      Self::Restore => "restore",
      Self::Delete => "delete",
    }
  }

  pub fn guard(self) -> Guard {
    match self {
      Self::Accept => Guard::Employee,
      Self::Cancel => Guard::AnyUser,
      Self::Reject | Self::Restore | Self::Delete => Guard::Admin,
    }
  }
}

// ─── Guards ──────────────────────────────────────────────────────────────────

/// Who may fire an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
  /// Any registered user.
  AnyUser,
  /// Only users without the admin flag.
  Employee,
  Admin,
}

impl Guard {
  pub fn permits(self, actor: &User) -> bool {
    match self {
      Self::AnyUser => true,
      Self::Employee => !actor.is_admin,
      Self::Admin => actor.is_admin,
    }
  }
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// What the engine must persist for a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Update(Request),
  Destroy,
}

/// Compute the effect of `event` fired by `actor` on `request` at `now`.
///
/// Fails with [`Error::Unauthorized`] when the guard rejects the actor and
/// with [`Error::InvalidTransition`] when the event is not valid from the
/// current status. `request` itself is never modified.
pub fn plan(
  request: &Request,
  event: Event,
  actor: &User,
  now: DateTime<Utc>,
) -> Result<Outcome> {
  if !event.guard().permits(actor) {
    return Err(Error::Unauthorized { actor: actor.user_id, action: event.verb() });
  }

  let invalid = || Error::InvalidTransition { from: request.status, event };
  let mut next = request.clone();
  next.updated_at = now;

  match (request.status, event) {
    (Status::New | Status::InProgress, Event::Accept) => {
      next.status = Status::Completed;
      next.completed_at = Some(now);
      next.completed_by = Some(actor.user_id);
      next.cancelled_by = None;
    }
    (Status::New, Event::Reject) | (Status::New | Status::InProgress, Event::Cancel) => {
      next.status = Status::Cancelled;
      next.cancelled_by = Some(actor.user_id);
      next.completed_at = None;
      next.completed_by = None;
    }
    (Status::Completed | Status::Cancelled, Event::Restore) => {
      next.status = Status::New;
      next.completed_at = None;
      next.completed_by = None;
      next.cancelled_by = None;
    }
    (Status::Completed | Status::Cancelled, Event::Delete) => return Ok(Outcome::Destroy),
    _ => return Err(invalid()),
  }

  Ok(Outcome::Update(next))
}
