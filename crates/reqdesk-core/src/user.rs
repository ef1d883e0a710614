//! Users, the actors behind every operation.
//!
//! A user is created lazily on first contact and never deleted. The only
//! authorization signal in the system is [`User::is_admin`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned user id. Requests reference users by this value only.
pub type UserId = i64;

/// What the messaging transport tells us about whoever sent an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
  /// Opaque, unique id assigned by the messaging platform.
  pub external_id: i64,
  pub handle:      Option<String>,
}

impl ActorIdentity {
  pub fn new(external_id: i64, handle: Option<String>) -> Self {
    Self { external_id, handle }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:     UserId,
  pub external_id: i64,
  pub handle:      Option<String>,
  pub is_admin:    bool,
  pub created_at:  DateTime<Utc>,
}

impl User {
  /// Human-readable label: `@handle` when known, otherwise the external id.
  pub fn display(&self) -> UserLabel<'_> { UserLabel(self) }

  pub fn role(&self) -> &'static str {
    if self.is_admin { "administrator" } else { "employee" }
  }
}

pub struct UserLabel<'a>(&'a User);

impl fmt::Display for UserLabel<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0.handle.as_deref().filter(|h| !h.is_empty()) {
      Some(handle) => write!(f, "@{handle}"),
      None => write!(f, "ID {}", self.0.external_id),
    }
  }
}
