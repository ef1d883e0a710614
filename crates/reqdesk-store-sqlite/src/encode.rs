//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are written as fixed-width RFC 3339 UTC strings. Older rows
//! may hold naive `YYYY-MM-DD HH:MM:SS[.ffffff]` values; those are read as
//! UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reqdesk_core::{
  request::{Priority, Request, Status},
  user::User,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|naive| naive.and_utc())
    .ok_or_else(|| Error::DateParse(format!("unrecognised timestamp: {s:?}")))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<Status> {
  s.parse().map_err(|e: reqdesk_core::request::ValidationError| Error::Decode {
    column:  "status",
    message: e.to_string(),
  })
}

pub fn decode_priority(s: &str) -> Result<Priority> {
  s.parse().map_err(|e: reqdesk_core::request::ValidationError| Error::Decode {
    column:  "priority",
    message: e.to_string(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, telegram_id, username, is_admin, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:          i64,
  pub telegram_id: i64,
  pub username:    Option<String>,
  pub is_admin:    bool,
  pub created_at:  String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      telegram_id: row.get(1)?,
      username:    row.get(2)?,
      is_admin:    row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:     self.id,
      external_id: self.telegram_id,
      handle:      self.username,
      is_admin:    self.is_admin,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const REQUEST_COLUMNS: &str = "id, user_id, equipment_name, quantity, description,
  priority, status, created_at, updated_at, completed_at, deleted_at, is_deleted,
  notes, estimated_completion, completed_by_id, cancelled_by_id";

/// Raw values read directly from a `requests` row.
pub struct RawRequest {
  pub id:                   i64,
  pub user_id:              i64,
  pub equipment_name:       String,
  pub quantity:             i64,
  pub description:          String,
  pub priority:             String,
  pub status:               String,
  pub created_at:           String,
  pub updated_at:           String,
  pub completed_at:         Option<String>,
  pub deleted_at:           Option<String>,
  pub is_deleted:           bool,
  pub notes:                Option<String>,
  pub estimated_completion: Option<String>,
  pub completed_by_id:      Option<i64>,
  pub cancelled_by_id:      Option<i64>,
}

impl RawRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      user_id:              row.get(1)?,
      equipment_name:       row.get(2)?,
      quantity:             row.get(3)?,
      description:          row.get(4)?,
      priority:             row.get(5)?,
      status:               row.get(6)?,
      created_at:           row.get(7)?,
      updated_at:           row.get(8)?,
      completed_at:         row.get(9)?,
      deleted_at:           row.get(10)?,
      is_deleted:           row.get(11)?,
      notes:                row.get(12)?,
      estimated_completion: row.get(13)?,
      completed_by_id:      row.get(14)?,
      cancelled_by_id:      row.get(15)?,
    })
  }

  pub fn into_request(self) -> Result<Request> {
    Ok(Request {
      request_id:           self.id,
      creator_id:           self.user_id,
      equipment_name:       self.equipment_name,
      quantity:             self.quantity,
      description:          self.description,
      priority:             decode_priority(&self.priority)?,
      notes:                self.notes,
      status:               decode_status(&self.status)?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
      completed_at:         decode_opt_dt(self.completed_at)?,
      estimated_completion: decode_opt_dt(self.estimated_completion)?,
      completed_by:         self.completed_by_id,
      cancelled_by:         self.cancelled_by_id,
      is_deleted:           self.is_deleted,
      deleted_at:           decode_opt_dt(self.deleted_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Timelike};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let b = a.with_nanosecond(500_000_000).unwrap();
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(encode_dt(a), "2024-01-01T09:00:00.000000Z");
  }

  #[test]
  fn decode_accepts_rfc3339_and_naive() {
    let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
    assert_eq!(decode_dt("2024-03-05T14:30:00.000000Z").unwrap(), expected);
    assert_eq!(decode_dt("2024-03-05T16:30:00+02:00").unwrap(), expected);
    assert_eq!(decode_dt("2024-03-05 14:30:00").unwrap(), expected);
    assert_eq!(decode_dt("2024-03-05 14:30:00.000000").unwrap(), expected);
    assert!(decode_dt("yesterday").is_err());
  }
}
