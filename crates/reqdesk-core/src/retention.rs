//! Time-based retention of finished requests.
//!
//! A completed request ages from `completed_at`; a cancelled one from
//! `updated_at`. Once the reference timestamp falls behind the cutoff the
//! request is eligible for permanent deletion.

use chrono::{DateTime, TimeDelta, Utc};

use crate::request::{Request, Status};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
  pub days: i64,
}

impl Default for RetentionPolicy {
  fn default() -> Self { Self { days: DEFAULT_RETENTION_DAYS } }
}

impl RetentionPolicy {
  pub fn new(days: i64) -> Self { Self { days } }

  /// Timestamp the retention clock runs from, or `None` for active requests.
  pub fn reference_time(request: &Request) -> Option<DateTime<Utc>> {
    match request.status {
      Status::Completed => request.completed_at,
      Status::Cancelled => Some(request.updated_at),
      Status::New | Status::InProgress => None,
    }
  }

  pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::days(self.days)
  }

  /// True when the request is finished and its reference time is older than
  /// the cutoff.
  pub fn is_expired(&self, request: &Request, now: DateTime<Utc>) -> bool {
    Self::reference_time(request).is_some_and(|at| at < self.cutoff(now))
  }

  /// Whole days remaining before the sweep removes `request`.
  pub fn days_left(&self, request: &Request, now: DateTime<Utc>) -> i64 {
    Self::reference_time(request)
      .map(|at| self.days - (now - at).num_days())
      .unwrap_or(0)
  }
}

/// True when `request` is finished and its reference time lies within the
/// last `window_days` days.
pub fn is_within(request: &Request, now: DateTime<Utc>, window_days: i64) -> bool {
  RetentionPolicy::reference_time(request)
    .is_some_and(|at| at >= now - TimeDelta::days(window_days))
}
