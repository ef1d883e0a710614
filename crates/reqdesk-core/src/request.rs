//! Request types. A request is one equipment requisition tracked through its lifecycle.
//!
//! A request is created by an administrator and mutated only through the
//! transitions in [`crate::lifecycle`]. Completed and cancelled requests are
//! destroyed outright, either on demand or by the retention sweep.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::UserId;

/// Store-assigned, monotonically increasing request id.
pub type RequestId = i64;

// ─── Status ──────────────────────────────────────────────────────────────────

/// The state machine's discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  New,
  InProgress,
  Completed,
  Cancelled,
}

impl Status {
  pub const ACTIVE: [Status; 2] = [Status::New, Status::InProgress];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "new",
      Self::InProgress => "in_progress",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Status {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "new" => Ok(Self::New),
      "in_progress" => Ok(Self::InProgress),
      "completed" => Ok(Self::Completed),
      "cancelled" => Ok(Self::Cancelled),
      other => Err(ValidationError::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Priority ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  Medium,
  Low,
}

impl Priority {
  pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::High => "high",
      Self::Medium => "medium",
      Self::Low => "low",
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Case-insensitive; surrounding whitespace is ignored.
impl FromStr for Priority {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    Self::ALL
      .into_iter()
      .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
      .ok_or_else(|| ValidationError::UnknownPriority(trimmed.to_owned()))
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{0} must not be blank")]
  BlankField(&'static str),

  #[error("quantity must be a positive integer, got {0}")]
  NonPositiveQuantity(i64),

  #[error("quantity is not a number: {0:?}")]
  QuantityNotANumber(String),

  #[error("unknown priority: {0:?}")]
  UnknownPriority(String),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  #[error("commands cannot be used as field values: {0:?}")]
  CommandInput(String),
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
  pub request_id:           RequestId,
  pub creator_id:           UserId,
  pub equipment_name:       String,
  pub quantity:             i64,
  pub description:          String,
  pub priority:             Priority,
  pub notes:                Option<String>,
  pub status:               Status,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  /// Set only on transition into [`Status::Completed`].
  pub completed_at:         Option<DateTime<Utc>>,
  pub estimated_completion: Option<DateTime<Utc>>,
  pub completed_by:         Option<UserId>,
  pub cancelled_by:         Option<UserId>,
  /// Soft-delete marker. No transition sets it; listings skip flagged rows.
  pub is_deleted:           bool,
  pub deleted_at:           Option<DateTime<Utc>>,
}

/// The fields collected by the creation dialogue; everything else about a
/// [`Request`] is assigned by the engine and the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
  pub equipment_name: String,
  pub quantity:       i64,
  pub description:    String,
  pub priority:       Priority,
  #[serde(default)]
  pub notes:          Option<String>,
}

impl NewRequest {
  pub fn new(
    equipment_name: impl Into<String>,
    quantity: i64,
    description: impl Into<String>,
    priority: Priority,
  ) -> Self {
    Self {
      equipment_name: equipment_name.into(),
      quantity,
      description: description.into(),
      priority,
      notes: None,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.equipment_name.trim().is_empty() {
      return Err(ValidationError::BlankField("equipment name"));
    }
    if self.quantity <= 0 {
      return Err(ValidationError::NonPositiveQuantity(self.quantity));
    }
    if self.description.trim().is_empty() {
      return Err(ValidationError::BlankField("description"));
    }
    Ok(())
  }
}

/// Parse a quantity as typed by a user: a positive integer.
pub fn parse_quantity(input: &str) -> Result<i64, ValidationError> {
  let trimmed = input.trim();
  let quantity: i64 = trimmed
    .parse()
    .map_err(|_| ValidationError::QuantityNotANumber(trimmed.to_owned()))?;
  if quantity <= 0 {
    return Err(ValidationError::NonPositiveQuantity(quantity));
  }
  Ok(quantity)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn priority_parses_case_insensitively() {
    assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
    assert_eq!(" medium ".parse::<Priority>().unwrap(), Priority::Medium);
    assert_eq!("Low".parse::<Priority>().unwrap(), Priority::Low);
    assert!(matches!(
      "urgent".parse::<Priority>(),
      Err(ValidationError::UnknownPriority(p)) if p == "urgent"
    ));
  }

  #[test]
  fn status_text_matches_storage_form() {
    for status in [Status::New, Status::InProgress, Status::Completed, Status::Cancelled] {
      assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
    }
    assert!("archived".parse::<Status>().is_err());
  }

  #[test]
  fn validate_rejects_blank_and_non_positive() {
    let ok = NewRequest::new("Drill", 2, "for site B", Priority::High);
    assert!(ok.validate().is_ok());

    let blank = NewRequest::new("  ", 2, "for site B", Priority::High);
    assert_eq!(blank.validate(), Err(ValidationError::BlankField("equipment name")));

    let zero = NewRequest::new("Drill", 0, "for site B", Priority::High);
    assert_eq!(zero.validate(), Err(ValidationError::NonPositiveQuantity(0)));

    let no_desc = NewRequest::new("Drill", 1, "", Priority::Low);
    assert_eq!(no_desc.validate(), Err(ValidationError::BlankField("description")));
  }

  #[test]
  fn parse_quantity_distinguishes_failures() {
    assert_eq!(parse_quantity(" 5 "), Ok(5));
    assert_eq!(parse_quantity("-3"), Err(ValidationError::NonPositiveQuantity(-3)));
    assert!(matches!(parse_quantity("five"), Err(ValidationError::QuantityNotANumber(_))));
  }
}
