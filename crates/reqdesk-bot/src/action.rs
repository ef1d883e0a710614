//! Action tags carried by inline buttons.
//!
//! The vocabulary is shared with whatever renders the buttons, so the string
//! forms are fixed: `complete_{id}`, `reject_{id}`, `cancel_{id}`,
//! `restore_{id}`, `restore_completed_{id}`, `delete_now_{id}`,
//! `delete_completed_{id}`.

use std::{fmt, str::FromStr};

use reqdesk_core::{lifecycle::Event, request::RequestId};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTag {
  Complete(RequestId),
  Reject(RequestId),
  Cancel(RequestId),
  /// Restore a cancelled request.
  Restore(RequestId),
  RestoreCompleted(RequestId),
  /// Delete a cancelled request.
  DeleteNow(RequestId),
  DeleteCompleted(RequestId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action tag: {0:?}")]
pub struct UnknownAction(pub String);

// Longer prefixes first so `restore_completed_` never parses as `restore_`.
const PREFIXES: [(&str, fn(RequestId) -> ActionTag); 7] = [
  ("restore_completed_", ActionTag::RestoreCompleted),
  ("delete_completed_", ActionTag::DeleteCompleted),
  ("delete_now_", ActionTag::DeleteNow),
  ("complete_", ActionTag::Complete),
  ("reject_", ActionTag::Reject),
  ("cancel_", ActionTag::Cancel),
  ("restore_", ActionTag::Restore),
];

impl ActionTag {
  pub fn event(self) -> Event {
    match self {
      Self::Complete(_) => Event::Accept,
      Self::Reject(_) => Event::Reject,
      Self::Cancel(_) => Event::Cancel,
      Self::Restore(_) | Self::RestoreCompleted(_) => Event::Restore,
      Self::DeleteNow(_) | Self::DeleteCompleted(_) => Event::Delete,
    }
  }

  pub fn request_id(self) -> RequestId {
    match self {
      Self::Complete(id)
      | Self::Reject(id)
      | Self::Cancel(id)
      | Self::Restore(id)
      | Self::RestoreCompleted(id)
      | Self::DeleteNow(id)
      | Self::DeleteCompleted(id) => id,
    }
  }

  fn prefix(self) -> &'static str {
    match self {
      Self::Complete(_) => "complete_",
      Self::Reject(_) => "reject_",
      Self::Cancel(_) => "cancel_",
      Self::Restore(_) => "restore_",
      Self::RestoreCompleted(_) => "restore_completed_",
      Self::DeleteNow(_) => "delete_now_",
      Self::DeleteCompleted(_) => "delete_completed_",
    }
  }
}

impl fmt::Display for ActionTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.prefix(), self.request_id())
  }
}

impl FromStr for ActionTag {
  type Err = UnknownAction;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    PREFIXES
      .iter()
      .find_map(|(prefix, build)| {
        s.strip_prefix(prefix)
          .and_then(|rest| rest.parse::<RequestId>().ok())
          .map(build)
      })
      .ok_or_else(|| UnknownAction(s.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_every_tag() {
    let cases = [
      ("complete_3", ActionTag::Complete(3)),
      ("reject_4", ActionTag::Reject(4)),
      ("cancel_5", ActionTag::Cancel(5)),
      ("restore_6", ActionTag::Restore(6)),
      ("restore_completed_7", ActionTag::RestoreCompleted(7)),
      ("delete_now_8", ActionTag::DeleteNow(8)),
      ("delete_completed_9", ActionTag::DeleteCompleted(9)),
    ];
    for (text, tag) in cases {
      assert_eq!(text.parse::<ActionTag>().unwrap(), tag, "{text}");
      assert_eq!(tag.to_string(), text);
    }
  }

  #[test]
  fn maps_to_lifecycle_events() {
    assert_eq!(ActionTag::Complete(1).event(), Event::Accept);
    assert_eq!(ActionTag::RestoreCompleted(1).event(), Event::Restore);
    assert_eq!(ActionTag::DeleteNow(1).event(), Event::Delete);
  }

  #[test]
  fn rejects_malformed_tags() {
    for text in ["", "complete_", "complete_abc", "archive_3", "delete_3", "restore_completed"] {
      assert!(text.parse::<ActionTag>().is_err(), "{text}");
    }
  }
}
