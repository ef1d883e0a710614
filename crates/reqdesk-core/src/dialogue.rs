//! The request-creation dialogue.
//!
//! A four-step form collected one message at a time: equipment, quantity,
//! description, priority. Each [`Step`] carries exactly the fields gathered
//! so far, so a half-finished form can never be submitted.
//!
//! Sessions are keyed by the actor's external id and live only in memory.
//! Sessions idle for longer than the TTL are dropped the next time the table
//! is touched.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
  Engine, Error,
  request::{NewRequest, Priority, Request, ValidationError, parse_quantity},
  store::RequestStore,
  user::User,
};

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

// ─── Steps ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  AwaitingEquipment,
  AwaitingQuantity {
    equipment: String,
  },
  AwaitingDescription {
    equipment: String,
    quantity:  i64,
  },
  AwaitingPriority {
    equipment:   String,
    quantity:    i64,
    description: String,
  },
}

/// One message's worth of input to an open dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueInput<'a> {
  Cancel,
  Text(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
  Next(Step),
  /// Input rejected; stay on the given step.
  Reprompt(Step, ValidationError),
  Done(NewRequest),
  Cancelled,
}

impl Step {
  pub fn advance(self, input: DialogueInput<'_>) -> Advance {
    let text = match input {
      DialogueInput::Cancel => return Advance::Cancelled,
      DialogueInput::Text(text) => text.trim(),
    };
    if text.starts_with('/') {
      return Advance::Reprompt(self, ValidationError::CommandInput(text.to_owned()));
    }

    match self {
      Self::AwaitingEquipment => {
        if text.is_empty() {
          return Advance::Reprompt(self, ValidationError::BlankField("equipment name"));
        }
        Advance::Next(Self::AwaitingQuantity { equipment: text.to_owned() })
      }
      Self::AwaitingQuantity { equipment } => match parse_quantity(text) {
        Ok(quantity) => Advance::Next(Self::AwaitingDescription { equipment, quantity }),
        Err(e) => Advance::Reprompt(Self::AwaitingQuantity { equipment }, e),
      },
      Self::AwaitingDescription { equipment, quantity } => {
        if text.is_empty() {
          return Advance::Reprompt(
            Self::AwaitingDescription { equipment, quantity },
            ValidationError::BlankField("description"),
          );
        }
        Advance::Next(Self::AwaitingPriority {
          equipment,
          quantity,
          description: text.to_owned(),
        })
      }
      Self::AwaitingPriority { equipment, quantity, description } => {
        match parse_priority_answer(text) {
          Ok(priority) => Advance::Done(NewRequest::new(equipment, quantity, description, priority)),
          Err(e) => Advance::Reprompt(Self::AwaitingPriority { equipment, quantity, description }, e),
        }
      }
    }
  }
}

/// Accepts the bare word or a keyboard label such as `🔴 High`; leading
/// markers before the word are ignored.
fn parse_priority_answer(text: &str) -> Result<Priority, ValidationError> {
  text
    .trim_start_matches(|c: char| !c.is_alphanumeric())
    .parse()
    .map_err(|_| ValidationError::UnknownPriority(text.to_owned()))
}

// ─── Session table ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Session {
  step:       Step,
  touched_at: DateTime<Utc>,
}

/// In-memory sessions keyed by external id, with idle eviction.
#[derive(Debug)]
pub struct Sessions {
  entries: HashMap<i64, Session>,
  ttl:     TimeDelta,
}

impl Sessions {
  pub fn new(ttl: TimeDelta) -> Self { Self { entries: HashMap::new(), ttl } }

  pub fn evict_expired(&mut self, now: DateTime<Utc>) {
    let ttl = self.ttl;
    self.entries.retain(|_, s| now - s.touched_at <= ttl);
  }

  pub fn insert(&mut self, key: i64, step: Step, now: DateTime<Utc>) {
    self.entries.insert(key, Session { step, touched_at: now });
  }

  /// Remove and return the live session for `key`, if any.
  pub fn take(&mut self, key: i64, now: DateTime<Utc>) -> Option<Step> {
    self.evict_expired(now);
    self.entries.remove(&key).map(|s| s.step)
  }

  pub fn contains(&mut self, key: i64, now: DateTime<Utc>) -> bool {
    self.evict_expired(now);
    self.entries.contains_key(&key)
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// What the front end should say next. Rendering is left to the caller.
#[derive(Debug)]
pub enum Prompt {
  AskEquipment,
  AskQuantity,
  AskDescription,
  AskPriority,
  Reprompt(Step, ValidationError),
  Created(Request),
  Cancelled,
  /// The actor may not start a dialogue.
  Denied,
  /// The final create call failed; the session has been discarded.
  Failed(Error),
}

impl Prompt {
  fn for_step(step: &Step) -> Self {
    match step {
      Step::AwaitingEquipment => Self::AskEquipment,
      Step::AwaitingQuantity { .. } => Self::AskQuantity,
      Step::AwaitingDescription { .. } => Self::AskDescription,
      Step::AwaitingPriority { .. } => Self::AskPriority,
    }
  }
}

pub struct DialogueController {
  sessions: Mutex<Sessions>,
}

impl DialogueController {
  pub fn new(ttl: TimeDelta) -> Self { Self { sessions: Mutex::new(Sessions::new(ttl)) } }

  fn sessions(&self) -> std::sync::MutexGuard<'_, Sessions> {
    self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Begin (or restart) a dialogue for `actor`. Non-admins are turned away
  /// without opening a session.
  pub fn start(&self, actor: &User, now: DateTime<Utc>) -> Prompt {
    if !actor.is_admin {
      self.sessions().take(actor.external_id, now);
      return Prompt::Denied;
    }
    let mut sessions = self.sessions();
    sessions.evict_expired(now);
    sessions.insert(actor.external_id, Step::AwaitingEquipment, now);
    tracing::debug!(actor = actor.user_id, "creation dialogue started");
    Prompt::AskEquipment
  }

  /// Feed one message into `actor`'s open dialogue. Returns `None` when the
  /// actor has no open dialogue.
  pub async fn advance<S: RequestStore>(
    &self,
    engine: &Engine<S>,
    actor: &User,
    input: DialogueInput<'_>,
    now: DateTime<Utc>,
  ) -> Option<Prompt> {
    let step = self.sessions().take(actor.external_id, now)?;

    let prompt = match step.advance(input) {
      Advance::Next(next) => {
        let prompt = Prompt::for_step(&next);
        self.sessions().insert(actor.external_id, next, now);
        prompt
      }
      Advance::Reprompt(step, reason) => {
        self.sessions().insert(actor.external_id, step.clone(), now);
        Prompt::Reprompt(step, reason)
      }
      Advance::Cancelled => {
        tracing::debug!(actor = actor.user_id, "creation dialogue cancelled");
        Prompt::Cancelled
      }
      // The session was taken above and is not reinserted, whatever the
      // outcome of the create call.
      Advance::Done(input) => match engine.create(actor, input).await {
        Ok(request) => Prompt::Created(request),
        Err(e) => Prompt::Failed(e),
      },
    };
    Some(prompt)
  }
}

impl Default for DialogueController {
  fn default() -> Self { Self::new(TimeDelta::minutes(DEFAULT_SESSION_TTL_MINUTES)) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text(s: &str) -> DialogueInput<'_> { DialogueInput::Text(s) }

  fn next(advance: Advance) -> Step {
    match advance {
      Advance::Next(step) => step,
      other => panic!("expected next step, got {other:?}"),
    }
  }

  #[test]
  fn full_form_produces_request() {
    let step = next(Step::AwaitingEquipment.advance(text("Drill")));
    let step = next(step.advance(text("2")));
    let step = next(step.advance(text("for site B")));
    let done = step.advance(text("High"));
    assert_eq!(
      done,
      Advance::Done(NewRequest::new("Drill", 2, "for site B", Priority::High))
    );
  }

  #[test]
  fn invalid_quantity_stays_on_step() {
    let step = Step::AwaitingQuantity { equipment: "Drill".into() };
    match step.clone().advance(text("lots")) {
      Advance::Reprompt(s, ValidationError::QuantityNotANumber(_)) => assert_eq!(s, step),
      other => panic!("unexpected {other:?}"),
    }
    match step.clone().advance(text("0")) {
      Advance::Reprompt(s, ValidationError::NonPositiveQuantity(0)) => assert_eq!(s, step),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn unknown_priority_reprompts() {
    let step = Step::AwaitingPriority {
      equipment:   "Drill".into(),
      quantity:    2,
      description: "for site B".into(),
    };
    assert!(matches!(
      step.advance(text("urgent")),
      Advance::Reprompt(Step::AwaitingPriority { .. }, ValidationError::UnknownPriority(_))
    ));
  }

  #[test]
  fn priority_accepts_keyboard_labels() {
    let step = Step::AwaitingPriority {
      equipment:   "Drill".into(),
      quantity:    2,
      description: "for site B".into(),
    };
    assert_eq!(
      step.advance(text("🟡 Medium")),
      Advance::Done(NewRequest::new("Drill", 2, "for site B", Priority::Medium))
    );
  }

  #[test]
  fn labels_are_kept_verbatim_in_free_text_steps() {
    let step = next(Step::AwaitingEquipment.advance(text("🔴 High")));
    assert_eq!(step, Step::AwaitingQuantity { equipment: "🔴 High".into() });
  }

  #[test]
  fn commands_are_not_field_values() {
    let step = Step::AwaitingDescription { equipment: "Drill".into(), quantity: 2 };
    match step.clone().advance(text("/help")) {
      Advance::Reprompt(s, ValidationError::CommandInput(c)) => {
        assert_eq!(s, step);
        assert_eq!(c, "/help");
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn blank_text_reprompts() {
    assert!(matches!(
      Step::AwaitingEquipment.advance(text("   ")),
      Advance::Reprompt(Step::AwaitingEquipment, ValidationError::BlankField(_))
    ));
  }

  #[test]
  fn cancel_accepted_in_every_step() {
    let steps = [
      Step::AwaitingEquipment,
      Step::AwaitingQuantity { equipment: "a".into() },
      Step::AwaitingDescription { equipment: "a".into(), quantity: 1 },
      Step::AwaitingPriority { equipment: "a".into(), quantity: 1, description: "b".into() },
    ];
    for step in steps {
      assert_eq!(step.advance(DialogueInput::Cancel), Advance::Cancelled);
    }
  }

  #[test]
  fn idle_sessions_are_evicted() {
    let now = Utc::now();
    let mut sessions = Sessions::new(TimeDelta::minutes(30));
    sessions.insert(1, Step::AwaitingEquipment, now - TimeDelta::minutes(45));
    sessions.insert(2, Step::AwaitingEquipment, now - TimeDelta::minutes(5));

    assert!(!sessions.contains(1, now));
    assert!(sessions.contains(2, now));
    assert_eq!(sessions.len(), 1);
  }

  #[test]
  fn non_admin_cannot_start() {
    let controller = DialogueController::default();
    let now = Utc::now();
    let employee = User {
      user_id:     5,
      external_id: 55,
      handle:      None,
      is_admin:    false,
      created_at:  now,
    };
    assert!(matches!(controller.start(&employee, now), Prompt::Denied));
    assert!(!controller.sessions().contains(55, now));

    let admin = User { is_admin: true, ..employee };
    assert!(matches!(controller.start(&admin, now), Prompt::AskEquipment));
    assert!(controller.sessions().contains(55, now));
  }
}
