//! Wire types exchanged with the messaging gateway.

use reqdesk_core::user::ActorIdentity;
use serde::{Deserialize, Serialize};

use crate::action::ActionTag;

/// One inbound event: who sent it and what they sent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InboundEvent {
  pub actor:   ActorIdentity,
  pub payload: Payload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
  /// A typed message, command or reply-keyboard label.
  Text { text: String },
  /// An inline button press carrying an action tag.
  Button { tag: String },
}

/// An inline button: label shown to the user, tag sent back when pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
  pub label:  String,
  pub action: String,
}

impl Button {
  pub fn new(label: &str, action: ActionTag) -> Self {
    Self { label: label.to_owned(), action: action.to_string() }
  }
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
  pub text:    String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub buttons: Vec<Button>,
  /// Replacement reply-keyboard rows, when the keyboard should change.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub menu:    Option<Vec<Vec<String>>>,
}

impl Reply {
  pub fn text(text: impl Into<String>) -> Self {
    Self { text: text.into(), buttons: Vec::new(), menu: None }
  }

  pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
    self.buttons = buttons;
    self
  }

  pub fn with_menu(mut self, menu: Vec<Vec<String>>) -> Self {
    self.menu = Some(menu);
    self
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
  pub replies: Vec<Reply>,
}
