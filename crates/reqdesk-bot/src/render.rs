//! Message text, menus and button layouts.

use chrono::{DateTime, Utc};
use reqdesk_core::{
  Error as CoreError,
  dialogue::Prompt,
  lifecycle::Event,
  request::{Priority, Request, Status, ValidationError},
  user::User,
};

use crate::{
  action::ActionTag,
  event::{Button, Reply},
};

// ─── Labels ──────────────────────────────────────────────────────────────────

pub const CREATE: &str = "📝 Create request";
pub const ACTIVE: &str = "📋 Active requests";
pub const MINE: &str = "📋 My requests";
pub const COMPLETED: &str = "✅ Completed requests";
pub const CANCELLED: &str = "❌ Cancelled requests";
pub const HELP: &str = "❓ Help";
pub const CANCEL: &str = "❌ Cancel";

const PRIORITY_LABELS: [&str; 3] = ["🔴 High", "🟡 Medium", "🟢 Low"];

fn rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
  rows
    .iter()
    .map(|row| row.iter().map(|s| (*s).to_owned()).collect())
    .collect()
}

pub fn main_menu(is_admin: bool) -> Vec<Vec<String>> {
  if is_admin {
    rows(&[&[CREATE, ACTIVE], &[COMPLETED, CANCELLED], &[HELP]])
  } else {
    rows(&[&[MINE], &[HELP]])
  }
}

fn cancel_menu() -> Vec<Vec<String>> { rows(&[&[CANCEL]]) }

fn priority_menu() -> Vec<Vec<String>> {
  let [high, medium, low] = PRIORITY_LABELS;
  rows(&[&[high, medium], &[low, CANCEL]])
}

// ─── Small formatters ────────────────────────────────────────────────────────

pub fn status_emoji(status: Status) -> &'static str {
  match status {
    Status::New => "🆕",
    Status::InProgress => "⏳",
    Status::Completed => "✅",
    Status::Cancelled => "❌",
  }
}

pub fn status_label(status: Status) -> &'static str {
  match status {
    Status::New => "New",
    Status::InProgress => "In progress",
    Status::Completed => "Completed",
    Status::Cancelled => "Cancelled",
  }
}

pub fn priority_emoji(priority: Priority) -> &'static str {
  match priority {
    Priority::High => "🔴",
    Priority::Medium => "🟡",
    Priority::Low => "🟢",
  }
}

pub fn priority_label(priority: Priority) -> &'static str {
  match priority {
    Priority::High => "High",
    Priority::Medium => "Medium",
    Priority::Low => "Low",
  }
}

pub fn format_datetime(dt: Option<DateTime<Utc>>) -> String {
  dt.map_or_else(
    || "not set".to_owned(),
    |dt| dt.format("%d.%m.%Y %H:%M").to_string(),
  )
}

/// Render a resolved actor reference; `None` means the user is unknown.
pub fn actor_label(user: Option<&User>) -> String {
  user.map_or_else(|| "unknown".to_owned(), |u| u.display().to_string())
}

// ─── Greetings and help ──────────────────────────────────────────────────────

pub fn greeting(user: &User) -> Reply {
  Reply::text(format!(
    "👋 Hello, {}! Use the menu below to work with requests.",
    user.role()
  ))
  .with_menu(main_menu(user.is_admin))
}

pub fn help(user: &User) -> Reply {
  let body = if user.is_admin {
    "ℹ️ *Administrator help*\n\n\
     • Create requests with '📝 Create request'\n\
     • Review open requests with '📋 Active requests'\n\
     • Browse finished requests with the completed and cancelled menu items\n\
     • Use '❓ Help' to see this message again"
  } else {
    "ℹ️ *Employee help*\n\n\
     • See all open requests with '📋 My requests'\n\
     • Accept or decline requests with the buttons under each one\n\
     • Use '❓ Help' to see this message again"
  };
  Reply::text(format!(
    "{body}\n\nCommands:\n/start: start over\n/help: this help\n/cancel: cancel the current action"
  ))
  .with_menu(main_menu(user.is_admin))
}

pub fn unrecognised() -> Reply {
  Reply::text("Command not recognised. Please use the menu or the '❓ Help' button.")
}

pub fn nothing_to_cancel(user: &User) -> Reply {
  Reply::text("There is nothing to cancel.").with_menu(main_menu(user.is_admin))
}

// ─── Request cards ───────────────────────────────────────────────────────────

/// Full details of an active request, with the buttons `viewer` may press.
pub fn active_card(request: &Request, viewer: &User) -> Reply {
  let id = request.request_id;
  let text = format!(
    "📋 *Request #{id}*\n\n\
     📦 *Equipment:* {}\n\
     🔢 *Quantity:* {}\n\
     📝 *Description:* {}\n\
     ⚡️ *Priority:* {} {}\n\
     📊 *Status:* {} {}\n\n\
     🕒 *Created:* {}\n\
     📅 *Updated:* {}\n\
     📌 *Notes:* {}",
    request.equipment_name,
    request.quantity,
    request.description,
    priority_emoji(request.priority),
    priority_label(request.priority),
    status_emoji(request.status),
    status_label(request.status),
    format_datetime(Some(request.created_at)),
    format_datetime(Some(request.updated_at)),
    request.notes.as_deref().unwrap_or("no notes"),
  );

  let buttons = match (viewer.is_admin, request.status) {
    (false, Status::New) => vec![
      Button::new("✅ Accept", ActionTag::Complete(id)),
      Button::new("❌ Decline", ActionTag::Cancel(id)),
    ],
    (false, Status::InProgress) => vec![Button::new("✅ Accept", ActionTag::Complete(id))],
    (true, Status::New) => vec![Button::new("❌ Reject", ActionTag::Reject(id))],
    _ => Vec::new(),
  };

  Reply::text(text).with_buttons(buttons)
}

fn finished_body(request: &Request) -> String {
  format!(
    "📦 Equipment: {}\n\
     🔢 Quantity: {}\n\
     📝 Description: {}\n\
     {} Priority: {}\n\
     📅 Created: {}",
    request.equipment_name,
    request.quantity,
    request.description,
    priority_emoji(request.priority),
    priority_label(request.priority),
    format_datetime(Some(request.created_at)),
  )
}

pub fn completed_card(request: &Request, completed_by: Option<&User>, days_left: i64) -> Reply {
  let id = request.request_id;
  let text = format!(
    "✅ *Completed request #{id}*\n\n{}\n\
     ✅ Completed: {}\n\
     👤 Accepted by: {}\n\
     ⏳ Auto-delete in: {days_left} days",
    finished_body(request),
    format_datetime(request.completed_at),
    actor_label(completed_by),
  );
  Reply::text(text).with_buttons(vec![
    Button::new("🔄 Restore", ActionTag::RestoreCompleted(id)),
    Button::new("🗑 Delete", ActionTag::DeleteCompleted(id)),
  ])
}

pub fn cancelled_card(request: &Request, cancelled_by: Option<&User>, days_left: i64) -> Reply {
  let id = request.request_id;
  let text = format!(
    "❌ *Cancelled request #{id}*\n\n{}\n\
     ❌ Cancelled: {}\n\
     👤 Rejected/cancelled by: {}\n\
     ⏳ Auto-delete in: {days_left} days",
    finished_body(request),
    format_datetime(Some(request.updated_at)),
    actor_label(cancelled_by),
  );
  Reply::text(text).with_buttons(vec![
    Button::new("🔄 Restore", ActionTag::Restore(id)),
    Button::new("🗑 Delete", ActionTag::DeleteNow(id)),
  ])
}

pub fn empty_list(kind: Status, user: &User, window_days: i64) -> Reply {
  let text = match kind {
    Status::Completed => format!("No completed requests in the last {window_days} days."),
    Status::Cancelled => format!("No cancelled requests in the last {window_days} days."),
    Status::New | Status::InProgress => "No active requests found.".to_owned(),
  };
  Reply::text(text).with_menu(main_menu(user.is_admin))
}

pub fn admin_only(what: &str) -> Reply {
  Reply::text(format!("Only administrators can view {what}.")).with_menu(main_menu(false))
}

/// Confirmation shown after a successful button press.
pub fn transition_done(event: Event, request: &Request, actor: &User, now: DateTime<Utc>) -> Reply {
  let id = request.request_id;
  let (headline, status_line, date_label) = match event {
    Event::Accept => (format!("✅ *Request #{id} accepted!*"), "✅ Status changed to 'Completed'", "Accepted"),
    Event::Reject => (format!("❌ *Request #{id} rejected*"), "❌ Status changed to 'Rejected'", "Rejected"),
    Event::Cancel => (format!("❌ *Request #{id} cancelled*"), "❌ Status changed to 'Cancelled'", "Cancelled"),
    Event::Restore => (format!("🔄 *Request #{id} restored*"), "🆕 Status changed to 'New'", "Restored"),
    Event::Delete => (format!("🗑 *Request #{id} deleted*"), "🗑 Request permanently removed", "Deleted"),
  };

  let mut text = format!(
    "{headline}\n\n\
     📦 Equipment: {}\n\
     🔢 Quantity: {}\n\
     {status_line}\n\
     📅 {date_label} on: {}",
    request.equipment_name,
    request.quantity,
    format_datetime(Some(now)),
  );
  if matches!(event, Event::Accept | Event::Reject | Event::Cancel) {
    text.push_str(&format!("\n👤 {date_label} by: {}", actor.display()));
  }
  Reply::text(text)
}

// ─── Dialogue prompts ────────────────────────────────────────────────────────

fn reprompt_text(reason: &ValidationError) -> String {
  match reason {
    ValidationError::QuantityNotANumber(_) => {
      "Please enter a number (for example: 5, 10, 100):".to_owned()
    }
    ValidationError::NonPositiveQuantity(_) => {
      "Please enter a valid quantity (a whole number greater than zero):".to_owned()
    }
    ValidationError::UnknownPriority(_) => {
      "Please choose one of the offered priorities.".to_owned()
    }
    ValidationError::BlankField(field) => format!("The {field} must not be empty. Please try again:"),
    ValidationError::CommandInput(_) => {
      "Commands cannot be used here. Answer the question or send /cancel to stop.".to_owned()
    }
    ValidationError::UnknownStatus(_) => "Please try again:".to_owned(),
  }
}

pub fn prompt(prompt: &Prompt, user: &User) -> Reply {
  match prompt {
    Prompt::AskEquipment => {
      Reply::text("Please enter the name of the equipment or material:").with_menu(cancel_menu())
    }
    Prompt::AskQuantity => {
      Reply::text("Please enter the quantity (a whole number greater than zero):")
    }
    Prompt::AskDescription => Reply::text("Now please describe the request:"),
    Prompt::AskPriority => {
      Reply::text("Choose the request priority: 🔴 High, 🟡 Medium or 🟢 Low.")
        .with_menu(priority_menu())
    }
    Prompt::Reprompt(step, reason) => {
      let reply = Reply::text(reprompt_text(reason));
      match step {
        reqdesk_core::dialogue::Step::AwaitingPriority { .. } => reply.with_menu(priority_menu()),
        _ => reply,
      }
    }
    Prompt::Created(request) => Reply::text(format!(
      "Your request #{} has been created and will appear in the list of active requests.",
      request.request_id
    ))
    .with_menu(main_menu(user.is_admin)),
    Prompt::Cancelled => {
      Reply::text("Request creation cancelled. You can start again at any time.")
        .with_menu(main_menu(user.is_admin))
    }
    Prompt::Denied => Reply::text(
      "Only administrators may create requests. If you need help, contact an administrator.",
    )
    .with_menu(main_menu(false)),
    Prompt::Failed(err) => Reply::text(error_text(err)).with_menu(main_menu(user.is_admin)),
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// User-facing text for an engine error. Store failures are never shown in
/// detail.
pub fn error_text(err: &CoreError) -> String {
  match err {
    CoreError::Validation(e) => format!("⚠️ {e}"),
    CoreError::Unauthorized { .. } => {
      "🔒 Access denied\n\nYou do not have permission to do that.".to_owned()
    }
    CoreError::RequestNotFound(_) => "Request not found.".to_owned(),
    CoreError::InvalidTransition { .. } => {
      "😔 This action is not available for the request any more.".to_owned()
    }
    CoreError::Store(_) => "😔 Something went wrong. Please try again later.".to_owned(),
  }
}

pub fn unknown_action() -> Reply {
  Reply::text("😔 Unknown action. Please try again.")
}
