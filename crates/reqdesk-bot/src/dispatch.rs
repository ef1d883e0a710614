//! Routing of inbound events to the engine and the dialogue controller.
//!
//! Every failure inside an event is turned into reply text here; nothing an
//! actor sends can take the process down.

use chrono::Utc;
use reqdesk_core::{
  Engine, Error as CoreError,
  dialogue::{DialogueInput, Prompt},
  request::Status,
  store::RequestStore,
  user::{User, UserId},
};

use crate::{
  AppState,
  action::ActionTag,
  event::{InboundEvent, Payload, Reply},
  render,
};

/// Handle one inbound event and return the replies to send back.
pub async fn handle<S: RequestStore>(state: &AppState<S>, event: InboundEvent) -> Vec<Reply> {
  let actor = match state.engine.register(event.actor).await {
    Ok(actor) => actor,
    Err(e) => return vec![failure(&e)],
  };

  match event.payload {
    Payload::Button { tag } => vec![button(state, &actor, &tag).await],
    Payload::Text { text } => text_message(state, &actor, &text).await,
  }
}

fn log_failure(err: &CoreError) {
  match err {
    CoreError::Store(e) => tracing::error!(error = %e, "store failure while handling event"),
    other => tracing::debug!(error = %other, "event rejected"),
  }
}

fn failure(err: &CoreError) -> Reply {
  log_failure(err);
  Reply::text(render::error_text(err))
}

// ─── Buttons ─────────────────────────────────────────────────────────────────

async fn button<S: RequestStore>(state: &AppState<S>, actor: &User, tag: &str) -> Reply {
  let Ok(action) = tag.parse::<ActionTag>() else {
    tracing::warn!(tag, actor = actor.user_id, "unknown action tag");
    return render::unknown_action();
  };

  let event = action.event();
  match state.engine.transition(action.request_id(), event, actor).await {
    Ok(request) => render::transition_done(event, &request, actor, Utc::now()),
    Err(e) => failure(&e),
  }
}

// ─── Text ────────────────────────────────────────────────────────────────────

fn is_cancel(text: &str) -> bool { matches!(text, "/cancel" | render::CANCEL) }

async fn text_message<S: RequestStore>(state: &AppState<S>, actor: &User, text: &str) -> Vec<Reply> {
  let now = Utc::now();
  let dialogues = &state.dialogues;
  let text = text.trim();

  if is_cancel(text) {
    return match dialogues.advance(&*state.engine, actor, DialogueInput::Cancel, now).await {
      Some(prompt) => vec![render::prompt(&prompt, actor)],
      None => vec![render::nothing_to_cancel(actor)],
    };
  }

  // Pressing the create button again restarts the form.
  if text == render::CREATE {
    return vec![render::prompt(&dialogues.start(actor, now), actor)];
  }

  let input = DialogueInput::Text(text);
  if let Some(prompt) = dialogues.advance(&*state.engine, actor, input, now).await {
    if let Prompt::Failed(e) = &prompt {
      log_failure(e);
    }
    return vec![render::prompt(&prompt, actor)];
  }

  match text {
    "/start" => vec![render::greeting(actor)],
    "/help" | render::HELP => vec![render::help(actor)],
    render::ACTIVE | render::MINE => active_list(state, actor).await,
    render::COMPLETED => finished_list(state, actor, Status::Completed).await,
    render::CANCELLED => finished_list(state, actor, Status::Cancelled).await,
    _ => vec![render::unrecognised()],
  }
}

// ─── Listings ────────────────────────────────────────────────────────────────

async fn active_list<S: RequestStore>(state: &AppState<S>, actor: &User) -> Vec<Reply> {
  match state.engine.list_active().await {
    Ok(requests) if requests.is_empty() => vec![render::empty_list(Status::New, actor, 0)],
    Ok(requests) => requests.iter().map(|r| render::active_card(r, actor)).collect(),
    Err(e) => vec![failure(&e)],
  }
}

async fn finished_list<S: RequestStore>(
  state: &AppState<S>,
  actor: &User,
  status: Status,
) -> Vec<Reply> {
  if !actor.is_admin {
    let what = match status {
      Status::Completed => "completed requests",
      _ => "cancelled requests",
    };
    return vec![render::admin_only(what)];
  }

  let engine = &*state.engine;
  let window = engine.retention().days;
  let listed = match status {
    Status::Completed => engine.list_completed(window).await,
    _ => engine.list_cancelled(window).await,
  };
  let requests = match listed {
    Ok(requests) => requests,
    Err(e) => return vec![failure(&e)],
  };
  if requests.is_empty() {
    return vec![render::empty_list(status, actor, window)];
  }

  let now = Utc::now();
  let mut replies = Vec::with_capacity(requests.len());
  for request in &requests {
    let days_left = engine.retention().days_left(request, now);
    let reply = match status {
      Status::Completed => {
        let by = resolve(engine, request.completed_by).await;
        render::completed_card(request, by.as_ref(), days_left)
      }
      _ => {
        let by = resolve(engine, request.cancelled_by).await;
        render::cancelled_card(request, by.as_ref(), days_left)
      }
    };
    replies.push(reply);
  }
  replies
}

/// Look up an actor reference for display. Lookup failures render as
/// "unknown" rather than failing the whole listing.
async fn resolve<S: RequestStore>(engine: &Engine<S>, user_id: Option<UserId>) -> Option<User> {
  let user_id = user_id?;
  match engine.user(user_id).await {
    Ok(user) => user,
    Err(e) => {
      tracing::warn!(user_id, error = %e, "could not resolve actor");
      None
    }
  }
}
