//! Chat front end for reqdesk.
//!
//! A messaging gateway posts each inbound event to `POST /events` and relays
//! the returned replies. Conversation logic lives in [`dispatch`]; message
//! wording and keyboards in [`render`].

pub mod action;
pub mod auth;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod render;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::{State, rejection::JsonRejection},
  routing::{get, post},
};
use chrono::{TimeDelta, Utc};
use reqdesk_core::{
  Engine,
  dialogue::{DEFAULT_SESSION_TTL_MINUTES, DialogueController},
  retention::{DEFAULT_RETENTION_DAYS, RetentionPolicy},
  store::RequestStore,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, Authenticated};
use event::{EventResponse, InboundEvent};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `REQDESK_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  #[serde(default = "default_store_path")]
  pub store_path:            PathBuf,
  #[serde(default = "default_retention_days")]
  pub retention_days:        i64,
  #[serde(default = "default_session_ttl")]
  pub session_ttl_minutes:   i64,
  pub gateway_username:      String,
  pub gateway_password_hash: String,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("requests.db") }
fn default_retention_days() -> i64 { DEFAULT_RETENTION_DAYS }
fn default_session_ttl() -> i64 { DEFAULT_SESSION_TTL_MINUTES }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub engine:    Arc<Engine<S>>,
  pub dialogues: Arc<DialogueController>,
  pub auth:      Arc<AuthConfig>,
  pub config:    Arc<BotConfig>,
}

impl<S: RequestStore> AppState<S> {
  pub fn new(store: S, config: BotConfig) -> Self {
    let engine = Engine::new(store, RetentionPolicy::new(config.retention_days));
    let dialogues = DialogueController::new(TimeDelta::minutes(config.session_ttl_minutes));
    let auth = AuthConfig {
      username:      config.gateway_username.clone(),
      password_hash: config.gateway_password_hash.clone(),
    };
    Self {
      engine:    Arc::new(engine),
      dialogues: Arc::new(dialogues),
      auth:      Arc::new(auth),
      config:    Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

pub fn router<S>(state: AppState<S>) -> Router
where
  S: RequestStore + Clone + 'static,
{
  Router::new()
    .route("/health",            get(health))
    .route("/events",            post(events::<S>))
    .route("/maintenance/purge", post(purge::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

async fn events<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  body: Result<Json<InboundEvent>, JsonRejection>,
) -> Result<Json<EventResponse>, Error>
where
  S: RequestStore + Clone + 'static,
{
  let Json(event) = body.map_err(|e| Error::BadRequest(e.body_text()))?;
  let replies = dispatch::handle(&state, event).await;
  Ok(Json(EventResponse { replies }))
}

async fn purge<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<Value>, Error>
where
  S: RequestStore + Clone + 'static,
{
  let removed = state.engine.purge_expired(Utc::now()).await?;
  Ok(Json(json!({ "removed": removed })))
}

#[cfg(test)]
mod tests {
  use super::*;
  use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use rand_core::OsRng;
  use reqdesk_core::user::ActorIdentity;
  use reqdesk_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use crate::event::Reply;

  const ADMIN: i64 = 100;
  const EMPLOYEE: i64 = 200;

  fn cheap_hash(password: &str) -> String {
    let params = Params::new(8, 1, 1, None).unwrap();
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .grant_admin(ActorIdentity::new(ADMIN, Some("boss".into())))
      .await
      .unwrap();
    AppState::new(store, BotConfig {
      host:                  default_host(),
      port:                  default_port(),
      store_path:            PathBuf::from(":memory:"),
      retention_days:        30,
      session_ttl_minutes:   30,
      gateway_username:      "gateway".into(),
      gateway_password_hash: cheap_hash("secret"),
    })
  }

  fn basic() -> String { format!("Basic {}", B64.encode("gateway:secret")) }

  async fn post_json(state: &AppState<SqliteStore>, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::AUTHORIZATION, basic())
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    let res = router(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }

  async fn send(state: &AppState<SqliteStore>, actor: i64, payload: Value) -> Vec<Reply> {
    let body = json!({ "actor": { "external_id": actor, "handle": null }, "payload": payload });
    let (status, value) = post_json(state, "/events", body).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(value["replies"].clone()).unwrap()
  }

  async fn say(state: &AppState<SqliteStore>, actor: i64, text: &str) -> Vec<Reply> {
    send(state, actor, json!({ "kind": "text", "text": text })).await
  }

  async fn press(state: &AppState<SqliteStore>, actor: i64, tag: &str) -> Vec<Reply> {
    send(state, actor, json!({ "kind": "button", "tag": tag })).await
  }

  fn actions(reply: &Reply) -> Vec<&str> { reply.buttons.iter().map(|b| b.action.as_str()).collect() }

  #[tokio::test]
  async fn health_needs_no_credentials() {
    let state = make_state().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let res = router(state).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn events_require_credentials() {
    let state = make_state().await;
    let req = Request::builder()
      .method("POST")
      .uri("/events")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{}"))
      .unwrap();
    let res = router(state).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn malformed_event_is_bad_request() {
    let state = make_state().await;
    let (status, body) = post_json(&state, "/events", json!({ "actor": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn start_greets_by_role() {
    let state = make_state().await;

    let employee = say(&state, EMPLOYEE, "/start").await;
    assert!(employee[0].text.contains("employee"));
    assert_eq!(employee[0].menu, Some(render::main_menu(false)));

    let admin = say(&state, ADMIN, "/start").await;
    assert!(admin[0].text.contains("administrator"));
    assert_eq!(admin[0].menu, Some(render::main_menu(true)));
  }

  #[tokio::test]
  async fn request_lifecycle_over_http() {
    let state = make_state().await;

    // Admin walks the creation form, fixing a bad quantity on the way.
    say(&state, ADMIN, render::CREATE).await;
    say(&state, ADMIN, "Drill").await;
    let reprompt = say(&state, ADMIN, "two").await;
    assert!(reprompt[0].text.contains("number"));
    say(&state, ADMIN, "2").await;
    say(&state, ADMIN, "for site B").await;
    let created = say(&state, ADMIN, "🔴 High").await;
    assert!(created[0].text.contains("#1"), "{}", created[0].text);

    // The employee sees it with accept and decline buttons.
    let listed = say(&state, EMPLOYEE, render::MINE).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(actions(&listed[0]), vec!["complete_1", "cancel_1"]);

    // The admin only gets a reject button on the same request.
    let listed = say(&state, ADMIN, render::ACTIVE).await;
    assert_eq!(actions(&listed[0]), vec!["reject_1"]);

    let accepted = press(&state, EMPLOYEE, "complete_1").await;
    assert!(accepted[0].text.contains("accepted"));

    let completed = say(&state, ADMIN, render::COMPLETED).await;
    assert_eq!(completed.len(), 1);
    assert_eq!(actions(&completed[0]), vec!["restore_completed_1", "delete_completed_1"]);
    assert!(completed[0].text.contains("ID 200"));

    let restored = press(&state, ADMIN, "restore_completed_1").await;
    assert!(restored[0].text.contains("restored"));
    assert_eq!(say(&state, EMPLOYEE, render::MINE).await.len(), 1);
  }

  #[tokio::test]
  async fn employees_cannot_create_or_browse_history() {
    let state = make_state().await;

    let denied = say(&state, EMPLOYEE, render::CREATE).await;
    assert!(denied[0].text.contains("Only administrators"));
    // No dialogue was opened, so the next message is not swallowed.
    let next = say(&state, EMPLOYEE, "Drill").await;
    assert!(next[0].text.contains("not recognised"));

    let history = say(&state, EMPLOYEE, render::COMPLETED).await;
    assert!(history[0].text.contains("Only administrators"));
  }

  #[tokio::test]
  async fn cancel_leaves_dialogue() {
    let state = make_state().await;
    say(&state, ADMIN, render::CREATE).await;
    say(&state, ADMIN, "Drill").await;
    let cancelled = say(&state, ADMIN, render::CANCEL).await;
    assert!(cancelled[0].text.contains("cancelled"));
    assert!(say(&state, ADMIN, "/cancel").await[0].text.contains("nothing to cancel"));
    assert!(say(&state, ADMIN, render::ACTIVE).await[0].text.contains("No active requests"));
  }

  #[tokio::test]
  async fn bad_buttons_are_reported() {
    let state = make_state().await;
    assert!(press(&state, ADMIN, "launch_7").await[0].text.contains("Unknown action"));
    assert!(press(&state, EMPLOYEE, "complete_99").await[0].text.contains("not found"));
  }

  #[tokio::test]
  async fn employee_reject_is_denied() {
    let state = make_state().await;
    let admin = state.engine.register(ActorIdentity::new(ADMIN, None)).await.unwrap();
    let request = state
      .engine
      .create(&admin, reqdesk_core::request::NewRequest::new(
        "Ladder",
        1,
        "roof",
        reqdesk_core::request::Priority::Low,
      ))
      .await
      .unwrap();

    let tag = format!("reject_{}", request.request_id);
    assert!(press(&state, EMPLOYEE, &tag).await[0].text.contains("Access denied"));
  }

  #[tokio::test]
  async fn purge_reports_count() {
    let state = make_state().await;
    let (status, body) = post_json(&state, "/maintenance/purge", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 0);
  }

  #[tokio::test]
  async fn priority_labels_do_not_rewrite_free_text() {
    let state = make_state().await;
    say(&state, ADMIN, render::CREATE).await;
    say(&state, ADMIN, "🔴 High").await;
    say(&state, ADMIN, "1").await;
    say(&state, ADMIN, "🟢 Low").await;
    let created = say(&state, ADMIN, "low").await;
    assert!(created[0].text.contains("#1"), "{}", created[0].text);

    let stored = state.engine.list_active().await.unwrap();
    assert_eq!(stored[0].equipment_name, "🔴 High");
    assert_eq!(stored[0].description, "🟢 Low");
  }

  #[tokio::test]
  async fn failed_create_discards_the_session() {
    let state = make_state().await;
    say(&state, ADMIN, render::CREATE).await;
    say(&state, ADMIN, "Drill").await;
    say(&state, ADMIN, "2").await;
    say(&state, ADMIN, "for site B").await;

    state.engine.store().revoke_admin(ADMIN).await.unwrap();

    let failed = say(&state, ADMIN, "🔴 High").await;
    assert!(failed[0].text.contains("Access denied"), "{}", failed[0].text);
    assert!(state.engine.list_active().await.unwrap().is_empty());

    let next = say(&state, ADMIN, "Drill").await;
    assert!(next[0].text.contains("not recognised"), "{}", next[0].text);
  }

  #[tokio::test]
  async fn commands_inside_the_form_reprompt() {
    let state = make_state().await;
    say(&state, ADMIN, render::CREATE).await;
    let reprompt = say(&state, ADMIN, "/help").await;
    assert!(reprompt[0].text.contains("Commands cannot be used here"));

    // Still on the first step.
    say(&state, ADMIN, "Drill").await;
    say(&state, ADMIN, "2").await;
    say(&state, ADMIN, "for site B").await;
    say(&state, ADMIN, "medium").await;
    let stored = state.engine.list_active().await.unwrap();
    assert_eq!(stored[0].equipment_name, "Drill");
  }
}
