//! [`SqliteStore`], the SQLite implementation of [`RequestStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use reqdesk_core::{
  request::{NewRequest, Request, RequestId, Status},
  store::RequestStore,
  user::{ActorIdentity, User, UserId},
};

use crate::{
  Error, Result,
  encode::{REQUEST_COLUMNS, RawRequest, RawUser, USER_COLUMNS, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A request store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_where(&self, clause: &'static str, value: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} = ?1"),
            rusqlite::params![value],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  /// Run raw SQL against the connection, for seeding legacy-shaped rows.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: impl Into<String>) -> Result<()> {
    let sql = sql.into();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Re-read a user after a write so the result always reflects the row.
  async fn reload_user(&self, external_id: i64) -> Result<User> {
    self
      .user_where("telegram_id", external_id)
      .await?
      .ok_or(Error::RowVanished("users"))
  }
}

// ─── RequestStore impl ───────────────────────────────────────────────────────

impl RequestStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn ensure_user(&self, identity: ActorIdentity) -> Result<User> {
    let at_str = encode_dt(Utc::now());
    let external_id = identity.external_id;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (telegram_id, username, is_admin, created_at)
           VALUES (?1, ?2, 0, ?3)
           ON CONFLICT (telegram_id) DO NOTHING",
          rusqlite::params![identity.external_id, identity.handle, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.reload_user(external_id).await
  }

  async fn find_user(&self, external_id: i64) -> Result<Option<User>> {
    self.user_where("telegram_id", external_id).await
  }

  async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
    self.user_where("id", user_id).await
  }

  async fn grant_admin(&self, identity: ActorIdentity) -> Result<User> {
    let at_str = encode_dt(Utc::now());
    let external_id = identity.external_id;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (telegram_id, username, is_admin, created_at)
           VALUES (?1, ?2, 1, ?3)
           ON CONFLICT (telegram_id) DO UPDATE SET
             is_admin = 1,
             username = COALESCE(excluded.username, users.username)",
          rusqlite::params![identity.external_id, identity.handle, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.reload_user(external_id).await
  }

  async fn revoke_admin(&self, external_id: i64) -> Result<Option<User>> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET is_admin = 0 WHERE telegram_id = ?1",
          rusqlite::params![external_id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.find_user(external_id).await
  }

  async fn list_admins(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users WHERE is_admin = 1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Requests ──────────────────────────────────────────────────────────────

  async fn insert_request(&self, creator: UserId, input: NewRequest) -> Result<Request> {
    let at_str = encode_dt(Utc::now());

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO requests (
             user_id, equipment_name, quantity, description, priority,
             status, created_at, updated_at, is_deleted, notes
           ) VALUES (?1, ?2, ?3, ?4, ?5, 'new', ?6, ?6, 0, ?7)",
          rusqlite::params![
            creator,
            input.equipment_name,
            input.quantity,
            input.description,
            input.priority.as_str(),
            at_str,
            input.notes,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    self.get_request(id).await?.ok_or(Error::RowVanished("requests"))
  }

  async fn get_request(&self, id: RequestId) -> Result<Option<Request>> {
    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1"),
            rusqlite::params![id],
            RawRequest::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn list_by_status(&self, statuses: &[Status]) -> Result<Vec<Request>> {
    if statuses.is_empty() {
      return Ok(Vec::new());
    }
    let names: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let placeholders = (1..=names.len())
          .map(|i| format!("?{i}"))
          .collect::<Vec<_>>()
          .join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS} FROM requests
           WHERE is_deleted = 0 AND status IN ({placeholders})
           ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(names.iter()), RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn list_finished_all(&self) -> Result<Vec<Request>> {
    let raws: Vec<RawRequest> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS} FROM requests
           WHERE status IN ('completed', 'cancelled')
           ORDER BY id"
        ))?;
        let rows = stmt
          .query_map([], RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn update_request(&self, expected: Status, request: &Request) -> Result<bool> {
    let id               = request.request_id;
    let expected_str     = expected.as_str();
    let status_str       = request.status.as_str();
    let updated_at_str   = encode_dt(request.updated_at);
    let completed_at_str = request.completed_at.map(encode_dt);
    let completed_by     = request.completed_by;
    let cancelled_by     = request.cancelled_by;
    let notes            = request.notes.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE requests SET
             status = ?3, updated_at = ?4, completed_at = ?5,
             completed_by_id = ?6, cancelled_by_id = ?7, notes = ?8
           WHERE id = ?1 AND status = ?2",
          rusqlite::params![
            id,
            expected_str,
            status_str,
            updated_at_str,
            completed_at_str,
            completed_by,
            cancelled_by,
            notes,
          ],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn delete_request(&self, id: RequestId, expected: Status) -> Result<bool> {
    let expected_str = expected.as_str();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM requests WHERE id = ?1 AND status = ?2",
          rusqlite::params![id, expected_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn delete_requests(&self, ids: &[RequestId]) -> Result<usize> {
    let ids = ids.to_vec();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
          let mut stmt = tx.prepare(
            "DELETE FROM requests
             WHERE id = ?1 AND status IN ('completed', 'cancelled')",
          )?;
          for id in &ids {
            removed += stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    tracing::debug!(removed, "deleted requests");
    Ok(removed)
  }
}
