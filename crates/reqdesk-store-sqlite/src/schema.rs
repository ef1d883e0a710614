//! SQL schema for the reqdesk SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id INTEGER NOT NULL UNIQUE,   -- external identity
    username    TEXT,
    is_admin    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS requests (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id              INTEGER NOT NULL REFERENCES users(id),
    equipment_name       TEXT NOT NULL,
    quantity             INTEGER NOT NULL CHECK (quantity > 0),
    description          TEXT NOT NULL,
    priority             TEXT NOT NULL,   -- 'high' | 'medium' | 'low'
    status               TEXT NOT NULL DEFAULT 'new',
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    completed_at         TEXT,
    deleted_at           TEXT,
    is_deleted           INTEGER NOT NULL DEFAULT 0,
    notes                TEXT,
    estimated_completion TEXT,
    -- Weak references: identify the actor, never cascade.
    completed_by_id      INTEGER REFERENCES users(id),
    cancelled_by_id      INTEGER REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS requests_status_idx ON requests(status);
CREATE INDEX IF NOT EXISTS users_admin_idx     ON users(is_admin);

PRAGMA user_version = 1;
";
