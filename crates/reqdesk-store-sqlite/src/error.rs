//! Error type for `reqdesk-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row written moments ago could not be read back.
  #[error("row vanished from {0} after write")]
  RowVanished(&'static str),

  #[error("corrupt column {column}: {message}")]
  Decode {
    column:  &'static str,
    message: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
