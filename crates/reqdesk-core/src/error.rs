//! Error types for `reqdesk-core`.

use thiserror::Error;

use crate::{
  lifecycle::Event,
  request::{RequestId, Status, ValidationError},
  user::UserId,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid request: {0}")]
  Validation(#[from] ValidationError),

  #[error("user {actor} is not permitted to {action}")]
  Unauthorized {
    actor:  UserId,
    action: &'static str,
  },

  #[error("request not found: {0}")]
  RequestNotFound(RequestId),

  #[error("cannot {verb} a request that is {from}", verb = .event.verb())]
  InvalidTransition { from: Status, event: Event },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap any backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
