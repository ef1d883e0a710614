//! Core types and trait definitions for the reqdesk equipment-request tracker.
//!
//! Holds the lifecycle rules, the creation dialogue and the storage
//! abstraction. No HTTP or database code lives here.

pub mod dialogue;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod request;
pub mod retention;
pub mod store;
pub mod user;

pub use engine::Engine;
pub use error::{Error, Result};
