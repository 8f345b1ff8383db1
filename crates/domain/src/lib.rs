//! Shared types for guardian: the error taxonomy, configuration, and
//! structured trace events.

pub mod config;
pub mod error;
pub mod trace;

pub use error::{EncodeError, Error, Result};
