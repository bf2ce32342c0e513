//! Shared domain types for the NeuroLock workspace.

pub mod config;
pub mod events;
pub mod features;
pub mod session;
pub mod vision;

mod errors;

pub use errors::{NeuroLockError, Result};
