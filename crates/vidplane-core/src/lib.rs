//! Core domain types for the Vidplane video platform.
//!
//! Models, the static plan catalog, quota decision logic, configuration,
//! and the unified `AppError` type live here so the storage, database,
//! processing, and API crates can share them without depending on each
//! other.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
