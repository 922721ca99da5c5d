//! File storage for originals, thumbnails, and HLS output.
//!
//! The `Storage` trait abstracts the backing filesystem so the processing
//! and API crates never touch paths directly; keys are validated against
//! path traversal before every operation.

pub mod keys;
pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
