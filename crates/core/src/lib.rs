//! Core library for Bunny Todo
//!
//! This crate contains the storage-independent pieces of the app:
//! - Task model, validation and progress statistics
//! - Device-local storage (task cache and device identity)
//! - Server-side stores (SQLite todos, device-scoped document collections)

pub mod document;
pub mod error;
pub mod local;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
