//! Task module
//!
//! This module contains the task model and the SQLite-backed repository
//! served by the REST API.

mod model;
mod repository;
mod sqlite_store;

pub use model::*;
pub use repository::TaskRepository;
pub use sqlite_store::SqliteTaskStore;
