//! Real-time document collections
//!
//! Server-side backing for the document variant of the remote task store.

mod store;

pub use store::{collection_path, DocumentStore};
