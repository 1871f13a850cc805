//! Client library for Bunny Todo
//!
//! - Remote task stores: the REST todos API and device-scoped document collections
//! - Live snapshot subscriptions over server-sent events
//! - Sync adapter with local-storage fallback
//! - View state: filtering, toggles, delete confirmation and user notices

pub mod config;
pub mod document;
pub mod error;
pub mod remote;
pub mod rest;
pub mod session;
pub mod subscription;
pub mod sync;
pub mod transfer;
pub mod view;

#[cfg(test)]
mod test_support;

pub use config::{Backend, ClientConfig};
pub use document::DocumentTaskStore;
pub use error::{Result, SyncError};
pub use remote::RemoteTaskStore;
pub use rest::RestTaskStore;
pub use session::TodoSession;
pub use subscription::{Snapshot, SnapshotSource, Subscription};
pub use sync::{CommitTarget, Committed, SyncAdapter, SyncStatus};
pub use transfer::{ExportDocument, ImportReport};
pub use view::{Confirm, Filter, Notice, NoticeLevel, TaskRow, TodoView};
