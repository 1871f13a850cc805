//! Device-local storage
//!
//! Key/value storage shared by every backend variant, the cached task list
//! kept under `bunny-todos`, and the anonymous device identity.

mod device;
mod storage;
mod task_store;

pub use device::{device_id, DEVICE_ID_KEY};
pub use storage::LocalStorage;
pub use task_store::{LocalTaskStore, TASKS_KEY};
