//! Client session wiring
//!
//! Resolves the device identity, opens local storage and builds the remote
//! store selected by [`ClientConfig::backend`].

use std::sync::Arc;

use tracing::info;

use todo_core::local::{self, LocalStorage, LocalTaskStore};
use todo_core::task::Progress;

use crate::config::{Backend, ClientConfig};
use crate::document::DocumentTaskStore;
use crate::error::{Result, SyncError};
use crate::remote::RemoteTaskStore;
use crate::rest::RestTaskStore;
use crate::subscription::Subscription;
use crate::sync::SyncAdapter;
use crate::transfer::{self, ExportDocument, ImportReport};
use crate::view::TodoView;

enum Remote {
    Rest(Arc<RestTaskStore>),
    Documents(Arc<DocumentTaskStore>),
}

impl Remote {
    fn as_store(&self) -> Arc<dyn RemoteTaskStore> {
        match self {
            Self::Rest(store) => store.clone(),
            Self::Documents(store) => store.clone(),
        }
    }
}

pub struct TodoSession {
    device_id: String,
    local: LocalTaskStore,
    remote: Remote,
}

impl TodoSession {
    pub async fn open(config: &ClientConfig) -> Result<Self> {
        let storage = LocalStorage::new(&config.storage_dir);
        let device_id = local::device_id(&storage).await?;

        let remote = match config.backend {
            Backend::Rest => Remote::Rest(Arc::new(RestTaskStore::new(config.api_url.clone()))),
            Backend::Documents => Remote::Documents(Arc::new(DocumentTaskStore::new(
                config.api_url.clone(),
                device_id.clone(),
            ))),
        };

        info!(
            "Session opened for {} ({} backend at {})",
            device_id,
            remote.as_store().name(),
            config.api_url
        );

        Ok(Self {
            device_id,
            local: LocalTaskStore::new(storage),
            remote,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn local(&self) -> &LocalTaskStore {
        &self.local
    }

    pub fn adapter(&self) -> SyncAdapter {
        SyncAdapter::new(self.remote.as_store(), self.local.clone())
    }

    pub fn view(&self) -> TodoView {
        TodoView::new(self.adapter())
    }

    /// Live snapshots; only the document backend supports them
    pub fn subscribe(&self) -> Option<Subscription> {
        match &self.remote {
            Remote::Documents(store) => Some(store.subscribe(self.local.clone())),
            Remote::Rest(_) => None,
        }
    }

    /// Copy locally cached tasks into the device collection
    ///
    /// Only the document backend keeps completion state and the local id a
    /// task came from, so REST sessions refuse.
    pub async fn import_from_local(&self) -> Result<ImportReport> {
        match &self.remote {
            Remote::Documents(store) => {
                transfer::import_from_local(store.as_ref(), &self.local).await
            }
            Remote::Rest(store) => Err(SyncError::Unsupported {
                operation: "Import",
                backend: store.name(),
            }),
        }
    }

    pub async fn export(&self) -> Result<ExportDocument> {
        transfer::export(self.remote.as_store().as_ref(), Some(&self.device_id)).await
    }

    /// Server-side statistics for REST, computed from the collection otherwise
    pub async fn progress(&self) -> Result<Progress> {
        match &self.remote {
            Remote::Rest(store) => store.progress().await,
            Remote::Documents(store) => Ok(Progress::of(&store.list().await?)),
        }
    }
}
