//! Live collection snapshots
//!
//! A [`Subscription`] is a typed stream of full-list snapshots fed by a
//! background task reading the server's `text/event-stream`. Each snapshot
//! replaces the previous one wholesale. If the stream cannot be opened or
//! breaks, the subscriber gets one snapshot of local storage and the stream
//! ends.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use todo_core::local::LocalTaskStore;
use todo_core::task::Task;

use crate::error::{Result, SyncError};

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Remote,
    /// Subscription failed; this is the local cache instead
    Local,
}

/// Full ordered task list at one moment
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub source: SnapshotSource,
}

impl Snapshot {
    pub fn is_local(&self) -> bool {
        self.source == SnapshotSource::Local
    }
}

/// Handle on a running subscription; dropping it unsubscribes
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Wait for the next snapshot; `None` once the subscription has ended
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Stop listening for changes
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start streaming snapshots from `url`
pub(crate) fn spawn(client: Client, url: String, local: LocalTaskStore) -> Subscription {
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(async move {
        debug!("Subscribing to {}", url);
        if let Err(e) = stream_snapshots(&client, &url, &tx).await {
            warn!("Error subscribing to todos, using local storage: {}", e);
            let tasks = local.load_all().await;
            let _ = tx
                .send(Snapshot {
                    tasks,
                    source: SnapshotSource::Local,
                })
                .await;
        }
    });

    Subscription { rx, handle }
}

/// Forward every `data:` frame as a snapshot until the stream fails
///
/// Returns `Ok` only when the subscriber went away.
async fn stream_snapshots(client: &Client, url: &str, tx: &mpsc::Sender<Snapshot>) -> Result<()> {
    let res = client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| SyncError::transport("Failed to open snapshot stream", e))?;

    if !res.status().is_success() {
        return Err(SyncError::Status {
            status: res.status().as_u16(),
            message: "snapshot stream rejected".to_string(),
        });
    }

    let mut stream = res.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(item) = stream.next().await {
        let chunk: Bytes = item.map_err(|e| SyncError::transport("Snapshot stream error", e))?;
        buffer.extend_from_slice(&chunk);

        // Split on raw bytes; a chunk may end mid-character
        while let Some(idx) = find_frame_end(&buffer) {
            let frame: Vec<u8> = buffer.drain(..idx + 2).collect();
            let Some(tasks) = parse_frame(&String::from_utf8_lossy(&frame))? else {
                continue;
            };
            debug!("Snapshot received: {} items", tasks.len());
            let snapshot = Snapshot {
                tasks,
                source: SnapshotSource::Remote,
            };
            if tx.send(snapshot).await.is_err() {
                return Ok(());
            }
        }
    }

    Err(SyncError::unavailable("Snapshot stream closed by server"))
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Decode one server-sent event; comments and keep-alives yield `None`
fn parse_frame(frame: &str) -> Result<Option<Vec<Task>>> {
    let data: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    if data.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&data.join("\n"))
        .map(Some)
        .map_err(|e| SyncError::InvalidResponse {
            message: format!("Bad snapshot: {}", e),
        })
}
