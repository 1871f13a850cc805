//! Anonymous device identity
//!
//! Remote records are scoped to a device id generated on first use and kept
//! in local storage. There is no authentication behind it.

use chrono::Utc;
use rand::Rng;

use super::storage::LocalStorage;
use crate::Result;

/// Storage key holding the device identifier
pub const DEVICE_ID_KEY: &str = "bunny_device_id";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn generate_device_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("device_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Return the stored device id, creating and persisting one if absent
pub async fn device_id(storage: &LocalStorage) -> Result<String> {
    if let Some(existing) = storage.get_item(DEVICE_ID_KEY).await? {
        let existing = existing.trim();
        if !existing.is_empty() {
            tracing::debug!("Using existing device ID: {}", existing);
            return Ok(existing.to_string());
        }
    }

    let id = generate_device_id();
    storage.set_item(DEVICE_ID_KEY, &id).await?;
    tracing::info!("Created new device ID: {}", id);
    Ok(id)
}
