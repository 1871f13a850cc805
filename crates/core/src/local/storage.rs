//! Directory-backed key/value storage
//!
//! Each key is one file under the storage directory. Values are replaced
//! whole; there is no locking, so two processes sharing a directory race
//! with last-write-wins.

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::Result;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Read a value, `None` if the key has never been written
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace a value; readers see either the old or the new contents
    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.tmp", key));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn remove_item(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        assert!(storage.get_item("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("nested"));

        storage.set_item("greeting", "hello").await.unwrap();
        assert_eq!(
            storage.get_item("greeting").await.unwrap().as_deref(),
            Some("hello")
        );

        storage.set_item("greeting", "bye").await.unwrap();
        assert_eq!(
            storage.get_item("greeting").await.unwrap().as_deref(),
            Some("bye")
        );

        storage.remove_item("greeting").await.unwrap();
        assert!(storage.get_item("greeting").await.unwrap().is_none());

        // Removing twice is fine
        storage.remove_item("greeting").await.unwrap();
    }
}
