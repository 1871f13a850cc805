use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SyncError;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_STORAGE_DIR: &str = ".todo-local";

/// Which remote store the client talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    Rest,
    #[default]
    Documents,
}

impl FromStr for Backend {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "documents" | "document" => Ok(Self::Documents),
            other => Err(SyncError::validation(format!("Unknown backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub storage_dir: PathBuf,
    pub backend: Backend,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            backend: Backend::default(),
        }
    }
}

impl ClientConfig {
    /// Read `TODO_API_URL`, `TODO_STORAGE_DIR` and `TODO_BACKEND`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let backend = match lookup("TODO_BACKEND") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using documents", e);
                Backend::default()
            }),
            None => defaults.backend,
        };

        Self {
            api_url: non_empty(lookup("TODO_API_URL")).unwrap_or(defaults.api_url),
            storage_dir: non_empty(lookup("TODO_STORAGE_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            backend,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
