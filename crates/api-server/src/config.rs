//! Server configuration from environment variables

use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub documents_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".todo-data"),
            port: 5000,
            documents_enabled: true,
        }
    }
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    parse_flag(std::env::var(name).ok().as_deref(), default)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let data_dir = std::env::var("TODO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let port = match std::env::var("TODO_PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid TODO_PORT {:?}", raw);
                defaults.port
            }),
            Err(_) => defaults.port,
        };

        Self {
            data_dir,
            port,
            documents_enabled: env_flag("TODO_DOCUMENTS", defaults.documents_enabled),
        }
    }
}
