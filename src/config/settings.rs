//! Process settings from environment variables (a `.env` file is honoured).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_PG_SCHEMA: &str = "apikit";
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgres {
        database_url: String,
        schema: String,
        max_connections: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// Mount point of the API router; starts with `/`, no trailing slash.
    pub api_prefix: String,
    pub storage: StorageKind,
    /// JSON schema file; `None` leaves schema setup to the caller.
    pub schema_path: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Settings {
    /// Load `.env` (if any) and read the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any name -> value lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = get("APIKIT_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| setting("APIKIT_BIND_ADDR", e))?;

        let api_prefix = normalize_prefix(get("APIKIT_API_PREFIX").as_deref().unwrap_or(DEFAULT_API_PREFIX))?;

        let storage = match get("APIKIT_STORAGE").as_deref().unwrap_or("memory") {
            "memory" => StorageKind::Memory,
            "postgres" => StorageKind::Postgres {
                database_url: get("DATABASE_URL").ok_or_else(|| ConfigError::Setting {
                    name: "DATABASE_URL",
                    reason: "required when APIKIT_STORAGE=postgres".into(),
                })?,
                schema: get("APIKIT_PG_SCHEMA").unwrap_or_else(|| DEFAULT_PG_SCHEMA.to_string()),
                max_connections: match get("APIKIT_PG_MAX_CONNECTIONS") {
                    Some(v) => v.parse().map_err(|e| setting("APIKIT_PG_MAX_CONNECTIONS", e))?,
                    None => DEFAULT_PG_MAX_CONNECTIONS,
                },
            },
            other => {
                return Err(ConfigError::Setting {
                    name: "APIKIT_STORAGE",
                    reason: format!("expected 'memory' or 'postgres', got '{}'", other),
                })
            }
        };

        let max_body_bytes = match get("APIKIT_MAX_BODY_BYTES") {
            Some(v) => v.parse().map_err(|e| setting("APIKIT_MAX_BODY_BYTES", e))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Settings {
            bind_addr,
            api_prefix,
            storage,
            schema_path: get("APIKIT_SCHEMA_PATH").map(PathBuf::from),
            max_body_bytes,
        })
    }
}

fn setting(name: &'static str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Setting {
        name,
        reason: err.to_string(),
    }
}

fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') {
        return Err(ConfigError::Setting {
            name: "APIKIT_API_PREFIX",
            reason: format!("must start with '/' and name a path segment, got '{}'", raw),
        });
    }
    Ok(trimmed.to_string())
}
