//! Server settings
//!
//! Defaults live here; every field can be overridden with a `LINKRELAY_*`
//! environment variable (`LINKRELAY_MAX_QUEUE_SIZE=50`, ...).

use anyhow::{bail, Context, Result};
use config::{Config, Environment};
use linkrelay_core::domain::queue::{
    DEFAULT_ITEM_TTL_SECONDS, DEFAULT_MAX_DELIVER_PER_POLL, DEFAULT_MAX_QUEUE_SIZE,
    DEFAULT_QUEUE_KEY_PREFIX,
};
use linkrelay_core::domain::token::{
    DEFAULT_ALPHABET, DEFAULT_MARKER_OFFSET, DEFAULT_TOKEN_LENGTH, DEFAULT_TOKEN_MARKER,
};
use linkrelay_core::domain::{QueueSettings, TokenFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "LINKRELAY";
const DEFAULT_DB_PATH: &str = "~/.linkrelay/queue.db";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";

/// Where queued links are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Upstash,
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "upstash" => Ok(Backend::Upstash),
            "memory" => Ok(Backend::Memory),
            "redis" => bail!(
                "Backend 'redis' is not supported over TCP; use 'upstash' with the REST URL and token"
            ),
            other => bail!("Unknown backend '{}' (expected sqlite, upstash or memory)", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub backend: Option<String>,
    pub db_path: String,
    pub maintenance_interval_secs: u64,

    pub token_length: usize,
    pub token_marker: String,
    pub token_marker_offset: usize,
    pub token_alphabet: String,

    pub queue_key_prefix: String,
    pub max_queue_size: usize,
    pub max_deliver_per_poll: usize,
    pub queue_item_ttl_seconds: u64,
}

impl Settings {
    /// Defaults overlaid with the process environment
    pub fn load() -> Result<Self> {
        Self::from_env_source(None)
    }

    /// `vars` replaces the process environment when given
    fn from_env_source(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let config = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("public_base_url", DEFAULT_PUBLIC_BASE_URL)?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("maintenance_interval_secs", 3600)?
            .set_default("token_length", DEFAULT_TOKEN_LENGTH as u64)?
            .set_default("token_marker", DEFAULT_TOKEN_MARKER)?
            .set_default("token_marker_offset", DEFAULT_MARKER_OFFSET as u64)?
            .set_default("token_alphabet", DEFAULT_ALPHABET)?
            .set_default("queue_key_prefix", DEFAULT_QUEUE_KEY_PREFIX)?
            .set_default("max_queue_size", DEFAULT_MAX_QUEUE_SIZE as u64)?
            .set_default("max_deliver_per_poll", DEFAULT_MAX_DELIVER_PER_POLL as u64)?
            .set_default("queue_item_ttl_seconds", DEFAULT_ITEM_TTL_SECONDS)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read settings")?;

        config
            .try_deserialize()
            .context("Invalid LINKRELAY_* setting")
    }

    pub fn token_format(&self) -> Result<TokenFormat> {
        TokenFormat::new(
            self.token_length,
            &self.token_marker,
            self.token_marker_offset,
            &self.token_alphabet,
        )
        .context("Invalid token format settings")
    }

    pub fn queue_settings(&self) -> Result<QueueSettings> {
        let settings = QueueSettings {
            key_prefix: self.queue_key_prefix.clone(),
            max_queue_size: self.max_queue_size,
            max_deliver_per_poll: self.max_deliver_per_poll,
            item_ttl_seconds: self.queue_item_ttl_seconds,
        };
        settings.validate().context("Invalid queue settings")?;
        Ok(settings)
    }

    /// Explicit choice wins; otherwise hosted credentials select Upstash
    pub fn backend(&self, upstash_credentials: bool) -> Result<Backend> {
        match &self.backend {
            Some(name) => name.parse(),
            None if upstash_credentials => Ok(Backend::Upstash),
            None => Ok(Backend::Sqlite),
        }
    }

    pub fn database_url(&self) -> String {
        if self.db_path.contains(":memory:") {
            return self.db_path.clone();
        }
        format!("sqlite://{}", shellexpand::tilde(&self.db_path))
    }

    /// Directory that must exist before SQLite can create the file
    pub fn db_dir(&self) -> Option<PathBuf> {
        if self.db_path.contains(":memory:") {
            return None;
        }
        let path = PathBuf::from(shellexpand::tilde(&self.db_path).into_owned());
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_env_source(vars(&[])).unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.queue_settings().unwrap(), QueueSettings::default());
        assert_eq!(settings.token_format().unwrap(), TokenFormat::default());
        assert_eq!(settings.backend(false).unwrap(), Backend::Sqlite);
        assert_eq!(settings.backend(true).unwrap(), Backend::Upstash);
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::from_env_source(vars(&[
            ("LINKRELAY_PORT", "8080"),
            ("LINKRELAY_MAX_QUEUE_SIZE", "5"),
            ("LINKRELAY_BACKEND", "memory"),
            ("LINKRELAY_PUBLIC_BASE_URL", "https://relay.example"),
        ]))
        .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.queue_settings().unwrap().max_queue_size, 5);
        assert_eq!(settings.backend(true).unwrap(), Backend::Memory);
        assert_eq!(settings.public_base_url, "https://relay.example");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let settings =
            Settings::from_env_source(vars(&[("LINKRELAY_MAX_QUEUE_SIZE", "0")])).unwrap();
        assert!(settings.queue_settings().is_err());

        let settings =
            Settings::from_env_source(vars(&[("LINKRELAY_BACKEND", "postgres")])).unwrap();
        assert!(settings.backend(false).is_err());

        assert!(Settings::from_env_source(vars(&[("LINKRELAY_PORT", "not-a-port")])).is_err());
    }

    #[test]
    fn test_redis_is_not_an_alias_for_upstash() {
        let err = "redis".parse::<Backend>().unwrap_err();
        assert!(err.to_string().contains("upstash"));
        assert_eq!(" Upstash ".parse::<Backend>().unwrap(), Backend::Upstash);
    }

    #[test]
    fn test_database_url() {
        let settings = Settings::from_env_source(vars(&[(
            "LINKRELAY_DB_PATH",
            "/var/lib/linkrelay/queue.db",
        )]))
        .unwrap();
        assert_eq!(settings.database_url(), "sqlite:///var/lib/linkrelay/queue.db");
        assert_eq!(settings.db_dir(), Some(PathBuf::from("/var/lib/linkrelay")));

        let settings =
            Settings::from_env_source(vars(&[("LINKRELAY_DB_PATH", "sqlite::memory:")])).unwrap();
        assert_eq!(settings.database_url(), "sqlite::memory:");
        assert_eq!(settings.db_dir(), None);
    }
}
