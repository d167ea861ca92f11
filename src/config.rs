//! Configuration management for Folio Server

use serde::Deserialize;
use std::env;

use crate::document::{ChunkMode, ChunkingOptions};

/// Default upload limit: 32 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 << 20;

/// Default cap on the decompressed size of one archive: 256 MiB
pub const DEFAULT_MAX_UNPACKED_BYTES: u64 = 256 << 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chunking: ChunkingOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Largest total decompressed size of an uploaded archive, in bytes
    pub max_unpacked_bytes: u64,
}

/// Invalid configuration value
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8081,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                max_unpacked_bytes: DEFAULT_MAX_UNPACKED_BYTES,
            },
            chunking: ChunkingOptions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset variables take their
    /// defaults, malformed ones are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let mode = match lookup("CHUNK_MODE") {
            Some(value) => ChunkMode::parse(&value).ok_or(ConfigError::Invalid {
                name: "CHUNK_MODE",
                value,
            })?,
            None => defaults.chunking.mode,
        };
        let max_chars = parse_var(&lookup, "CHUNK_MAX_CHARS", defaults.chunking.max_chars)?;
        if max_chars == 0 {
            return Err(ConfigError::Invalid {
                name: "CHUNK_MAX_CHARS",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, "SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parse_var(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.server.max_upload_bytes,
                )?,
                max_unpacked_bytes: parse_var(
                    &lookup,
                    "MAX_UNPACKED_BYTES",
                    defaults.server.max_unpacked_bytes,
                )?,
            },
            chunking: ChunkingOptions { mode, max_chars },
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
