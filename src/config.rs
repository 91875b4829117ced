// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`AppConfig`] loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the redb database | `/data` |
//! | `STORAGE_BACKEND` | `redb` or `memory` | `redb` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `DECRYPTION_TTL_SECS` | Lifetime of a pending decryption request | `3600` |
//! | `EXPIRY_SWEEP_SECS` | Interval between expiry sweeps | `30` |
//! | `ORACLE_SIGNING_KEY` | HMAC key of the local decryption oracle | random per process |
//! | `ORACLE_LATENCY_MS` | Simulated delay before the oracle calls back | `500` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// File name of the record database inside the data directory.
pub const DATABASE_FILE: &str = "records.redb";

/// Environment variable selecting the store backend.
pub const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable for the log output format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Seconds a decryption request may wait for its callback before it expires.
pub const DECRYPTION_TTL_ENV: &str = "DECRYPTION_TTL_SECS";
pub const DEFAULT_DECRYPTION_TTL_SECS: u64 = 3600;

/// Seconds between sweeps of expired decryption requests.
pub const EXPIRY_SWEEP_ENV: &str = "EXPIRY_SWEEP_SECS";
pub const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 30;

/// HMAC key the local oracle signs callbacks with.
///
/// # Default
/// A random key generated at startup; proofs do not survive a restart.
pub const ORACLE_SIGNING_KEY_ENV: &str = "ORACLE_SIGNING_KEY";

/// Delay before the local oracle delivers a callback.
pub const ORACLE_LATENCY_ENV: &str = "ORACLE_LATENCY_MS";
pub const DEFAULT_ORACLE_LATENCY_MS: u64 = 500;

/// Which [`KeyedStore`](crate::storage::KeyedStore) backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Redb,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub storage_backend: StorageBackend,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub decryption_ttl: Duration,
    pub expiry_sweep_interval: Duration,
    pub oracle_signing_key: Option<Vec<u8>>,
    pub oracle_latency: Duration,
    /// Problems found while loading, reported by [`log_warnings`](Self::log_warnings)
    /// once tracing is up.
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_backend: StorageBackend::Redb,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::Pretty,
            decryption_ttl: Duration::from_secs(DEFAULT_DECRYPTION_TTL_SECS),
            expiry_sweep_interval: Duration::from_secs(DEFAULT_EXPIRY_SWEEP_SECS),
            oracle_signing_key: None,
            oracle_latency: Duration::from_millis(DEFAULT_ORACLE_LATENCY_MS),
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Unparseable values fall back
    /// to their defaults and are recorded in `warnings`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut warnings = Vec::new();

        let storage_backend = match lookup(STORAGE_BACKEND_ENV).as_deref() {
            None | Some("redb") => StorageBackend::Redb,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                warnings.push(format!("Unknown {STORAGE_BACKEND_ENV} {other:?}, using redb"));
                StorageBackend::Redb
            }
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                warnings.push(format!("Unknown {LOG_FORMAT_ENV} {other:?}, using pretty"));
                LogFormat::Pretty
            }
        };

        let port = parse_or(&lookup, &mut warnings, PORT_ENV, defaults.port);
        let decryption_ttl_secs =
            parse_or(&lookup, &mut warnings, DECRYPTION_TTL_ENV, DEFAULT_DECRYPTION_TTL_SECS);
        let sweep_secs = parse_or(&lookup, &mut warnings, EXPIRY_SWEEP_ENV, DEFAULT_EXPIRY_SWEEP_SECS);
        let latency_ms = parse_or(&lookup, &mut warnings, ORACLE_LATENCY_ENV, DEFAULT_ORACLE_LATENCY_MS);

        Self {
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            storage_backend,
            host: lookup(HOST_ENV).unwrap_or(defaults.host),
            port,
            log_format,
            decryption_ttl: Duration::from_secs(decryption_ttl_secs),
            expiry_sweep_interval: Duration::from_secs(sweep_secs.max(1)),
            oracle_signing_key: lookup(ORACLE_SIGNING_KEY_ENV)
                .filter(|k| !k.is_empty())
                .map(String::into_bytes),
            oracle_latency: Duration::from_millis(latency_ms),
            warnings,
        }
    }

    /// Emit the warnings collected while loading. Call after tracing is
    /// initialised; loading itself runs before any subscriber exists.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("{warning}");
        }
    }

    /// Path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    warnings: &mut Vec<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Invalid {name} {raw:?}, using {default}"));
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg.storage_backend, StorageBackend::Redb);
        assert_eq!(cfg.bind_address(), "0.0.0.0:8080");
        assert_eq!(cfg.database_path(), PathBuf::from("/data/records.redb"));
        assert_eq!(cfg.decryption_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(cfg.oracle_signing_key.is_none());
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn values_are_read_from_environment() {
        let cfg = config(&[
            ("STORAGE_BACKEND", "memory"),
            ("PORT", "9000"),
            ("LOG_FORMAT", "json"),
            ("DECRYPTION_TTL_SECS", "60"),
            ("ORACLE_SIGNING_KEY", "secret"),
            ("ORACLE_LATENCY_MS", "0"),
        ]);
        assert_eq!(cfg.storage_backend, StorageBackend::Memory);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.decryption_ttl, Duration::from_secs(60));
        assert_eq!(cfg.oracle_signing_key.as_deref(), Some(&b"secret"[..]));
        assert_eq!(cfg.oracle_latency, Duration::ZERO);
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let cfg = config(&[("PORT", "http"), ("EXPIRY_SWEEP_SECS", "0")]);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.expiry_sweep_interval, Duration::from_secs(1));
        assert_eq!(cfg.warnings, vec!["Invalid PORT \"http\", using 8080".to_string()]);
    }

    #[test]
    fn unknown_choices_are_kept_as_warnings() {
        let cfg = config(&[("STORAGE_BACKEND", "sqlite"), ("LOG_FORMAT", "xml")]);
        assert_eq!(cfg.storage_backend, StorageBackend::Redb);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.warnings.len(), 2);
        assert!(cfg.warnings[0].contains("STORAGE_BACKEND"));
        assert!(cfg.warnings[1].contains("LOG_FORMAT"));
    }
}
