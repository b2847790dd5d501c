// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Botfleet backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Botfleet configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotfleetConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential vault settings.
    #[serde(default)]
    pub vault: VaultConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of this deployment.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "botfleet".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("botfleet").join("botfleet.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("botfleet.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Credential vault configuration.
///
/// KDF parameters govern the Argon2id derivation that wraps the master key.
/// Stored alongside the wrapped key so existing vaults keep unlocking after
/// a config change; new values apply on the next passphrase change.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id lane count (default: 1).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,

    /// Rows per fingerprint-backfill transaction (default: 100).
    ///
    /// Bounds write-lock duration while the backfill runs next to live
    /// webhook traffic.
    #[serde(default = "default_backfill_batch_size")]
    pub backfill_batch_size: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
            backfill_batch_size: default_backfill_batch_size(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    1
}

fn default_backfill_batch_size() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = BotfleetConfig::default();
        assert_eq!(config.service.name, "botfleet");
        assert_eq!(config.service.log_level, "info");
        assert!(config.storage.wal_mode);
        assert_eq!(config.vault.kdf_memory_cost, 65536);
        assert_eq!(config.vault.kdf_iterations, 3);
        assert_eq!(config.vault.kdf_parallelism, 1);
        assert_eq!(config.vault.backfill_batch_size, 100);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: BotfleetConfig = toml::from_str(
            r#"
[vault]
backfill_batch_size = 25
"#,
        )
        .unwrap();
        assert_eq!(config.vault.backfill_batch_size, 25);
        // Untouched fields keep their defaults.
        assert_eq!(config.vault.kdf_iterations, 3);
        assert_eq!(config.service.name, "botfleet");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = toml::from_str::<BotfleetConfig>(
            r#"
[vault]
kdf_memory = 1024
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let result = toml::from_str::<BotfleetConfig>("[webhooks]\nport = 8080\n");
        assert!(result.is_err());
    }
}
