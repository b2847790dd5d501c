// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./botfleet.toml` > `~/.config/botfleet/botfleet.toml`
//! > `/etc/botfleet/botfleet.toml` with environment variable overrides via
//! `BOTFLEET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BotfleetConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/botfleet/botfleet.toml` (system-wide)
/// 3. `~/.config/botfleet/botfleet.toml` (user XDG config)
/// 4. `./botfleet.toml` (local directory)
/// 5. `BOTFLEET_*` environment variables
pub fn load_config() -> Result<BotfleetConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config injection.
pub fn load_config_from_str(toml_content: &str) -> Result<BotfleetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BotfleetConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BotfleetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BotfleetConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BotfleetConfig::default()))
        .merge(Toml::file("/etc/botfleet/botfleet.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("botfleet/botfleet.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("botfleet.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `BOTFLEET_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("BOTFLEET_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BOTFLEET_VAULT_KDF_ITERATIONS -> "vault_kdf_iterations"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("vault_", "vault.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn load_from_str_applies_overrides() {
        let config = load_config_from_str(
            r#"
[storage]
database_path = "/var/lib/botfleet/test.db"

[vault]
kdf_iterations = 4
"#,
        )
        .unwrap();
        assert_eq!(config.storage.database_path, "/var/lib/botfleet/test.db");
        assert_eq!(config.vault.kdf_iterations, 4);
        assert_eq!(config.service.name, "botfleet");
    }

    #[test]
    #[serial]
    fn env_var_overrides_section_keys() {
        // SAFETY: test-only env mutation, serialized via serial_test.
        unsafe { std::env::set_var("BOTFLEET_VAULT_BACKFILL_BATCH_SIZE", "7") };
        let config = load_config().unwrap();
        unsafe { std::env::remove_var("BOTFLEET_VAULT_BACKFILL_BATCH_SIZE") };

        assert_eq!(config.vault.backfill_batch_size, 7);
    }

    #[test]
    #[serial]
    fn env_var_with_underscored_key_maps_correctly() {
        unsafe { std::env::set_var("BOTFLEET_SERVICE_LOG_LEVEL", "debug") };
        let config = load_config().unwrap();
        unsafe { std::env::remove_var("BOTFLEET_SERVICE_LOG_LEVEL") };

        assert_eq!(config.service.log_level, "debug");
    }
}
