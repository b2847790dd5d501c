// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Botfleet - multi-tenant messaging-bot backend.
//!
//! This binary is the operational surface of the credential vault: tenant
//! credential management, token resolution checks, the fingerprint
//! backfill, and migration status. The webhook router and admin API are
//! separate services that consume the vault crates directly.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use botfleet_core::BotfleetError;
use botfleet_storage::Database;
use botfleet_vault::CredentialVault;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod backfill;
mod credential;
mod status;

/// Botfleet - multi-tenant messaging-bot backend.
#[derive(Parser, Debug)]
#[command(name = "botfleet", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage tenant bot credentials.
    Credential {
        #[command(subcommand)]
        action: credential::CredentialAction,
    },
    /// Resolve a bearer token to its tenant (token read from stdin).
    Resolve,
    /// Compute fingerprints for credentials created before the fingerprint
    /// scheme existed.
    Backfill {
        /// Rows per transaction; defaults to vault.backfill_batch_size.
        #[arg(long)]
        batch_size: Option<u32>,
        /// Run a single batch instead of driving to completion.
        #[arg(long)]
        one_batch: bool,
    },
    /// Show credential counts and migration state.
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match botfleet_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            botfleet_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, config).await {
        eprintln!("botfleet: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: botfleet_config::BotfleetConfig) -> Result<(), BotfleetError> {
    let db = Database::open_with_wal(&config.storage.database_path, config.storage.wal_mode)
        .await?;

    // Confirmation prompt only when this run will provision a new vault.
    let passphrase = if botfleet_vault::vault_initialized(&db).await? {
        botfleet_vault::get_vault_passphrase()?
    } else {
        botfleet_vault::prompt::get_vault_passphrase_with_confirm()?
    };
    let cipher = botfleet_vault::unlock_or_create(&db, &passphrase, &config.vault).await?;
    let vault = CredentialVault::new(db, cipher);
    tracing::debug!(database = %config.storage.database_path, "vault unlocked");

    match cli.command {
        Commands::Credential { action } => credential::run(&vault, action).await,
        Commands::Resolve => credential::run_resolve(&vault).await,
        Commands::Backfill {
            batch_size,
            one_batch,
        } => {
            let batch_size = batch_size.unwrap_or(config.vault.backfill_batch_size);
            backfill::run(&vault, batch_size, one_batch).await
        }
        Commands::Status => status::run(&vault).await,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    #[serial_test::serial]
    fn binary_loads_config_defaults() {
        let config = botfleet_config::load_and_validate()
            .expect("default config should be valid");
        assert_eq!(config.service.name, "botfleet");
    }
}
