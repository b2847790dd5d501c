// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master-key lifecycle: create, unlock, and the key-wrapping scheme.
//!
//! A random master key encrypts all credentials. The master key itself is
//! stored wrapped: encrypted under a key derived from the operator
//! passphrase via Argon2id. Changing the passphrase therefore only re-wraps
//! the master key; individual credentials are never re-encrypted.
//!
//! `vault_meta` rows: `wrapped_master_key`, `master_key_nonce`, `kdf_salt`,
//! `kdf_params` (JSON). All four are written in one transaction at creation.

use botfleet_config::VaultConfig;
use botfleet_core::BotfleetError;
use botfleet_storage::queries::meta;
use botfleet_storage::Database;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{self, Cipher, NONCE_LEN};
use crate::kdf::{self, KdfParams, SALT_LEN};

const META_WRAPPED_KEY: &str = "wrapped_master_key";
const META_WRAP_NONCE: &str = "master_key_nonce";
const META_KDF_SALT: &str = "kdf_salt";
const META_KDF_PARAMS: &str = "kdf_params";

/// Check whether a master key has been provisioned in this database.
pub async fn vault_initialized(db: &Database) -> Result<bool, BotfleetError> {
    Ok(meta::get_meta(db, META_WRAPPED_KEY).await?.is_some())
}

/// Provision a new master key, wrapped by the passphrase-derived key.
///
/// Returns the cipher engine over the fresh master key.
pub async fn create(
    db: &Database,
    passphrase: &SecretString,
    config: &VaultConfig,
) -> Result<Cipher, BotfleetError> {
    let master_key = crypto::generate_key()?;

    let salt = kdf::generate_salt()?;
    let params = KdfParams::from_config(config);
    let wrapping_key = kdf::derive_key(passphrase.expose_secret().as_bytes(), &salt, &params)?;

    let (wrapped_key, wrap_nonce) = Cipher::new(wrapping_key).encrypt(master_key.as_ref())?;

    let params_json = serde_json::to_vec(&params)
        .map_err(|e| BotfleetError::Vault(format!("failed to encode KDF params: {e}")))?;

    meta::set_meta_batch(
        db,
        vec![
            (META_WRAPPED_KEY, wrapped_key),
            (META_WRAP_NONCE, wrap_nonce.to_vec()),
            (META_KDF_SALT, salt.to_vec()),
            (META_KDF_PARAMS, params_json),
        ],
    )
    .await?;

    info!("vault master key provisioned");
    Ok(Cipher::new(master_key))
}

/// Unlock an existing vault by unwrapping the stored master key.
pub async fn unlock(db: &Database, passphrase: &SecretString) -> Result<Cipher, BotfleetError> {
    let wrapped_key = require_meta(db, META_WRAPPED_KEY).await?;
    let wrap_nonce = require_meta(db, META_WRAP_NONCE).await?;
    let salt = require_meta(db, META_KDF_SALT).await?;
    let params_json = require_meta(db, META_KDF_PARAMS).await?;

    let params: KdfParams = serde_json::from_slice(&params_json)
        .map_err(|e| BotfleetError::Vault(format!("corrupted KDF params: {e}")))?;

    let salt: [u8; SALT_LEN] = salt
        .try_into()
        .map_err(|_| BotfleetError::Vault("corrupted KDF salt (expected 16 bytes)".to_string()))?;
    let wrap_nonce: [u8; NONCE_LEN] = wrap_nonce.try_into().map_err(|_| {
        BotfleetError::Vault("corrupted master key nonce (expected 12 bytes)".to_string())
    })?;

    let wrapping_key =
        kdf::derive_key(passphrase.expose_secret().as_bytes(), &salt, &params)?;

    let master_key_bytes = Cipher::new(wrapping_key)
        .decrypt(&wrap_nonce, &wrapped_key)
        .map_err(|_| {
            BotfleetError::Vault(
                "invalid passphrase or corrupted vault -- master key decryption failed"
                    .to_string(),
            )
        })?;

    let master_key: [u8; 32] = master_key_bytes
        .try_into()
        .map_err(|_| BotfleetError::Vault("corrupted master key (expected 32 bytes)".to_string()))?;

    debug!("vault master key unlocked");
    Ok(Cipher::new(Zeroizing::new(master_key)))
}

/// Unlock the vault if provisioned, otherwise create it.
///
/// The standard startup path for both the service and the ops CLI.
pub async fn unlock_or_create(
    db: &Database,
    passphrase: &SecretString,
    config: &VaultConfig,
) -> Result<Cipher, BotfleetError> {
    if vault_initialized(db).await? {
        unlock(db, passphrase).await
    } else {
        create(db, passphrase, config).await
    }
}

async fn require_meta(db: &Database, key: &str) -> Result<Vec<u8>, BotfleetError> {
    meta::get_meta(db, key)
        .await?
        .ok_or_else(|| BotfleetError::Vault(format!("vault not initialized: missing {key}")))
}
