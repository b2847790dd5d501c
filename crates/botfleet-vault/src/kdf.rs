// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the operator passphrase.
//!
//! Derives the 32-byte key that wraps the master key. Parameters are
//! persisted next to the wrapped key so an existing vault keeps unlocking
//! after the configured defaults change.

use botfleet_core::BotfleetError;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Argon2id salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters, serialized as JSON into `vault_meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iteration count.
    pub iterations: u32,
    /// Lane count.
    pub parallelism: u32,
}

impl KdfParams {
    pub fn from_config(config: &botfleet_config::VaultConfig) -> Self {
        Self {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        }
    }
}

/// Derive a 32-byte wrapping key from the passphrase using Argon2id.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory
/// zeroing on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, BotfleetError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| BotfleetError::Vault(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| BotfleetError::Vault(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}

/// Generate a random 16-byte salt for Argon2id.
pub fn generate_salt() -> Result<[u8; SALT_LEN], BotfleetError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| BotfleetError::Vault("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost for fast tests.
    fn test_params() -> KdfParams {
        KdfParams {
            memory_cost: 32768,
            iterations: 2,
            parallelism: 1,
        }
    }

    #[test]
    fn same_inputs_derive_same_key() {
        let salt = [1u8; SALT_LEN];
        let key1 = derive_key(b"operator passphrase", &salt, &test_params()).unwrap();
        let key2 = derive_key(b"operator passphrase", &salt, &test_params()).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn different_passphrase_derives_different_key() {
        let salt = [2u8; SALT_LEN];
        let key1 = derive_key(b"passphrase one", &salt, &test_params()).unwrap();
        let key2 = derive_key(b"passphrase two", &salt, &test_params()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn different_salt_derives_different_key() {
        let key1 = derive_key(b"same passphrase", &[1u8; SALT_LEN], &test_params()).unwrap();
        let key2 = derive_key(b"same passphrase", &[2u8; SALT_LEN], &test_params()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn generated_salts_are_random() {
        let salt1 = generate_salt().unwrap();
        let salt2 = generate_salt().unwrap();
        assert_ne!(salt1, salt2);
    }

    #[test]
    fn params_round_trip_through_json() {
        let params = test_params();
        let json = serde_json::to_vec(&params).unwrap();
        let parsed: KdfParams = serde_json::from_slice(&json).unwrap();
        assert_eq!(params, parsed);
    }
}
