// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM cipher engine.
//!
//! [`Cipher`] owns the process-wide master key: loaded once at startup,
//! immutable for the process lifetime, zeroed on drop. Every encryption
//! generates a fresh random 96-bit nonce via the system CSPRNG -- nonce
//! reuse would be catastrophic for GCM security.
//!
//! Authenticated decryption means a wrong key or a flipped bit surfaces as
//! [`BotfleetError::Decryption`], never as garbled plaintext.

use botfleet_core::BotfleetError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// The cipher engine holding the immutable master key.
///
/// Safe to share across request tasks: all methods take `&self` and the
/// only state is the key itself.
pub struct Cipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("key", &"[REDACTED]").finish()
    }
}

impl Cipher {
    pub fn new(key: Zeroizing<[u8; KEY_LEN]>) -> Self {
        Self { key }
    }

    /// Encrypt plaintext under the master key with a fresh random nonce.
    ///
    /// Returns `(ciphertext_with_tag, nonce)`. Both must be stored to
    /// decrypt later.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), BotfleetError> {
        let unbound = UnboundKey::new(&AES_256_GCM, self.key.as_ref())
            .map_err(|_| BotfleetError::Vault("failed to create AES-256-GCM key".to_string()))?;
        let sealing = LessSafeKey::new(unbound);

        let rng = SystemRandom::new();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut nonce_bytes)
            .map_err(|_| BotfleetError::Vault("failed to generate random nonce".to_string()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        // Seal in place: the buffer is extended with the 16-byte tag.
        let mut in_out = plaintext.to_vec();
        sealing
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| BotfleetError::Vault("AES-256-GCM encryption failed".to_string()))?;

        Ok((in_out, nonce_bytes))
    }

    /// Decrypt ciphertext (which must include the appended tag).
    ///
    /// Any tampering or key mismatch fails the tag check and returns
    /// [`BotfleetError::Decryption`].
    pub fn decrypt(
        &self,
        nonce_bytes: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, BotfleetError> {
        let unbound = UnboundKey::new(&AES_256_GCM, self.key.as_ref())
            .map_err(|_| BotfleetError::Vault("failed to create AES-256-GCM key".to_string()))?;
        let opening = LessSafeKey::new(unbound);

        let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

        let mut in_out = ciphertext.to_vec();
        let plaintext = opening
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| {
                BotfleetError::Decryption(
                    "wrong master key or tampered ciphertext".to_string(),
                )
            })?;

        Ok(plaintext.to_vec())
    }
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_key() -> Result<Zeroizing<[u8; KEY_LEN]>, BotfleetError> {
    let rng = SystemRandom::new();
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    rng.fill(key.as_mut())
        .map_err(|_| BotfleetError::Vault("failed to generate random key".to_string()))?;
    Ok(key)
}

/// Constant-time byte equality.
///
/// Used for the final decrypt-and-compare in resolution, so the comparison
/// itself leaks no timing information about the stored credential.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    ring::constant_time::verify_slices_are_equal(a, b).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> Cipher {
        Cipher::new(generate_key().unwrap())
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let plaintext = b"123456789:AAbotTokenValue";

        let (ciphertext, nonce) = cipher.encrypt(plaintext).unwrap();
        let decrypted = cipher.decrypt(&nonce, &ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn same_plaintext_encrypts_differently_each_time() {
        let cipher = test_cipher();
        let plaintext = b"same input twice";

        let (ct1, nonce1) = cipher.encrypt(plaintext).unwrap();
        let (ct2, nonce2) = cipher.encrypt(plaintext).unwrap();

        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let cipher1 = test_cipher();
        let cipher2 = test_cipher();
        let (ciphertext, nonce) = cipher1.encrypt(b"secret data").unwrap();

        let result = cipher2.decrypt(&nonce, &ciphertext);
        assert!(matches!(result, Err(BotfleetError::Decryption(_))));
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let cipher = test_cipher();
        let (mut ciphertext, nonce) = cipher.encrypt(b"do not tamper").unwrap();
        ciphertext[0] ^= 0x01;

        let result = cipher.decrypt(&nonce, &ciphertext);
        assert!(matches!(result, Err(BotfleetError::Decryption(_))));
    }

    #[test]
    fn tampered_tag_fails_decryption() {
        let cipher = test_cipher();
        let (mut ciphertext, nonce) = cipher.encrypt(b"tag check").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x80;

        assert!(cipher.decrypt(&nonce, &ciphertext).is_err());
    }

    #[test]
    fn ciphertext_includes_tag_overhead() {
        let cipher = test_cipher();
        let (ciphertext, _) = cipher.encrypt(b"hello").unwrap();
        assert_eq!(ciphertext.len(), 5 + 16);
    }

    #[test]
    fn debug_output_redacts_key() {
        let cipher = test_cipher();
        assert_eq!(format!("{cipher:?}"), "Cipher { key: \"[REDACTED]\" }");
    }

    #[test]
    fn constant_time_eq_behaves_like_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
