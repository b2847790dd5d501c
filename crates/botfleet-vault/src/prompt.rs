// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase acquisition via TTY prompt or BOTFLEET_VAULT_KEY environment
//! variable.

use botfleet_core::BotfleetError;
use secrecy::SecretString;

/// The environment variable name for providing the vault passphrase.
pub const VAULT_KEY_ENV_VAR: &str = "BOTFLEET_VAULT_KEY";

/// Get the vault passphrase from the environment or an interactive TTY prompt.
///
/// Priority:
/// 1. `BOTFLEET_VAULT_KEY` environment variable (for headless/Docker/systemd)
/// 2. Interactive TTY prompt via `rpassword` (for human operators)
///
/// Returns an error if neither source is available.
pub fn get_vault_passphrase() -> Result<SecretString, BotfleetError> {
    if let Ok(key) = std::env::var(VAULT_KEY_ENV_VAR)
        && !key.is_empty()
    {
        return Ok(SecretString::from(key));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Vault passphrase: ");
        let passphrase = rpassword::read_password()
            .map_err(|e| BotfleetError::Vault(format!("failed to read passphrase: {e}")))?;
        if passphrase.is_empty() {
            return Err(BotfleetError::Vault(
                "empty passphrase not allowed".to_string(),
            ));
        }
        return Ok(SecretString::from(passphrase));
    }

    Err(BotfleetError::Vault(
        "No passphrase provided. Set BOTFLEET_VAULT_KEY environment variable or run interactively."
            .to_string(),
    ))
}

/// Get the vault passphrase with a confirmation prompt (for vault creation).
///
/// Prompts twice and verifies the passphrases match. Only works in
/// interactive TTY mode; falls back to the env var if not a terminal.
pub fn get_vault_passphrase_with_confirm() -> Result<SecretString, BotfleetError> {
    // Env var does not need confirmation.
    if let Ok(key) = std::env::var(VAULT_KEY_ENV_VAR)
        && !key.is_empty()
    {
        return Ok(SecretString::from(key));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("New vault passphrase: ");
        let pass1 = rpassword::read_password()
            .map_err(|e| BotfleetError::Vault(format!("failed to read passphrase: {e}")))?;
        eprint!("Confirm vault passphrase: ");
        let pass2 = rpassword::read_password()
            .map_err(|e| BotfleetError::Vault(format!("failed to read passphrase: {e}")))?;

        if pass1 != pass2 {
            return Err(BotfleetError::Vault("passphrases do not match".to_string()));
        }
        if pass1.is_empty() {
            return Err(BotfleetError::Vault(
                "empty passphrase not allowed".to_string(),
            ));
        }
        return Ok(SecretString::from(pass1));
    }

    Err(BotfleetError::Vault(
        "No passphrase provided. Set BOTFLEET_VAULT_KEY environment variable or run interactively."
            .to_string(),
    ))
}
