// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant credential management and resolution commands.
//!
//! Tokens are read from a TTY prompt or piped stdin, never from argv, so
//! they stay out of shell history and process listings.

use botfleet_core::{BotfleetError, TenantId};
use botfleet_vault::{mask_token, CredentialVault, ResolveError};
use clap::Subcommand;
use secrecy::{ExposeSecret, SecretString};

/// Credential subcommands.
#[derive(Subcommand, Debug)]
pub enum CredentialAction {
    /// Store or rotate a tenant's bot token (token read from stdin).
    Set {
        /// Tenant identifier.
        tenant: String,
    },
    /// Show a masked preview of a tenant's token.
    Show {
        /// Tenant identifier.
        tenant: String,
    },
    /// Delete a tenant's credential.
    Delete {
        /// Tenant identifier.
        tenant: String,
    },
}

pub async fn run(vault: &CredentialVault, action: CredentialAction) -> Result<(), BotfleetError> {
    match action {
        CredentialAction::Set { tenant } => {
            let token = read_token("Bot token: ")?;
            vault
                .put(&TenantId(tenant.clone()), token.expose_secret())
                .await?;
            println!("credential stored for tenant {tenant}");
            Ok(())
        }
        CredentialAction::Show { tenant } => {
            let tenant_id = TenantId(tenant.clone());
            match (vault.get(&tenant_id).await?, vault.reveal(&tenant_id).await?) {
                (Some(record), Some(token)) => {
                    println!(
                        "{tenant}: {} [{}] created {} rotated {}",
                        mask_token(token.expose_secret()),
                        record.state(),
                        record.created_at,
                        record.rotated_at,
                    );
                }
                _ => println!("no credential for tenant {tenant}"),
            }
            Ok(())
        }
        CredentialAction::Delete { tenant } => {
            if vault.delete(&TenantId(tenant.clone())).await? {
                println!("credential deleted for tenant {tenant}");
            } else {
                println!("no credential for tenant {tenant}");
            }
            Ok(())
        }
    }
}

/// Resolve a presented token and print the owning tenant.
pub async fn run_resolve(vault: &CredentialVault) -> Result<(), BotfleetError> {
    let token = read_token("Bearer token: ")?;
    match vault.resolve(token.expose_secret()).await {
        Ok(tenant_id) => {
            println!("{tenant_id}");
            Ok(())
        }
        Err(ResolveError::Unauthorized) => {
            eprintln!("unauthorized");
            std::process::exit(2);
        }
        Err(ResolveError::Internal(e)) => Err(e),
    }
}

/// Read a secret line from the TTY (hidden input) or from piped stdin.
fn read_token(prompt: &str) -> Result<SecretString, BotfleetError> {
    let token = if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        rpassword::prompt_password(prompt)
            .map_err(|e| BotfleetError::Vault(format!("failed to read token: {e}")))?
    } else {
        let mut line = String::new();
        std::io::BufRead::read_line(&mut std::io::stdin().lock(), &mut line)
            .map_err(|e| BotfleetError::Vault(format!("failed to read token: {e}")))?;
        line.trim_end_matches(['\r', '\n']).to_string()
    };

    if token.is_empty() {
        return Err(BotfleetError::Vault("empty token not allowed".to_string()));
    }
    Ok(SecretString::from(token))
}
