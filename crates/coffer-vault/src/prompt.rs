// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password acquisition via TTY prompt or environment variable.

use coffer_core::CofferError;
use secrecy::SecretString;

/// Environment variable holding the account password.
pub const PASSWORD_ENV_VAR: &str = "COFFER_PASSWORD";

/// Environment variable holding a visibility group password.
pub const GROUP_PASSWORD_ENV_VAR: &str = "COFFER_GROUP_PASSWORD";

fn from_env(var: &str) -> Option<SecretString> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Some(SecretString::from(value)),
        _ => None,
    }
}

fn read_line(label: &str) -> Result<String, CofferError> {
    eprint!("{label}: ");
    rpassword::read_password()
        .map_err(|e| CofferError::Validation(format!("failed to read password: {e}")))
}

fn not_provided(var: &str) -> CofferError {
    CofferError::Validation(format!(
        "No password provided. Set {var} environment variable or run interactively."
    ))
}

/// Read a password from `var`, falling back to an interactive prompt.
pub fn get_password(var: &str, label: &str) -> Result<SecretString, CofferError> {
    if let Some(password) = from_env(var) {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let password = read_line(label)?;
        if password.is_empty() {
            return Err(CofferError::Validation("empty password not allowed".to_string()));
        }
        return Ok(SecretString::from(password));
    }

    Err(not_provided(var))
}

/// Like [`get_password`], but prompts twice and requires both to match.
///
/// Passwords taken from the environment are not confirmed.
pub fn get_password_with_confirm(var: &str, label: &str) -> Result<SecretString, CofferError> {
    if let Some(password) = from_env(var) {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let first = zeroize::Zeroizing::new(read_line(label)?);
        let second = zeroize::Zeroizing::new(read_line(&format!("Confirm {}", label.to_lowercase()))?);
        if *first != *second {
            return Err(CofferError::Validation("passwords do not match".to_string()));
        }
        if first.is_empty() {
            return Err(CofferError::Validation("empty password not allowed".to_string()));
        }
        return Ok(SecretString::from(first.to_string()));
    }

    Err(not_provided(var))
}
