use std::fs;
use std::path::Path;

use tracing::debug;

use crate::domain::{DomainError, SecretString};

/// Read a bearer token from `env_var`, falling back to the contents of `file`.
///
/// The file is opaque to the pipeline: its trimmed contents are the token.
pub fn load_token(env_var: &str, file: Option<&Path>) -> Result<SecretString, DomainError> {
    if let Ok(value) = std::env::var(env_var) {
        let secret = SecretString::new(value.trim());
        if !secret.is_empty() {
            debug!(source = env_var, "Credential loaded from environment");
            return Ok(secret);
        }
    }

    if let Some(path) = file {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let secret = SecretString::new(content.trim());
            if !secret.is_empty() {
                debug!(path = ?path, "Credential loaded from file");
                return Ok(secret);
            }
        }
    }

    Err(DomainError::Config(match file {
        Some(path) => format!("set {} or write a token to {}", env_var, path.display()),
        None => format!("set {}", env_var),
    }))
}
