//! Credential providers.
//!
//! The core never prompts on its own; binaries inject a provider so the
//! provisioner and publisher stay usable headlessly.

use std::env;
use std::fmt;
use std::io;

use thiserror::Error;
use tracing::debug;

/// Environment variable consulted before falling back to an interactive prompt.
pub const PASSWORD_VAR: &str = "TTLQ_PASSWORD";

/// User and password for the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read password: {0}")]
    Prompt(#[from] io::Error),
    #[error("empty password for user '{user}'")]
    Empty { user: String },
}

/// Capability that yields broker credentials on demand.
pub trait CredentialProvider {
    fn fetch(&self) -> Result<Credentials, CredentialError>;
}

/// Fixed credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialProvider for StaticCredentials {
    fn fetch(&self) -> Result<Credentials, CredentialError> {
        ensure_non_empty(self.0.clone())
    }
}

/// Reads `TTLQ_PASSWORD`, or prompts on the terminal when it is unset.
#[derive(Debug, Clone)]
pub struct EnvOrPrompt {
    user: String,
}

impl EnvOrPrompt {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

impl CredentialProvider for EnvOrPrompt {
    fn fetch(&self) -> Result<Credentials, CredentialError> {
        if let Ok(password) = env::var(PASSWORD_VAR) {
            debug!(user = %self.user, source = PASSWORD_VAR, "credentials_loaded");
            return ensure_non_empty(Credentials::new(self.user.clone(), password));
        }

        // Reads from the controlling terminal with echo disabled.
        let password = rpassword::prompt_password(prompt_text(&self.user))?;
        debug!(user = %self.user, source = "prompt", "credentials_loaded");
        ensure_non_empty(Credentials::new(self.user.clone(), password))
    }
}

fn prompt_text(user: &str) -> String {
    format!("Enter password for user '{user}': ")
}

fn ensure_non_empty(credentials: Credentials) -> Result<Credentials, CredentialError> {
    if credentials.password.is_empty() {
        return Err(CredentialError::Empty {
            user: credentials.user,
        });
    }
    Ok(credentials)
}
