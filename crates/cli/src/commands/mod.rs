//! Command implementations and the shared service-role context.

pub mod admin;
pub mod check;
pub mod seed;

use pyrowarden_storefront::config::{ConfigError, SupabaseConfig};
use pyrowarden_storefront::supabase::{AccessToken, BackendError, SupabaseClient};
use secrecy::ExposeSecret;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("SUPABASE_SERVICE_ROLE_KEY is required for pw-cli")]
    MissingServiceRoleKey,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("No user with email: {0}")]
    UnknownUser(String),

    #[error("{0} table(s) failed the check")]
    CheckFailed(usize),
}

/// A Supabase client plus the service-role bearer every command uses.
pub struct Context {
    pub client: SupabaseClient,
    pub service: AccessToken,
}

impl Context {
    /// Load the Supabase settings and build the client.
    ///
    /// # Errors
    ///
    /// Returns `CliError` if the settings are invalid or the service role key
    /// is missing.
    pub fn from_env() -> Result<Self, CliError> {
        let config = SupabaseConfig::from_env()?;
        let service = config
            .service_role_key
            .as_ref()
            .map(|key| AccessToken::new(key.expose_secret()))
            .ok_or(CliError::MissingServiceRoleKey)?;
        let client = SupabaseClient::new(&config)?;
        Ok(Self { client, service })
    }
}
