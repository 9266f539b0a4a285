//! Error types for the core library.

use thiserror::Error;

use crate::alias::AliasError;
use crate::config::ConfigError;
use crate::service::TransportError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Alias codec misuse.
    #[error("Alias error: {0}")]
    Alias(#[from] AliasError),

    /// Domain is already allowed for some alias.
    #[error("Domain {domain} is already allowed for {owner}")]
    DomainAlreadyRegistered {
        /// Domain that was being registered.
        domain: String,
        /// Alias the domain belongs to.
        owner: String,
    },

    /// Configuration file is not valid TOML for the schema.
    #[error("Configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but failed validation.
    #[error("Invalid configuration: {}", join(.0))]
    InvalidConfig(Vec<ConfigError>),

    /// Mailbox transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
