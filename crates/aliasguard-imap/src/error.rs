//! Error types for the IMAP client.

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Server returned NO. Carries the response code and text.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// True if the session cannot be used any more and the caller should
    /// reconnect.
    ///
    /// NO and BAD leave the connection usable.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        !matches!(self, Self::No(_) | Self::Bad(_))
    }

    /// True for a NO carrying `[TRYCREATE]`: the target mailbox does not
    /// exist and may be created (RFC 3501 section 7.1).
    #[must_use]
    pub fn is_try_create(&self) -> bool {
        matches!(self, Self::No(text) if text.to_ascii_uppercase().starts_with("[TRYCREATE]"))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_lost() {
        assert!(Error::Bye("shutting down".into()).is_connection_lost());
        assert!(Error::Protocol("garbage".into()).is_connection_lost());
        assert!(
            Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
                .is_connection_lost()
        );
        assert!(!Error::No("quota".into()).is_connection_lost());
        assert!(!Error::Bad("syntax".into()).is_connection_lost());
    }

    #[test]
    fn test_try_create() {
        assert!(Error::No("[TRYCREATE] No such mailbox".into()).is_try_create());
        assert!(Error::No("[trycreate] no".into()).is_try_create());
        assert!(!Error::No("[NONEXISTENT] No such mailbox".into()).is_try_create());
        assert!(!Error::Bad("[TRYCREATE] odd".into()).is_try_create());
    }
}
