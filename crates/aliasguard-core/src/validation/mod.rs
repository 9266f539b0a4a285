//! Email address validation.
//!
//! Two validators share the [`AddressValidator`] trait:
//!
//! - [`SyntaxValidator`]: offline RFC 5321 dot-atom check, used by the alias
//!   generator and in tests.
//! - [`DnsValidator`]: the syntax check followed by a mail-host lookup on
//!   the domain, bounded by its own timeout. This is what the binary uses
//!   to judge From addresses.

mod dns;
mod syntax;

use std::future::Future;

pub use dns::{DnsValidator, HickoryResolver, MailHostResolver};
pub use syntax::SyntaxValidator;

/// Reason an address was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Address is empty.
    Empty,
    /// No `@` separator.
    MissingAt,
    /// More than one `@`.
    MultipleAt,
    /// Nothing before the `@`.
    EmptyLocalPart,
    /// Local part longer than 64 characters.
    LocalPartTooLong,
    /// Local part contains a character outside the dot-atom set.
    InvalidLocalPart,
    /// Nothing after the `@`.
    EmptyDomain,
    /// Domain has a single label.
    DomainWithoutDot,
    /// Domain longer than 253 characters.
    DomainTooLong,
    /// A domain label is empty, too long or badly formed.
    InvalidDomainLabel,
    /// Domain publishes no MX record and no address to fall back on, or a
    /// null MX.
    NoMailServer,
    /// The DNS lookup itself failed.
    LookupFailed(String),
    /// The DNS lookup did not finish in time.
    LookupTimedOut,
}

impl AddressError {
    /// Get human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Empty => "Address is empty",
            Self::MissingAt => "Address has no @ separator",
            Self::MultipleAt => "Address has more than one @",
            Self::EmptyLocalPart => "Local part is empty",
            Self::LocalPartTooLong => "Local part exceeds 64 characters",
            Self::InvalidLocalPart => "Local part contains invalid characters",
            Self::EmptyDomain => "Domain is empty",
            Self::DomainWithoutDot => "Domain must contain at least one dot",
            Self::DomainTooLong => "Domain exceeds 253 characters",
            Self::InvalidDomainLabel => "Domain contains an invalid label",
            Self::NoMailServer => "Domain does not accept email",
            Self::LookupFailed(reason) => reason,
            Self::LookupTimedOut => "DNS lookup timed out",
        }
    }
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AddressError {}

/// An address that passed validation, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAddress {
    /// Local part, as given.
    pub local_part: String,
    /// Domain, lowercased.
    pub domain: String,
}

/// Result of checking one address.
pub type SyntaxReport = Result<ValidatedAddress, AddressError>;

/// Decides whether an address is deliverable-looking.
pub trait AddressValidator: Send + Sync {
    /// Validates one address.
    ///
    /// Resolves to the first [`AddressError`] found.
    fn validate(&self, address: &str) -> impl Future<Output = SyntaxReport> + Send;
}
