//! Self-verifying aliases.
//!
//! An alias looks like `shop-4F0A9C_E1B27DmM6G490b6pGJAG3uCfBCVA@mine.example`:
//! a tag naming the correspondent's domain, a random filler, and 22 characters
//! of base64 carrying the mint date plus a truncated SHA-256 over the visible
//! part, encrypted with the [`SharedKey`]. Verification needs nothing but the
//! alias and the key.
//!
//! The CBC initialization vector is taken from the first 16 characters of the
//! alias itself. That is public, predictable input and weaker than a random
//! IV, but every alias issued so far depends on it.

mod codec;
mod key;
mod verification;

pub use codec::{AliasCodec, GeneratedAlias};
pub use key::SharedKey;
pub use verification::VerificationResult;

use chrono::NaiveDate;

/// Maximum length of an alias local part.
pub const MAX_LOCAL_PART: usize = 40;

/// Length of the encoded, encrypted tail of the local part.
pub const ENCRYPTED_PART_LEN: usize = 22;

/// Misuse of the alias codec by its caller.
///
/// Malformed aliases are never an error; they decode to a negative
/// [`VerificationResult`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasError {
    /// Key is not 16, 24 or 32 bytes.
    #[error("Key must be 16, 24 or 32 bytes long, got {0}")]
    InvalidKeyLength(usize),

    /// External domain has no second-to-last label to tag the alias with.
    #[error("Domain has no second-level label: {0:?}")]
    MissingSecondLevelLabel(String),

    /// The label used as tag has characters an alias cannot carry.
    #[error("Domain label cannot be used as alias tag: {0:?}")]
    InvalidDomainLabel(String),

    /// The date does not format as eight digits.
    #[error("Date cannot be encoded in an alias: {0}")]
    UnsupportedDate(NaiveDate),

    /// The block cipher rejected its input.
    #[error("Encryption failed")]
    Cipher,
}
