//! The process-wide alias secret.

use std::fmt;

use zeroize::Zeroizing;

use super::AliasError;

/// Symmetric secret used to mint and verify every alias.
///
/// The length selects the cipher: 16, 24 or 32 bytes for AES-128, AES-192
/// or AES-256. Rotating the key invalidates all previously issued aliases.
/// The bytes are wiped on drop and never printed.
#[derive(Clone)]
pub struct SharedKey(Zeroizing<Vec<u8>>);

impl SharedKey {
    /// Accepted key lengths in bytes.
    pub const VALID_LENGTHS: [usize; 3] = [16, 24, 32];

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::InvalidKeyLength`] if the length is not one of
    /// [`Self::VALID_LENGTHS`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, AliasError> {
        let bytes = Zeroizing::new(bytes.into());
        if Self::VALID_LENGTHS.contains(&bytes.len()) {
            Ok(Self(bytes))
        } else {
            Err(AliasError::InvalidKeyLength(bytes.len()))
        }
    }

    /// Creates a key from a configured secret string, using its UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::InvalidKeyLength`] if the encoded length is not
    /// 16, 24 or 32 bytes.
    pub fn from_secret(secret: &str) -> Result<Self, AliasError> {
        Self::new(secret.as_bytes())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a key is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedKey(<{} bytes redacted>)", self.0.len())
    }
}
