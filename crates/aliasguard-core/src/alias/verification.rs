//! Outcome of decoding an alias.

use chrono::NaiveDate;
use serde::Serialize;

/// What an alias says about itself once decrypted and checked.
///
/// A generation date is only ever present on a valid signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    checked_alias: String,
    generation_date: Option<NaiveDate>,
    signature_valid: bool,
}

impl VerificationResult {
    pub(crate) fn verified(alias: &str, generation_date: NaiveDate) -> Self {
        Self {
            checked_alias: alias.to_string(),
            generation_date: Some(generation_date),
            signature_valid: true,
        }
    }

    pub(crate) fn rejected(alias: &str) -> Self {
        Self {
            checked_alias: alias.to_string(),
            generation_date: None,
            signature_valid: false,
        }
    }

    /// The address exactly as it was checked.
    #[must_use]
    pub fn checked_alias(&self) -> &str {
        &self.checked_alias
    }

    /// UTC day the alias was minted.
    #[must_use]
    pub const fn generation_date(&self) -> Option<NaiveDate> {
        self.generation_date
    }

    /// Whether the embedded signature matched.
    #[must_use]
    pub const fn signature_valid(&self) -> bool {
        self.signature_valid
    }
}
