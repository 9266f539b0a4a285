//! Decision data models.

use serde::Serialize;

/// Where a message ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Passed verification.
    Verified,
    /// Anything that could not be verified.
    #[default]
    FailedValidation,
}

impl Classification {
    /// Stable name used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::FailedValidation => "failed_validation",
        }
    }

    /// Returns true for [`Classification::Verified`].
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of every individual check for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Checks {
    /// The primary recipient is an alias with a valid signature.
    pub alias_signature: bool,
    /// The From address is syntactically valid.
    pub from_syntax: bool,
    /// DKIM passed.
    pub dkim: bool,
    /// SPF passed.
    pub spf: bool,
    /// DMARC passed.
    pub dmarc: bool,
    /// At least one hop used transport encryption.
    pub transport_encrypted: bool,
    /// The From domain is allowed for the primary recipient.
    pub send_from_allowed: bool,
}

impl Checks {
    /// All of the message checks passed, ignoring the allow-list.
    #[must_use]
    pub const fn fully_authenticated(&self) -> bool {
        self.alias_signature
            && self.from_syntax
            && self.dkim
            && self.spf
            && self.dmarc
            && self.transport_encrypted
    }

    /// Combines the checks into a classification.
    #[must_use]
    pub const fn classify(&self) -> Classification {
        if self.fully_authenticated() || self.send_from_allowed {
            Classification::Verified
        } else {
            Classification::FailedValidation
        }
    }
}
