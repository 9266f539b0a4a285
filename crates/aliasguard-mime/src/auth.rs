//! `Authentication-Results` verdicts (RFC 8601).

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Outcome of one server-side authentication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AuthResult {
    /// The check passed.
    Pass,
    /// The check failed.
    Fail,
    /// No result, or a result this crate does not know.
    #[default]
    None,
    /// Weak failure (SPF).
    Softfail,
    /// The domain makes no assertion.
    Neutral,
    /// Transient error while checking.
    Temperror,
    /// Permanent error while checking.
    Permerror,
    /// Heuristic pass without a published policy.
    Bestguesspass,
}

impl AuthResult {
    /// Keyword as written in the header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::None => "none",
            Self::Softfail => "softfail",
            Self::Neutral => "neutral",
            Self::Temperror => "temperror",
            Self::Permerror => "permerror",
            Self::Bestguesspass => "bestguesspass",
        }
    }

    /// Parses a keyword, mapping anything unrecognised to [`AuthResult::None`].
    #[must_use]
    pub fn parse(keyword: &str) -> Self {
        keyword.parse().unwrap_or_default()
    }

    /// Returns true for [`AuthResult::Pass`] only.
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl FromStr for AuthResult {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pass" => Ok(Self::Pass),
            "fail" => Ok(Self::Fail),
            "none" => Ok(Self::None),
            "softfail" => Ok(Self::Softfail),
            "neutral" => Ok(Self::Neutral),
            "temperror" => Ok(Self::Temperror),
            "permerror" => Ok(Self::Permerror),
            "bestguesspass" => Ok(Self::Bestguesspass),
            _ => Err(Error::UnknownAuthResult(s.to_string())),
        }
    }
}

impl fmt::Display for AuthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication methods the decision engine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMethod {
    Dkim,
    Spf,
    Dmarc,
}

impl AuthMethod {
    /// Method name as written in the header.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Dkim => "dkim",
            Self::Spf => "spf",
            Self::Dmarc => "dmarc",
        }
    }
}

/// The subset of an `Authentication-Results` header that matters here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuthenticationResults {
    /// DKIM verdict.
    pub dkim: AuthResult,
    /// SPF verdict.
    pub spf: AuthResult,
    /// DMARC verdict.
    pub dmarc: AuthResult,
}

impl AuthenticationResults {
    /// Creates a record from explicit verdicts.
    #[must_use]
    pub const fn new(dkim: AuthResult, spf: AuthResult, dmarc: AuthResult) -> Self {
        Self { dkim, spf, dmarc }
    }

    /// Parses the value of an `Authentication-Results` header.
    ///
    /// The first `method=value` occurrence wins; a method that does not
    /// appear is [`AuthResult::None`].
    #[must_use]
    pub fn parse(header: &str) -> Self {
        Self {
            dkim: find_verdict(header, AuthMethod::Dkim),
            spf: find_verdict(header, AuthMethod::Spf),
            dmarc: find_verdict(header, AuthMethod::Dmarc),
        }
    }
}

fn find_verdict(header: &str, method: AuthMethod) -> AuthResult {
    let lowered = header.to_ascii_lowercase();
    let needle = format!("{}=", method.as_str());

    for (pos, _) in lowered.match_indices(&needle) {
        let preceded_by_word = lowered[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if preceded_by_word {
            continue;
        }

        let rest = &header[pos + needle.len()..];
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        return AuthResult::parse(&rest[..end]);
    }

    AuthResult::None
}
