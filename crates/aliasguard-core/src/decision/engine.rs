//! Per-message decision.

use aliasguard_mime::{ParsedHeaders, domain_of};
use tracing::{error, info, warn};

use super::model::{Checks, Classification};
use crate::alias::AliasCodec;
use crate::allowlist::AllowList;
use crate::validation::{AddressValidator, SyntaxValidator};

/// Subdomain labels that may precede a registered domain.
const MAX_PREFIX_LABELS: usize = 3;

/// Classifies messages from their parsed headers.
///
/// Every check fails soft: a lookup or parse problem turns that one check
/// `false` and is logged, it never aborts the decision.
pub struct DecisionEngine<A, V = SyntaxValidator> {
    codec: AliasCodec,
    allow_list: A,
    validator: V,
}

impl<A: AllowList> DecisionEngine<A> {
    /// Creates an engine with the offline syntax validator.
    #[must_use]
    pub const fn new(codec: AliasCodec, allow_list: A) -> Self {
        Self {
            codec,
            allow_list,
            validator: SyntaxValidator,
        }
    }
}

impl<A: AllowList, V: AddressValidator> DecisionEngine<A, V> {
    /// Creates an engine with a custom address validator.
    #[must_use]
    pub const fn with_validator(codec: AliasCodec, allow_list: A, validator: V) -> Self {
        Self {
            codec,
            allow_list,
            validator,
        }
    }

    /// Classifies one message.
    pub async fn decide(&self, headers: &ParsedHeaders) -> Classification {
        self.evaluate(headers).await.classify()
    }

    /// Runs every check for one message and logs the outcome.
    pub async fn evaluate(&self, headers: &ParsedHeaders) -> Checks {
        let recipient = headers.primary_recipient().filter(|r| !r.is_empty());
        let from = headers.from_address();
        let auth = headers.authentication_results();

        let checks = Checks {
            alias_signature: recipient
                .is_some_and(|alias| self.codec.extract(alias).signature_valid()),
            from_syntax: self.from_syntax_ok(from).await,
            dkim: auth.dkim.is_pass(),
            spf: auth.spf.is_pass(),
            dmarc: auth.dmarc.is_pass(),
            transport_encrypted: headers
                .transport_chain()
                .iter()
                .any(|hop| hop.used_transport_encryption),
            send_from_allowed: self.send_from_allowed(recipient, from).await,
        };
        let classification = checks.classify();

        info!(
            alias = recipient.unwrap_or_default(),
            from = from.unwrap_or_default(),
            alias_signature = checks.alias_signature,
            from_syntax = checks.from_syntax,
            dkim = checks.dkim,
            spf = checks.spf,
            dmarc = checks.dmarc,
            transport_encrypted = checks.transport_encrypted,
            send_from_allowed = checks.send_from_allowed,
            classification = %classification,
            "Message classified"
        );

        checks
    }

    async fn from_syntax_ok(&self, from: Option<&str>) -> bool {
        let Some(from) = from else {
            error!("Message has no From address");
            return false;
        };
        match self.validator.validate(from).await {
            Ok(_) => true,
            Err(e) => {
                error!(from, error = %e, "From address failed validation");
                false
            }
        }
    }

    async fn send_from_allowed(&self, recipient: Option<&str>, from: Option<&str>) -> bool {
        let (Some(alias), Some(from_domain)) = (recipient, from.and_then(domain_of)) else {
            return false;
        };

        match self.allow_list.permitted_domains(alias).await {
            Ok(registered) => registered
                .iter()
                .any(|domain| domain_allowed(from_domain, domain)),
            Err(e) => {
                warn!(alias, error = %e, "Could not read allow-list");
                false
            }
        }
    }
}

/// Whether mail from `from_domain` is covered by `registered`.
///
/// Matches the registered domain itself or the domain preceded by up to
/// three alphanumeric subdomain labels, case-insensitively.
#[must_use]
pub fn domain_allowed(from_domain: &str, registered: &str) -> bool {
    let from_domain = from_domain.trim().to_ascii_lowercase();
    let registered = registered.trim().to_ascii_lowercase();
    if registered.is_empty() {
        return false;
    }
    if from_domain == registered {
        return true;
    }

    let Some(prefix) = from_domain
        .strip_suffix(registered.as_str())
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return false;
    };

    let labels: Vec<&str> = prefix.split('.').collect();
    labels.len() <= MAX_PREFIX_LABELS
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}
