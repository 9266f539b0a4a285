//! `Received` trace headers.

use chrono::{DateTime, Utc};

use crate::address::find_addresses;

/// Protocol types from RFC 3848 that imply the hop ran over TLS.
const TLS_PROTOCOLS: [&str; 6] = [
    "ESMTPS",
    "ESMTPSA",
    "LMTPS",
    "LMTPSA",
    "UTF8SMTPS",
    "UTF8SMTPSA",
];

const UNKNOWN: &str = "unknown";

/// One relay hop recorded in a `Received` header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportHop {
    /// Host the message was received from.
    pub from_domain: String,
    /// Envelope recipient named in the `for` clause, or `unknown`.
    pub to_address: String,
    /// Time the relay stamped the hop.
    pub timestamp: DateTime<Utc>,
    /// Whether the hop was encrypted with TLS.
    pub used_transport_encryption: bool,
}

impl TransportHop {
    /// Parses the value of a single `Received` header.
    ///
    /// Missing pieces fall back to `unknown`; an unreadable date falls
    /// back to the current time.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let (clauses, date) = value.split_once(';').unwrap_or((value, ""));

        let from_domain = clauses
            .split_whitespace()
            .nth(1)
            .unwrap_or(UNKNOWN)
            .to_string();

        let to_address = find_addresses(value)
            .into_iter()
            .next()
            .unwrap_or_else(|| UNKNOWN.to_string());

        let date = date.split('(').next().unwrap_or_default().trim();
        let timestamp = DateTime::parse_from_rfc2822(date)
            .map_or_else(|_| Utc::now(), |stamped| stamped.with_timezone(&Utc));

        Self {
            from_domain,
            to_address,
            timestamp,
            used_transport_encryption: mentions_tls(clauses),
        }
    }
}

fn mentions_tls(clauses: &str) -> bool {
    clauses.contains("using TLS")
        || clauses.split_whitespace().any(|token| {
            let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
            TLS_PROTOCOLS
                .iter()
                .any(|protocol| token.eq_ignore_ascii_case(protocol))
        })
}
