//! Raw header block to structured record.

use crate::address::{domain_of, find_addresses};
use crate::auth::AuthenticationResults;
use crate::header::Headers;
use crate::received::TransportHop;

/// Structured view of the headers of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedHeaders {
    to_addresses: Vec<String>,
    from_address: Option<String>,
    cc_addresses: Vec<String>,
    bcc_addresses: Vec<String>,
    authentication_results: AuthenticationResults,
    transport_chain: Vec<TransportHop>,
}

impl ParsedHeaders {
    /// Creates a record with the fields the decision engine needs.
    #[must_use]
    pub fn new(
        to_addresses: Vec<String>,
        from_address: Option<String>,
        authentication_results: AuthenticationResults,
        transport_chain: Vec<TransportHop>,
    ) -> Self {
        Self {
            to_addresses,
            from_address,
            authentication_results,
            transport_chain,
            ..Self::default()
        }
    }

    /// Recipients on one of our own domains; the first one is primary.
    #[must_use]
    pub fn to_addresses(&self) -> &[String] {
        &self.to_addresses
    }

    /// The alias the message was addressed to.
    #[must_use]
    pub fn primary_recipient(&self) -> Option<&str> {
        self.to_addresses.first().map(String::as_str)
    }

    /// Sender address.
    #[must_use]
    pub fn from_address(&self) -> Option<&str> {
        self.from_address.as_deref()
    }

    /// Carbon-copy recipients.
    #[must_use]
    pub fn cc_addresses(&self) -> &[String] {
        &self.cc_addresses
    }

    /// Blind carbon-copy recipients.
    #[must_use]
    pub fn bcc_addresses(&self) -> &[String] {
        &self.bcc_addresses
    }

    /// Verdicts stamped by the receiving server.
    #[must_use]
    pub const fn authentication_results(&self) -> &AuthenticationResults {
        &self.authentication_results
    }

    /// Relay hops, oldest first.
    #[must_use]
    pub fn transport_chain(&self) -> &[TransportHop] {
        &self.transport_chain
    }
}

/// Builds [`ParsedHeaders`] from raw header text.
#[derive(Debug, Clone)]
pub struct HeaderExtractor {
    own_domains: Vec<String>,
}

impl HeaderExtractor {
    /// Creates an extractor for the given own domains.
    ///
    /// Only `To` addresses on these domains are kept, so the primary
    /// recipient is always one of our aliases.
    #[must_use]
    pub fn new<I, S>(own_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            own_domains: own_domains.into_iter().map(Into::into).collect(),
        }
    }

    /// Extracts the record from a raw header block.
    ///
    /// Never fails; missing or malformed headers produce empty fields.
    #[must_use]
    pub fn extract(&self, raw: &str) -> ParsedHeaders {
        let headers = Headers::parse(raw);
        self.extract_headers(&headers)
    }

    /// Extracts the record from already parsed headers.
    #[must_use]
    pub fn extract_headers(&self, headers: &Headers) -> ParsedHeaders {
        let mut transport_chain: Vec<TransportHop> = headers
            .get_all("Received")
            .into_iter()
            .map(TransportHop::parse)
            .collect();
        // Relays prepend, so the raw order is newest first.
        transport_chain.reverse();

        ParsedHeaders {
            to_addresses: self.own_recipients(headers.get("To").unwrap_or_default()),
            from_address: headers
                .get("From")
                .and_then(|from| find_addresses(from).into_iter().next()),
            cc_addresses: addresses_of(headers, "Cc"),
            bcc_addresses: addresses_of(headers, "Bcc"),
            authentication_results: headers
                .get("Authentication-Results")
                .map(AuthenticationResults::parse)
                .unwrap_or_default(),
            transport_chain,
        }
    }

    fn own_recipients(&self, to: &str) -> Vec<String> {
        let candidates = find_addresses(to);
        self.own_domains
            .iter()
            .flat_map(|own| {
                candidates.iter().filter(move |address| {
                    domain_of(address).is_some_and(|domain| domain.eq_ignore_ascii_case(own))
                })
            })
            .cloned()
            .collect()
    }
}

fn addresses_of(headers: &Headers, name: &str) -> Vec<String> {
    headers.get(name).map(find_addresses).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthResult;

    const OWN: &str = "owndomain.org";

    fn extractor() -> HeaderExtractor {
        HeaderExtractor::new([OWN])
    }

    #[test]
    fn test_extract_full_block() {
        let raw = concat!(
            "Received: from mx.owndomain.org by imap.owndomain.org with LMTP;\r\n",
            " Fri, 23 Sep 2022 13:18:50 +0000\r\n",
            "Received: from mail.shop.example by mx.owndomain.org with ESMTPS\r\n",
            " for <shop-x@owndomain.org>; Fri, 23 Sep 2022 13:18:48 +0000\r\n",
            "Authentication-Results: mx.owndomain.org; dkim=pass; spf=pass; dmarc=fail\r\n",
            "From: Shop <news@shop.example>\r\n",
            "To: someone@else.example, shop-x@owndomain.org\r\n",
            "Cc: c@cc.cc\r\n",
            "Bcc: Bcc@bcc.be\r\n",
            "\r\n",
        );

        let parsed = extractor().extract(raw);
        assert_eq!(parsed.to_addresses(), ["shop-x@owndomain.org"]);
        assert_eq!(parsed.from_address(), Some("news@shop.example"));
        assert_eq!(parsed.cc_addresses(), ["c@cc.cc"]);
        assert_eq!(parsed.bcc_addresses(), ["Bcc@bcc.be"]);
        assert_eq!(parsed.authentication_results().dmarc, AuthResult::Fail);

        let chain = parsed.transport_chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].from_domain, "mail.shop.example");
        assert!(chain[0].used_transport_encryption);
        assert_eq!(chain[1].from_domain, "mx.owndomain.org");
        assert!(!chain[1].used_transport_encryption);
    }

    #[test]
    fn test_to_not_own_domain() {
        let parsed = extractor().extract("To: hello@notowndomain.org\r\n\r\n");
        assert!(parsed.to_addresses().is_empty());
        assert_eq!(parsed.primary_recipient(), None);
    }

    #[test]
    fn test_recipients_follow_own_domain_order() {
        let extractor = HeaderExtractor::new(["b.example", "a.example"]);
        let parsed = extractor.extract("To: x@a.example, y@B.example\r\n");
        assert_eq!(parsed.to_addresses(), ["y@B.example", "x@a.example"]);
    }

    #[test]
    fn test_missing_headers() {
        let parsed = extractor().extract("");
        assert_eq!(parsed, ParsedHeaders::default());
        assert_eq!(parsed.from_address(), None);
        assert_eq!(
            *parsed.authentication_results(),
            AuthenticationResults::default()
        );
    }
}
