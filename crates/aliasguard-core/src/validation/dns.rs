//! Resolver-backed address validation.

use std::future::Future;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use tracing::{debug, warn};

use super::{AddressError, AddressValidator, SyntaxReport, SyntaxValidator};

/// Answers whether a domain can receive mail.
pub trait MailHostResolver: Send + Sync {
    /// `Ok(true)` if the domain has a usable mail host.
    ///
    /// `Ok(false)` means the records say no; `Err` carries a lookup
    /// failure.
    fn accepts_mail(&self, domain: &str) -> impl Future<Output = Result<bool, String>> + Send;
}

/// [`MailHostResolver`] on the system's DNS configuration.
///
/// Answers are cached by the resolver for their TTL.
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Creates a resolver from `/etc/resolv.conf` (or the platform
    /// equivalent), giving up on each query after `timeout`.
    ///
    /// Falls back to the resolver crate's default upstreams when the system
    /// configuration cannot be read.
    #[must_use]
    pub fn from_system_conf(timeout: Duration) -> Self {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Could not read system DNS configuration, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            });
        opts.timeout = timeout;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver").finish_non_exhaustive()
    }
}

impl MailHostResolver for HickoryResolver {
    async fn accepts_mail(&self, domain: &str) -> Result<bool, String> {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        match self.resolver.mx_lookup(fqdn.as_str()).await {
            // A lone `MX 0 .` is a null MX (RFC 7505).
            Ok(records) => Ok(records.iter().any(|mx| !mx.exchange().is_root())),
            Err(e) if no_records(&e) => {
                debug!(domain, "No MX record, trying the implicit MX");
                match self.resolver.lookup_ip(fqdn.as_str()).await {
                    Ok(addresses) => Ok(addresses.iter().next().is_some()),
                    Err(e) if no_records(&e) => Ok(false),
                    Err(e) => Err(e.to_string()),
                }
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

fn no_records(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

/// Syntax check followed by a mail-host lookup on the domain.
#[derive(Debug, Clone)]
pub struct DnsValidator<R = HickoryResolver> {
    resolver: R,
    timeout: Duration,
}

impl DnsValidator {
    /// Validator on the system resolver with one overall `timeout` per
    /// address.
    #[must_use]
    pub fn system(timeout: Duration) -> Self {
        Self::new(HickoryResolver::from_system_conf(timeout), timeout)
    }
}

impl<R: MailHostResolver> DnsValidator<R> {
    /// Validator on a custom resolver.
    #[must_use]
    pub const fn new(resolver: R, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }
}

impl<R: MailHostResolver> AddressValidator for DnsValidator<R> {
    async fn validate(&self, address: &str) -> SyntaxReport {
        let validated = SyntaxValidator.check(address)?;

        let lookup = self.resolver.accepts_mail(&validated.domain);
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(true)) => Ok(validated),
            Ok(Ok(false)) => Err(AddressError::NoMailServer),
            Ok(Err(reason)) => Err(AddressError::LookupFailed(format!(
                "DNS lookup for {} failed: {reason}",
                validated.domain
            ))),
            Err(_) => Err(AddressError::LookupTimedOut),
        }
    }
}
