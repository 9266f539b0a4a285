//! Offline address syntax.

use super::{AddressError, AddressValidator, SyntaxReport, ValidatedAddress};

const MAX_LOCAL_PART: usize = 64;
const MAX_DOMAIN: usize = 253;
const MAX_LABEL: usize = 63;
const LOCAL_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";

/// Offline RFC 5321 dot-atom syntax check.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxValidator;

impl SyntaxValidator {
    /// Checks one address without touching the network.
    ///
    /// # Errors
    ///
    /// Returns the first [`AddressError`] found.
    pub fn check(self, address: &str) -> SyntaxReport {
        if address.is_empty() {
            return Err(AddressError::Empty);
        }

        let mut parts = address.split('@');
        let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
            return Err(AddressError::MissingAt);
        };
        if parts.next().is_some() {
            return Err(AddressError::MultipleAt);
        }

        validate_local_part(local)?;
        validate_domain(domain)?;

        Ok(ValidatedAddress {
            local_part: local.to_string(),
            domain: domain.to_lowercase(),
        })
    }
}

impl AddressValidator for SyntaxValidator {
    async fn validate(&self, address: &str) -> SyntaxReport {
        self.check(address)
    }
}

fn validate_local_part(local: &str) -> Result<(), AddressError> {
    if local.is_empty() {
        return Err(AddressError::EmptyLocalPart);
    }
    if local.chars().count() > MAX_LOCAL_PART {
        return Err(AddressError::LocalPartTooLong);
    }

    let atoms_ok = local.split('.').all(|atom| {
        !atom.is_empty()
            && atom
                .chars()
                .all(|c| c.is_alphanumeric() || LOCAL_SPECIALS.contains(c))
    });
    if atoms_ok {
        Ok(())
    } else {
        Err(AddressError::InvalidLocalPart)
    }
}

fn validate_domain(domain: &str) -> Result<(), AddressError> {
    if domain.is_empty() {
        return Err(AddressError::EmptyDomain);
    }
    if domain.len() > MAX_DOMAIN {
        return Err(AddressError::DomainTooLong);
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(AddressError::DomainWithoutDot);
    }

    let label_ok = |label: &&str| {
        !label.is_empty()
            && label.chars().count() <= MAX_LABEL
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    };
    let tld_ok = labels
        .last()
        .is_some_and(|tld| !tld.chars().all(|c| c.is_ascii_digit()));

    if labels.iter().all(label_ok) && tld_ok {
        Ok(())
    } else {
        Err(AddressError::InvalidDomainLabel)
    }
}
