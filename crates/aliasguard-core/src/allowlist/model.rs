//! Allow-list entry model.

/// One `(alias, domain)` registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListEntry {
    /// Alias address the domain is allowed to send to, domain part lowercased.
    pub alias: String,
    /// Permitted sender domain, lowercased.
    pub domain: String,
}

impl AllowListEntry {
    /// Creates an entry, normalizing whitespace and domain case.
    #[must_use]
    pub fn new(alias: &str, domain: &str) -> Self {
        Self {
            alias: normalize_alias(alias),
            domain: domain.trim().to_lowercase(),
        }
    }
}

/// Storage form of an alias address.
///
/// Domains are case-insensitive, local parts are not: the case of the local
/// part carries ciphertext.
#[must_use]
pub fn normalize_alias(alias: &str) -> String {
    let alias = alias.trim();
    match alias.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => alias.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes() {
        let entry = AllowListEntry::new(" shop-AbC@Mine.EXAMPLE ", " News.Shop.EXAMPLE\n");
        assert_eq!(entry.alias, "shop-AbC@mine.example");
        assert_eq!(entry.domain, "news.shop.example");
    }

    #[test]
    fn test_normalize_alias_keeps_local_part() {
        assert_eq!(normalize_alias("shop-AbC@TEST.com"), "shop-AbC@test.com");
        assert_eq!(normalize_alias("shop-AbC@test.com"), "shop-AbC@test.com");
        assert_eq!(normalize_alias(" no-domain "), "no-domain");
        assert_eq!(normalize_alias(""), "");
    }
}
