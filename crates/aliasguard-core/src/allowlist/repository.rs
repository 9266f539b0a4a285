//! Allow-list storage repository.

use std::future::Future;

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::model::{AllowListEntry, normalize_alias};
use crate::{Error, Result};

/// Read side of the allow-list, as the decision engine sees it.
pub trait AllowList: Send + Sync {
    /// Domains registered for `alias`, in registration order.
    ///
    /// An alias without registrations yields an empty list.
    fn permitted_domains(&self, alias: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Repository for allow-list storage and retrieval.
pub struct AllowListRepository {
    pool: SqlitePool,
}

impl AllowListRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS alias_domain (
                alias TEXT NOT NULL,
                domain TEXT PRIMARY KEY NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_alias_domain_alias ON alias_domain(alias)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Allow `domain` to send to `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomainAlreadyRegistered`] if the domain is already
    /// registered for any alias, including this one, or a database error.
    pub async fn register(&self, alias: &str, domain: &str) -> Result<AllowListEntry> {
        let entry = AllowListEntry::new(alias, domain);

        let inserted = sqlx::query("INSERT INTO alias_domain (alias, domain) VALUES (?, ?)")
            .bind(&entry.alias)
            .bind(&entry.domain)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => {
                info!(alias = %entry.alias, domain = %entry.domain, "Registered allowed domain");
                Ok(entry)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                let owner = self.owner_of(&entry.domain).await?.unwrap_or_default();
                Err(Error::DomainAlreadyRegistered {
                    domain: entry.domain,
                    owner,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Alias a domain is registered for, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn owner_of(&self, domain: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT alias FROM alias_domain WHERE domain = ?")
            .bind(domain.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("alias")))
    }
}

impl AllowList for AllowListRepository {
    async fn permitted_domains(&self, alias: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r"
            SELECT domain
            FROM alias_domain
            WHERE alias = ?
            ORDER BY rowid
            ",
        )
        .bind(normalize_alias(alias))
        .fetch_all(&self.pool)
        .await?;

        let domains: Vec<String> = rows.iter().map(|row| row.get("domain")).collect();
        debug!(alias, count = domains.len(), "Loaded allowed domains");
        Ok(domains)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALIAS: &str = "shop-0EFCF5804239mM6G490b6pGJAG3uCfBCVA@mine.example";

    #[tokio::test]
    async fn test_register_and_read() {
        let repo = AllowListRepository::in_memory().await.unwrap();

        repo.register(ALIAS, "shop.example").await.unwrap();
        repo.register(ALIAS, "Mail.Shop.Example").await.unwrap();

        let domains = repo.permitted_domains(ALIAS).await.unwrap();
        assert_eq!(domains, vec!["shop.example", "mail.shop.example"]);
    }

    #[tokio::test]
    async fn test_unknown_alias_is_empty() {
        let repo = AllowListRepository::in_memory().await.unwrap();
        assert!(repo.permitted_domains(ALIAS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alias_local_part_is_case_sensitive() {
        let repo = AllowListRepository::in_memory().await.unwrap();
        repo.register(ALIAS, "shop.example").await.unwrap();

        let lowered = ALIAS.to_lowercase();
        assert!(repo.permitted_domains(&lowered).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alias_domain_is_case_insensitive() {
        let repo = AllowListRepository::in_memory().await.unwrap();
        repo.register(ALIAS, "shop.example").await.unwrap();

        let shouted = ALIAS.replace("@mine.example", "@MINE.Example");
        assert_eq!(
            repo.permitted_domains(&shouted).await.unwrap(),
            vec!["shop.example"]
        );

        let other = AllowListRepository::in_memory().await.unwrap();
        let entry = other.register(&shouted, "shop.example").await.unwrap();
        assert_eq!(entry.alias, ALIAS);
        assert_eq!(other.permitted_domains(ALIAS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_domain_is_unique_across_aliases() {
        let repo = AllowListRepository::in_memory().await.unwrap();
        repo.register(ALIAS, "shop.example").await.unwrap();

        let err = repo
            .register("other-123@mine.example", "shop.example")
            .await
            .unwrap_err();
        match err {
            Error::DomainAlreadyRegistered { domain, owner } => {
                assert_eq!(domain, "shop.example");
                assert_eq!(owner, ALIAS);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(
            repo.permitted_domains("other-123@mine.example")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_duplicate_pair_is_rejected() {
        let repo = AllowListRepository::in_memory().await.unwrap();
        repo.register(ALIAS, "shop.example").await.unwrap();
        assert!(repo.register(ALIAS, "SHOP.example").await.is_err());
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let repo = AllowListRepository::in_memory().await.unwrap();
        repo.register(ALIAS, "shop.example").await.unwrap();
        repo.initialize().await.unwrap();

        assert_eq!(repo.permitted_domains(ALIAS).await.unwrap().len(), 1);
        assert_eq!(
            repo.owner_of("shop.example").await.unwrap().as_deref(),
            Some(ALIAS)
        );
    }
}
