//! Runtime configuration.
//!
//! Loaded once at startup from a TOML file. Every problem is reported at
//! once by [`Config::validate`]; a bad configuration stops the process
//! before any message is touched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::alias::SharedKey;
use crate::service::TargetFolders;
use crate::{Error, Result};

/// Environment variable that overrides `encryption.key`.
pub const KEY_ENV: &str = "ALIASGUARD_KEY";

/// Environment variable that overrides `imap.password`.
pub const IMAP_PASSWORD_ENV: &str = "ALIASGUARD_IMAP_PASSWORD";

/// Longest IDLE before it is re-issued; servers may drop it after 30 minutes.
const MAX_IDLE_SECS: u64 = 29 * 60;

/// Full configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Alias secret.
    pub encryption: EncryptionConfig,
    /// Own domains and target folders.
    pub user: UserConfig,
    /// Allow-list database.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// From-address checks.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// IMAP mailbox watched by the `watch` command.
    #[serde(default)]
    pub imap: Option<ImapConfig>,
    /// Directory-backed mailbox, used by `watch` when there is no `[imap]`.
    #[serde(default)]
    pub spool: Option<SpoolConfig>,
}

/// Alias secret section.
#[derive(Clone, Deserialize)]
pub struct EncryptionConfig {
    /// Secret whose UTF-8 bytes form the AES key.
    pub key: String,
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Own domains and the folders classified mail is moved to.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Domains aliases are issued under; the first one is the default.
    #[serde(deserialize_with = "domain_list")]
    pub own_domains: Vec<String>,
    /// Folder for verified mail.
    pub target_folder_verified: String,
    /// Folder for mail that failed validation.
    pub target_folder_failed_validation: String,
}

/// Allow-list database section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` file; defaults to the user data directory.
    pub path: Option<PathBuf>,
}

/// From-address validation section.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Upper bound for the mail-host lookup of one address.
    #[serde(default = "default_dns_timeout")]
    pub dns_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            dns_timeout_secs: default_dns_timeout(),
        }
    }
}

impl ValidationConfig {
    /// DNS timeout as a [`Duration`].
    #[must_use]
    pub const fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }
}

/// How the IMAP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImapSecurity {
    /// TLS from the first byte (port 993).
    #[default]
    Tls,
    /// No encryption, for a bridge listening on localhost.
    Plain,
}

/// IMAP server section.
#[derive(Clone, Deserialize)]
pub struct ImapConfig {
    /// Server host name.
    #[serde(default = "default_imap_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_imap_port")]
    pub port: u16,
    /// Connection security.
    #[serde(default)]
    pub security: ImapSecurity,
    /// Login name.
    pub username: String,
    /// Login password; may instead come from `ALIASGUARD_IMAP_PASSWORD`.
    #[serde(default)]
    pub password: String,
    /// Folder that receives new mail.
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    /// Seconds to stay in IDLE before checking again.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl ImapConfig {
    /// IDLE timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mailbox", &self.mailbox)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .finish()
    }
}

/// Directory-backed mailbox section.
#[derive(Debug, Clone, Deserialize)]
pub struct SpoolConfig {
    /// Root directory holding one sub-directory per folder.
    pub root: PathBuf,
    /// Folder that receives new mail.
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    /// Seconds between checks for new mail.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl SpoolConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

const fn default_poll_interval() -> u64 {
    5
}

const fn default_dns_timeout() -> u64 {
    10
}

fn default_imap_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_imap_port() -> u16 {
    993
}

const fn default_idle_timeout() -> u64 {
    300
}

/// Whether two folder names denote the same folder. `INBOX` is
/// case-insensitive, every other name is compared as written.
fn same_folder(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    a == b || (a.eq_ignore_ascii_case("INBOX") && b.eq_ignore_ascii_case("INBOX"))
}

/// Accepts either a list or a comma-separated string.
fn domain_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Domains {
        List(Vec<String>),
        Joined(String),
    }

    let domains = match Domains::deserialize(deserializer)? {
        Domains::List(list) => list,
        Domains::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(domains
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect())
}

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Key has the wrong length for AES.
    InvalidKeyLength(usize),
    /// No own domain configured.
    NoOwnDomains,
    /// Verified folder name is empty.
    EmptyVerifiedFolder,
    /// Failed-validation folder name is empty.
    EmptyFailedFolder,
    /// Spool mailbox name is empty.
    EmptySpoolMailbox,
    /// Spool poll interval is zero.
    InvalidPollInterval,
    /// Spool mailbox is also a target folder, so filed mail would be
    /// picked up again.
    SpoolMailboxIsTargetFolder,
    /// IMAP host is empty.
    EmptyImapHost,
    /// IMAP user name is empty.
    EmptyImapUsername,
    /// IMAP mailbox name is empty.
    EmptyImapMailbox,
    /// IMAP mailbox is also a target folder.
    ImapMailboxIsTargetFolder,
    /// IDLE timeout is zero or longer than 29 minutes.
    InvalidIdleTimeout,
    /// DNS timeout is zero.
    InvalidDnsTimeout,
}

impl ConfigError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidKeyLength(_) => "Key must be 16, 24 or 32 bytes long",
            Self::NoOwnDomains => "At least one own domain is required",
            Self::EmptyVerifiedFolder => "Verified folder name is required",
            Self::EmptyFailedFolder => "Failed validation folder name is required",
            Self::EmptySpoolMailbox => "Spool mailbox name is required",
            Self::InvalidPollInterval => "Poll interval must be at least one second",
            Self::SpoolMailboxIsTargetFolder | Self::ImapMailboxIsTargetFolder => {
                "Watched mailbox must differ from both target folders"
            }
            Self::EmptyImapHost => "IMAP host is required",
            Self::EmptyImapUsername => "IMAP username is required",
            Self::EmptyImapMailbox => "IMAP mailbox name is required",
            Self::InvalidIdleTimeout => "IDLE timeout must be between 1 second and 29 minutes",
            Self::InvalidDnsTimeout => "DNS timeout must be at least one second",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidKeyLength(_) => "encryption.key",
            Self::NoOwnDomains => "user.own_domains",
            Self::EmptyVerifiedFolder => "user.target_folder_verified",
            Self::EmptyFailedFolder => "user.target_folder_failed_validation",
            Self::EmptySpoolMailbox | Self::SpoolMailboxIsTargetFolder => "spool.mailbox",
            Self::InvalidPollInterval => "spool.poll_interval_secs",
            Self::EmptyImapHost => "imap.host",
            Self::EmptyImapUsername => "imap.username",
            Self::EmptyImapMailbox | Self::ImapMailboxIsTargetFolder => "imap.mailbox",
            Self::InvalidIdleTimeout => "imap.idle_timeout_secs",
            Self::InvalidDnsTimeout => "validation.dns_timeout_secs",
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field(), self.message())
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema or
    /// [`Config::validate`] finds problems.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate().map_err(Error::InvalidConfig)?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    ///
    /// A non-empty `ALIASGUARD_KEY` environment variable replaces the key
    /// from the file, and `ALIASGUARD_IMAP_PASSWORD` the IMAP password.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&text)?;
        if let Ok(key) = std::env::var(KEY_ENV) {
            if !key.is_empty() {
                config.encryption.key = key;
            }
        }
        if let (Some(imap), Ok(password)) = (&mut config.imap, std::env::var(IMAP_PASSWORD_ENV)) {
            if !password.is_empty() {
                imap.password = password;
            }
        }
        config.validate().map_err(Error::InvalidConfig)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Returns `Ok(())` if valid, or every problem found.
    ///
    /// # Errors
    ///
    /// Returns a vector of `ConfigError` if any field is invalid.
    pub fn validate(&self) -> std::result::Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        let key_len = self.encryption.key.len();
        if !SharedKey::VALID_LENGTHS.contains(&key_len) {
            errors.push(ConfigError::InvalidKeyLength(key_len));
        }

        if self.user.own_domains.is_empty() {
            errors.push(ConfigError::NoOwnDomains);
        }
        if self.user.target_folder_verified.trim().is_empty() {
            errors.push(ConfigError::EmptyVerifiedFolder);
        }
        if self.user.target_folder_failed_validation.trim().is_empty() {
            errors.push(ConfigError::EmptyFailedFolder);
        }

        if self.validation.dns_timeout_secs == 0 {
            errors.push(ConfigError::InvalidDnsTimeout);
        }

        if let Some(imap) = &self.imap {
            if imap.host.trim().is_empty() {
                errors.push(ConfigError::EmptyImapHost);
            }
            if imap.username.trim().is_empty() {
                errors.push(ConfigError::EmptyImapUsername);
            }
            if imap.mailbox.trim().is_empty() {
                errors.push(ConfigError::EmptyImapMailbox);
            } else if self.is_target_folder(&imap.mailbox) {
                errors.push(ConfigError::ImapMailboxIsTargetFolder);
            }
            if !(1..=MAX_IDLE_SECS).contains(&imap.idle_timeout_secs) {
                errors.push(ConfigError::InvalidIdleTimeout);
            }
        }

        if let Some(spool) = &self.spool {
            if spool.mailbox.trim().is_empty() {
                errors.push(ConfigError::EmptySpoolMailbox);
            } else if self.is_target_folder(&spool.mailbox) {
                errors.push(ConfigError::SpoolMailboxIsTargetFolder);
            }
            if spool.poll_interval_secs == 0 {
                errors.push(ConfigError::InvalidPollInterval);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn is_target_folder(&self, mailbox: &str) -> bool {
        same_folder(mailbox, &self.user.target_folder_verified)
            || same_folder(mailbox, &self.user.target_folder_failed_validation)
    }

    /// The alias key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key has the wrong length.
    pub fn shared_key(&self) -> Result<SharedKey> {
        Ok(SharedKey::from_secret(&self.encryption.key)?)
    }

    /// Folder names for the monitor.
    #[must_use]
    pub fn target_folders(&self) -> TargetFolders {
        TargetFolders {
            verified: self.user.target_folder_verified.clone(),
            failed_validation: self.user.target_folder_failed_validation.clone(),
        }
    }

    /// Domain new aliases are issued under.
    #[must_use]
    pub fn primary_domain(&self) -> &str {
        self.user
            .own_domains
            .first()
            .map_or_else(Default::default, String::as_str)
    }
}
