//! # aliasguard-core
//!
//! Sorting incoming mail by whether it was sent to a self-verifying alias.
//!
//! This crate provides:
//! - Alias generation and verification ([`AliasCodec`])
//! - Per-alias sender allow-list (`SQLite`)
//! - The verification decision ([`DecisionEngine`])
//! - A mailbox monitor that files each message by its decision
//! - Configuration loading and validation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod alias;
pub mod allowlist;
pub mod config;
pub mod decision;
mod error;
pub mod service;
pub mod validation;

pub use alias::{AliasCodec, AliasError, GeneratedAlias, SharedKey, VerificationResult};
pub use allowlist::{AllowList, AllowListEntry, AllowListRepository};
pub use config::{Config, ConfigError};
pub use decision::{Checks, Classification, DecisionEngine};
pub use error::{Error, Result};
pub use service::{MailboxTransport, Monitor, TargetFolders, TransportError};
pub use validation::{
    AddressError, AddressValidator, DnsValidator, HickoryResolver, MailHostResolver,
    SyntaxValidator, ValidatedAddress,
};
