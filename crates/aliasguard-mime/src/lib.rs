//! # aliasguard-mime
//!
//! Header extraction for inbound mail.
//!
//! Turns a raw RFC 5322 header block into the structured record the
//! decision engine in `aliasguard-core` consumes.
//!
//! ## Features
//!
//! - **Header parsing**: unfolding of continuation lines, case-insensitive lookup
//! - **Address scanning**: pulls bare addresses out of `To`, `From`, `Cc` and `Received`
//! - **Authentication results**: DKIM, SPF and DMARC verdicts stamped by the receiving MTA
//! - **Transport chain**: one hop per `Received` header, oldest first
//!
//! ## Quick Start
//!
//! ```
//! use aliasguard_mime::{AuthResult, HeaderExtractor};
//!
//! let raw = "From: Alice <alice@shop.example>\r\n\
//!            To: shop-ABC@mine.example\r\n\
//!            Authentication-Results: mx.mine.example; spf=pass; dkim=pass\r\n\
//!            \r\n";
//!
//! let parsed = HeaderExtractor::new(["mine.example"]).extract(raw);
//! assert_eq!(parsed.primary_recipient(), Some("shop-ABC@mine.example"));
//! assert_eq!(parsed.from_address(), Some("alice@shop.example"));
//! assert_eq!(parsed.authentication_results().spf, AuthResult::Pass);
//! assert_eq!(parsed.authentication_results().dmarc, AuthResult::None);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod auth;
mod error;
mod extract;
mod header;
mod received;

pub use address::{domain_of, find_addresses};
pub use auth::{AuthResult, AuthenticationResults};
pub use error::{Error, Result};
pub use extract::{HeaderExtractor, ParsedHeaders};
pub use header::Headers;
pub use received::TransportHop;
