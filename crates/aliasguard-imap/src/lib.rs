//! Minimal IMAP4rev1 client for mailbox monitors.
//!
//! Covers what a filing daemon needs and nothing more: connecting over TLS
//! (or plaintext for local servers), LOGIN, SELECT, IDLE (RFC 2177),
//! `UID SEARCH`, header-only `UID FETCH`, `UID MOVE` (RFC 6851) with the
//! COPY/STORE/EXPUNGE fallback, CREATE and LOGOUT.
//!
//! The client uses the type-state pattern, so commands are only available
//! in the connection state where the protocol allows them:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use aliasguard_imap::{Client, connect_tls};
//!
//! # async fn example() -> aliasguard_imap::Result<()> {
//! let stream = connect_tls("imap.example.com", 993).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.login("user", "password").await?;
//! let (mut client, status) = client.select("INBOX").await?;
//! println!("{} messages", status.exists);
//!
//! let unseen = client.uid_search("UNSEEN").await?;
//! for uid in unseen {
//!     let header = client.uid_fetch_header_fields(uid, &["From", "To"]).await?;
//!     println!("{uid}: {:?}", header.map(|h| h.len()));
//! }
//!
//! let mut idle = client.idle().await?;
//! let event = idle.wait(Duration::from_secs(300)).await?;
//! idle.done().await?;
//! println!("{event:?}");
//!
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

mod command;
mod connection;
mod error;
mod response;

pub use connection::{
    Authenticated, Client, IdleEvent, IdleHandle, ImapStream, MailboxStatus, NotAuthenticated,
    Selected, connect_plain, connect_tls,
};
pub use error::{Error, Result};
