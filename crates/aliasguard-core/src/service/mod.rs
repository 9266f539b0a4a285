//! Mailbox monitoring.
//!
//! Bridges a mailbox backend with the decision engine: new messages are
//! fetched, classified and moved to the folder matching their
//! classification.

mod monitor;
mod transport;

pub use monitor::{Monitor, TargetFolders};
pub use transport::{MailboxTransport, TransportError};
