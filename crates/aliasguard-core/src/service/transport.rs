//! Mailbox backend abstraction.

use std::future::Future;

/// Errors that can occur while talking to a mailbox backend.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Backend could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A mailbox operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A mailbox the monitor can read from and file into.
///
/// Message ids are opaque to the monitor; they only need to stay valid
/// between listing a message and moving it.
pub trait MailboxTransport: Send {
    /// Resolves once new mail may have arrived.
    ///
    /// Spurious wake-ups are fine; the monitor simply finds nothing new.
    fn wait_for_new_mail(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Ids of messages not yet filed.
    fn new_message_ids(&mut self)
    -> impl Future<Output = Result<Vec<String>, TransportError>> + Send;

    /// Raw header block of a message, or `None` if it vanished meanwhile.
    fn fetch_headers(
        &mut self,
        id: &str,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Moves a message into `folder`, creating the folder if needed.
    fn move_message(
        &mut self,
        id: &str,
        folder: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Ends the session; called once when the monitor stops.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send {
        async { Ok(()) }
    }
}
