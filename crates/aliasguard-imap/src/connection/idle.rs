//! IMAP IDLE command support (RFC 2177).
//!
//! IDLE lets the server push mailbox changes instead of the client polling.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use super::client::{Client, Selected, check_status};
use crate::command::Command;
use crate::response::{Response, ResponseParser, Status, Untagged};
use crate::{Error, Result};

/// Event received during IDLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// New message count (EXISTS response).
    Exists(u32),
    /// Message expunged (EXPUNGE response), by sequence number.
    Expunge(u32),
    /// Message flags changed (FETCH response), by sequence number.
    Fetch(u32),
    /// Recent count changed.
    Recent(u32),
    /// Nothing arrived before the timeout, or the server said something
    /// that does not concern the mailbox.
    Timeout,
}

impl IdleEvent {
    /// Maps an untagged response to an event. BYE is an error.
    pub(crate) fn from_untagged(untagged: Untagged) -> Result<Option<Self>> {
        Ok(match untagged {
            Untagged::Exists(n) => Some(Self::Exists(n)),
            Untagged::Recent(n) => Some(Self::Recent(n)),
            Untagged::Expunge(seq) => Some(Self::Expunge(seq)),
            Untagged::Fetch(data) => Some(Self::Fetch(data.seq)),
            Untagged::Status {
                status: Status::Bye,
                text,
            } => return Err(Error::Bye(text)),
            _ => None,
        })
    }
}

/// Handle for an active IDLE.
///
/// Holds the client mutably until [`IdleHandle::done`]. If the handle is
/// dropped without `done` (for example when the waiting future is
/// cancelled), the client sends DONE before its next command.
pub struct IdleHandle<'a, S> {
    client: &'a mut Client<S, Selected>,
    tag: String,
    pending: Option<IdleEvent>,
    ended_by_server: bool,
}

impl<'a, S> IdleHandle<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) const fn new(
        client: &'a mut Client<S, Selected>,
        tag: String,
        pending: Option<IdleEvent>,
    ) -> Self {
        Self {
            client,
            tag,
            pending,
            ended_by_server: false,
        }
    }

    /// Waits for a server event or the timeout.
    ///
    /// RFC 2177 asks clients to re-issue IDLE at least every 29 minutes.
    pub async fn wait(&mut self, duration: Duration) -> Result<IdleEvent> {
        if let Some(event) = self.pending.take() {
            return Ok(event);
        }
        if self.ended_by_server {
            return Ok(IdleEvent::Timeout);
        }

        match timeout(duration, self.client.stream.read_response()).await {
            Ok(Ok(response)) => self.parse_event(&response),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(IdleEvent::Timeout),
        }
    }

    fn parse_event(&mut self, response: &[u8]) -> Result<IdleEvent> {
        match ResponseParser::parse(response)? {
            Response::Untagged(untagged) => {
                Ok(IdleEvent::from_untagged(untagged)?.unwrap_or(IdleEvent::Timeout))
            }
            Response::Continuation(_) => Err(Error::Protocol(
                "unexpected continuation during IDLE".to_string(),
            )),
            Response::Tagged { tag, status, text } if tag == self.tag => {
                // The server ended IDLE on its own; DONE must not be sent.
                self.ended_by_server = true;
                self.client.idle_tag = None;
                check_status(status, text)?;
                Ok(IdleEvent::Timeout)
            }
            Response::Tagged { tag, .. } => Err(Error::Protocol(format!(
                "unexpected tag {tag} during IDLE"
            ))),
        }
    }

    /// Leaves IDLE by sending DONE and reading the completion.
    pub async fn done(self) -> Result<()> {
        self.client.idle_tag = None;
        if self.ended_by_server {
            return Ok(());
        }

        self.client
            .stream
            .write_command(&Command::Done.serialize(""))
            .await?;

        loop {
            let response = self.client.stream.read_response().await?;
            match ResponseParser::parse(&response)? {
                Response::Tagged { tag, status, text } if tag == self.tag => {
                    return check_status(status, text);
                }
                Response::Untagged(Untagged::Status {
                    status: Status::Bye,
                    text,
                }) => return Err(Error::Bye(text)),
                _ => {}
            }
        }
    }
}
