//! Type-state IMAP client connection.
//!
//! The connection states are:
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after LOGIN
//! - `Selected`: after SELECT
//!
//! Each state only exposes the commands valid in it.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

pub use self::authenticated::MailboxStatus;
pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::response::{Response, ResponseParser, Status, Untagged, capabilities_in};
use crate::{Error, Result};

/// IMAP client connection with type-state.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    tags: TagGenerator,
    capabilities: Vec<String>,
    /// Tag of an IDLE whose handle was dropped before DONE was sent.
    pub(crate) idle_tag: Option<String>,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Untagged data and completion text of a successful command.
pub(crate) struct Completed {
    pub untagged: Vec<Untagged>,
    pub text: String,
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Checks if the server advertises a capability, ignoring case.
    fn has_capability(&self, name: &str) -> bool {
        self.capabilities
            .iter()
            .any(|cap| cap.eq_ignore_ascii_case(name))
    }

    /// Returns true if the server supports IDLE (RFC 2177).
    #[must_use]
    pub fn supports_idle(&self) -> bool {
        self.has_capability("IDLE")
    }

    /// Returns true if the server supports MOVE (RFC 6851).
    #[must_use]
    pub fn supports_move(&self) -> bool {
        self.has_capability("MOVE")
    }

    /// Returns true if the server supports UIDPLUS (RFC 4315).
    #[must_use]
    pub fn supports_uidplus(&self) -> bool {
        self.has_capability("UIDPLUS")
    }

    /// Sends a NOOP. Servers use the response to report mailbox changes.
    pub async fn noop(&mut self) -> Result<()> {
        self.run(&Command::Noop).await.map(drop)
    }

    /// Logs out and closes the session.
    pub async fn logout(mut self) -> Result<()> {
        self.run(&Command::Logout).await.map(drop)
    }

    /// Refreshes the stored capabilities with CAPABILITY.
    async fn refresh_capabilities(&mut self) -> Result<()> {
        let completed = self.run(&Command::Capability).await?;
        for untagged in completed.untagged {
            if let Untagged::Capability(caps) = untagged {
                self.capabilities = caps;
            }
        }
        Ok(())
    }

    /// Takes capabilities from untagged CAPABILITY data or a
    /// `[CAPABILITY ...]` code. Returns false if neither was present.
    fn update_capabilities(&mut self, completed: &Completed) -> bool {
        let listed = completed.untagged.iter().rev().find_map(|untagged| match untagged {
            Untagged::Capability(caps) => Some(caps.clone()),
            _ => None,
        });
        match listed.or_else(|| capabilities_in(&completed.text)) {
            Some(caps) => {
                self.capabilities = caps;
                true
            }
            None => false,
        }
    }

    /// Sends a command and collects its responses.
    ///
    /// Fails with the server's NO, BAD or BYE text when the command does
    /// not complete with OK.
    pub(crate) async fn run(&mut self, command: &Command) -> Result<Completed> {
        let tag = self.send(command).await?;

        let mut untagged = Vec::new();
        for raw in self.read_until_tagged(&tag).await? {
            match ResponseParser::parse(&raw)? {
                Response::Tagged {
                    tag: done,
                    status,
                    text,
                } if done == tag => {
                    check_status(status, text.clone())?;
                    return Ok(Completed { untagged, text });
                }
                Response::Untagged(data) => untagged.push(data),
                Response::Tagged { tag: other, .. } => {
                    debug!(tag = other, "Ignoring response for another tag");
                }
                Response::Continuation(_) => {
                    return Err(Error::Protocol(format!(
                        "unexpected continuation after {}",
                        command.name()
                    )));
                }
            }
        }

        Err(Error::Protocol("missing tagged response".to_string()))
    }

    /// Validates and writes a command, returning its tag.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<String> {
        command.check_arguments()?;
        self.finish_abandoned_idle().await?;

        let tag = self.tags.next();
        trace!(tag, command = command.name(), "Sending command");
        self.stream.write_command(&command.serialize(&tag)).await?;
        Ok(tag)
    }

    /// Ends an IDLE left open by a dropped handle.
    async fn finish_abandoned_idle(&mut self) -> Result<()> {
        if let Some(tag) = self.idle_tag.take() {
            debug!(tag, "Ending abandoned IDLE");
            self.stream.write_command(&Command::Done.serialize("")).await?;
            self.read_until_tagged(&tag).await?;
        }
        Ok(())
    }

    /// Reads responses up to and including the one tagged `tag`.
    pub(crate) async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut responses = Vec::new();
        loop {
            let response = self.stream.read_response().await?;
            let is_tagged = response
                .strip_prefix(tag.as_bytes())
                .is_some_and(|rest| rest.first() == Some(&b' '));
            responses.push(response);
            if is_tagged {
                return Ok(responses);
            }
        }
    }

    /// Moves the connection to another state.
    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tags: self.tags,
            capabilities: self.capabilities,
            idle_tag: self.idle_tag,
            _state: PhantomData,
        }
    }
}

/// Maps a completion status to a result.
pub(crate) fn check_status(status: Status, text: String) -> Result<()> {
    match status {
        Status::Ok | Status::PreAuth => Ok(()),
        Status::No => Err(Error::No(text)),
        Status::Bad => Err(Error::Bad(text)),
        Status::Bye => Err(Error::Bye(text)),
    }
}
