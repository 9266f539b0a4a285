//! Implementation for the not-authenticated state.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::response::{Response, ResponseParser, Status, Untagged, capabilities_in};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it carries.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(Untagged::Status {
                status: Status::Ok | Status::PreAuth,
                text,
            }) => capabilities_in(&text).unwrap_or_default(),
            Response::Untagged(Untagged::Status {
                status: Status::Bye,
                text,
            }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };

        Ok(Self {
            stream: framed,
            tags: TagGenerator::default(),
            capabilities,
            idle_tag: None,
            _state: PhantomData,
        })
    }

    /// Authenticates with LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success.
    /// Capabilities are refreshed, since servers often advertise more after
    /// login.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let completed = self
            .run(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        if !self.update_capabilities(&completed) {
            debug!("Login response carried no capabilities, asking");
            self.refresh_capabilities().await?;
        }

        Ok(self.into_state())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    #[tokio::test]
    async fn test_greeting_capabilities() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 IDLE] Dovecot ready.\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        assert!(client.supports_idle());
        assert!(!client.supports_move());
    }

    #[tokio::test]
    async fn test_bye_greeting() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();

        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_login_takes_capabilities_from_completion() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN alice secret\r\n")
            .read(b"A0000 OK [CAPABILITY IMAP4rev1 IDLE MOVE UIDPLUS] Logged in\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        assert!(!client.supports_idle());

        let client = client.login("alice", "secret").await.unwrap();
        assert!(client.supports_idle());
        assert!(client.supports_move());
        assert!(client.supports_uidplus());
    }

    #[tokio::test]
    async fn test_login_asks_for_capabilities() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN alice secret\r\n")
            .read(b"A0000 OK Logged in\r\n")
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 IDLE\r\n")
            .read(b"A0001 OK done\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("alice", "secret").await.unwrap();
        assert!(client.supports_idle());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN alice wrong\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] Authentication failed.\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
        assert!(!err.is_connection_lost());
    }
}
