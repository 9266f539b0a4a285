//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::Command;
use crate::response::{Untagged, uid_validity_in};

/// What SELECT reported about the mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// `UIDVALIDITY`, if reported. UIDs are only stable while it is
    /// unchanged.
    pub uid_validity: Option<u32>,
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox read-write.
    ///
    /// Consumes self and returns a client in the selected state.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let completed = self
            .run(&Command::Select {
                mailbox: mailbox.to_string(),
            })
            .await?;

        let mut status = MailboxStatus::default();
        for untagged in &completed.untagged {
            match untagged {
                Untagged::Exists(n) => status.exists = *n,
                Untagged::Status { text, .. } => {
                    if let Some(validity) = uid_validity_in(text) {
                        status.uid_validity = Some(validity);
                    }
                }
                _ => {}
            }
        }

        Ok((self.into_state(), status))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn test_select_reports_status() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A0000 LOGIN alice secret\r\n")
            .read(b"A0000 OK [CAPABILITY IMAP4rev1 IDLE] Logged in\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
            .read(b"* 172 EXISTS\r\n")
            .read(b"* 1 RECENT\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"A0001 OK [READ-WRITE] SELECT completed\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("alice", "secret").await.unwrap();
        let (_client, status) = client.select("INBOX").await.unwrap();

        assert_eq!(status.exists, 172);
        assert_eq!(status.uid_validity, Some(3_857_529_045));
    }

    #[tokio::test]
    async fn test_select_missing_mailbox() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A0000 LOGIN alice secret\r\n")
            .read(b"A0000 OK [CAPABILITY IMAP4rev1] Logged in\r\n")
            .write(b"A0001 SELECT Nowhere\r\n")
            .read(b"A0001 NO [NONEXISTENT] Mailbox doesn't exist\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("alice", "secret").await.unwrap();
        let err = client.select("Nowhere").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
    }
}
