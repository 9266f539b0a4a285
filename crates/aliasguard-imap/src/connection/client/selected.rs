//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Selected;
use crate::command::Command;
use crate::connection::idle::{IdleEvent, IdleHandle};
use crate::response::{Response, ResponseParser, Untagged};
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Runs `UID SEARCH` and returns the matching UIDs.
    pub async fn uid_search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        let completed = self
            .run(&Command::UidSearch {
                criteria: criteria.to_string(),
            })
            .await?;

        Ok(completed
            .untagged
            .into_iter()
            .filter_map(|untagged| match untagged {
                Untagged::Search(uids) => Some(uids),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Fetches the named header fields of one message without marking it
    /// seen.
    ///
    /// Returns `None` if the server sent no FETCH data for `uid`, which
    /// happens when the message was expunged in the meantime.
    pub async fn uid_fetch_header_fields(
        &mut self,
        uid: u32,
        fields: &[&str],
    ) -> Result<Option<Vec<u8>>> {
        let completed = self
            .run(&Command::UidFetchHeaderFields {
                uid,
                fields: fields.iter().map(ToString::to_string).collect(),
            })
            .await?;

        Ok(completed.untagged.into_iter().find_map(|untagged| match untagged {
            Untagged::Fetch(data) if data.uid == Some(uid) => Some(data.body.unwrap_or_default()),
            _ => None,
        }))
    }

    /// Moves a message with `UID MOVE`. Requires the MOVE capability.
    pub async fn uid_move(&mut self, uid: u32, mailbox: &str) -> Result<()> {
        let command = Command::UidMove {
            uid,
            mailbox: mailbox.to_string(),
        };
        self.run(&command).await.map(drop)
    }

    /// Copies a message with `UID COPY`.
    pub async fn uid_copy(&mut self, uid: u32, mailbox: &str) -> Result<()> {
        let command = Command::UidCopy {
            uid,
            mailbox: mailbox.to_string(),
        };
        self.run(&command).await.map(drop)
    }

    /// Flags a message `\Deleted`.
    pub async fn uid_store_deleted(&mut self, uid: u32) -> Result<()> {
        self.run(&Command::UidStoreDeleted { uid }).await.map(drop)
    }

    /// Expunges one `\Deleted` message. Requires UIDPLUS.
    pub async fn uid_expunge(&mut self, uid: u32) -> Result<()> {
        self.run(&Command::UidExpunge { uid }).await.map(drop)
    }

    /// Expunges every `\Deleted` message in the mailbox.
    pub async fn expunge(&mut self) -> Result<()> {
        self.run(&Command::Expunge).await.map(drop)
    }

    /// Creates a mailbox.
    pub async fn create(&mut self, mailbox: &str) -> Result<()> {
        let command = Command::Create {
            mailbox: mailbox.to_string(),
        };
        self.run(&command).await.map(drop)
    }

    /// Enters IDLE.
    ///
    /// Waits for the server's continuation. Mailbox updates sent before it
    /// are handed out by the first [`IdleHandle::wait`].
    pub async fn idle(&mut self) -> Result<IdleHandle<'_, S>> {
        let tag = self.send(&Command::Idle).await?;

        let mut pending = None;
        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw)? {
                Response::Continuation(_) => break,
                Response::Untagged(untagged) => {
                    if pending.is_none() {
                        pending = IdleEvent::from_untagged(untagged)?;
                    }
                }
                Response::Tagged { tag: done, status, text } if done == tag => {
                    super::check_status(status, text)?;
                    return Err(Error::Protocol("IDLE completed without continuation".to_string()));
                }
                Response::Tagged { tag: other, .. } => {
                    return Err(Error::Protocol(format!("unexpected tag {other} before IDLE")));
                }
            }
        }

        self.idle_tag = Some(tag.clone());
        Ok(IdleHandle::new(self, tag, pending))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::{Builder, Mock};

    use super::*;

    /// Script prefix: greeting, LOGIN (A0000) and SELECT INBOX (A0001).
    fn session(builder: &mut Builder) -> &mut Builder {
        builder
            .read(b"* OK [CAPABILITY IMAP4rev1 IDLE MOVE UIDPLUS] ready\r\n")
            .write(b"A0000 LOGIN alice secret\r\n")
            .read(b"A0000 OK Logged in\r\n")
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 IDLE MOVE UIDPLUS\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 SELECT INBOX\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"A0002 OK [READ-WRITE] selected\r\n")
    }

    async fn selected(mock: Mock) -> Client<Mock, Selected> {
        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("alice", "secret").await.unwrap();
        client.select("INBOX").await.unwrap().0
    }

    #[tokio::test]
    async fn test_uid_search() {
        let mock = session(&mut Builder::new())
            .write(b"A0003 UID SEARCH UNSEEN\r\n")
            .read(b"* SEARCH 17 23\r\n")
            .read(b"A0003 OK SEARCH completed\r\n")
            .build();

        let mut client = selected(mock).await;
        assert_eq!(client.uid_search("UNSEEN").await.unwrap(), [17, 23]);
    }

    #[tokio::test]
    async fn test_uid_fetch_header_fields() {
        let mock = session(&mut Builder::new())
            .write(b"A0003 UID FETCH 17 (UID BODY.PEEK[HEADER.FIELDS (From To)])\r\n")
            .read(b"* 2 FETCH (UID 17 BODY[HEADER.FIELDS (FROM TO)] {36}\r\n")
            .read(b"From: a@shop.example\r\nTo: b@x.io\r\n\r\n")
            .read(b")\r\n")
            .read(b"A0003 OK FETCH completed\r\n")
            .build();

        let mut client = selected(mock).await;
        let header = client
            .uid_fetch_header_fields(17, &["From", "To"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(header, b"From: a@shop.example\r\nTo: b@x.io\r\n\r\n");
    }

    #[tokio::test]
    async fn test_uid_fetch_of_vanished_message() {
        let mock = session(&mut Builder::new())
            .write(b"A0003 UID FETCH 99 (UID BODY.PEEK[HEADER.FIELDS (From)])\r\n")
            .read(b"A0003 OK FETCH completed\r\n")
            .build();

        let mut client = selected(mock).await;
        assert_eq!(client.uid_fetch_header_fields(99, &["From"]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_move_and_copy_fallback() {
        let mock = session(&mut Builder::new())
            .write(b"A0003 UID MOVE 17 \"Failed Validation\"\r\n")
            .read(b"A0003 NO [TRYCREATE] Mailbox doesn't exist\r\n")
            .write(b"A0004 CREATE \"Failed Validation\"\r\n")
            .read(b"A0004 OK created\r\n")
            .write(b"A0005 UID COPY 17 \"Failed Validation\"\r\n")
            .read(b"A0005 OK copied\r\n")
            .write(b"A0006 UID STORE 17 +FLAGS.SILENT (\\Deleted)\r\n")
            .read(b"A0006 OK stored\r\n")
            .write(b"A0007 UID EXPUNGE 17\r\n")
            .read(b"* 2 EXPUNGE\r\n")
            .read(b"A0007 OK expunged\r\n")
            .write(b"A0008 EXPUNGE\r\n")
            .read(b"A0008 OK expunged\r\n")
            .build();

        let mut client = selected(mock).await;
        let err = client.uid_move(17, "Failed Validation").await.unwrap_err();
        assert!(err.is_try_create());
        client.create("Failed Validation").await.unwrap();
        client.uid_copy(17, "Failed Validation").await.unwrap();
        client.uid_store_deleted(17).await.unwrap();
        client.uid_expunge(17).await.unwrap();
        client.expunge().await.unwrap();
    }

    #[tokio::test]
    async fn test_logout() {
        let mock = session(&mut Builder::new())
            .write(b"A0003 LOGOUT\r\n")
            .read(b"* BYE Logging out\r\n")
            .read(b"A0003 OK Logout completed\r\n")
            .build();

        let client = selected(mock).await;
        client.logout().await.unwrap();
    }
}
