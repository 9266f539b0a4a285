//! IMAP mailbox backend.
//!
//! New mail is found with `UID SEARCH UNSEEN`, read with a header-only
//! `BODY.PEEK` so it stays unread, and filed with `UID MOVE`. Between
//! rounds the session sits in IDLE, or polls with NOOP on servers without
//! it.

use std::time::Duration;

use aliasguard_core::config::{ImapConfig, ImapSecurity};
use aliasguard_core::{MailboxTransport, TransportError};
use aliasguard_imap::{Client, IdleEvent, ImapStream, Selected, connect_plain, connect_tls};
use tracing::{debug, info, warn};

/// Header fields fetched for each message. The decision reads no others.
const HEADER_FIELDS: [&str; 7] = [
    "Authentication-Results",
    "Received",
    "From",
    "To",
    "Cc",
    "Bcc",
    "Date",
];

/// Longest pause between NOOP polls when the server has no IDLE.
const POLL_INTERVAL: Duration = Duration::from_secs(60);

type Session = Client<ImapStream, Selected>;

/// A mailbox on an IMAP server. Message ids are UIDs.
///
/// The session is opened on first use. When the connection drops it is
/// discarded and the next operation logs in again.
#[derive(Debug)]
pub struct ImapTransport {
    config: ImapConfig,
    session: Option<Session>,
}

impl ImapTransport {
    /// Creates a transport; nothing is connected until first use.
    pub const fn new(config: ImapConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    async fn connect(&self) -> Result<Session, TransportError> {
        let ImapConfig {
            host,
            port,
            username,
            mailbox,
            ..
        } = &self.config;

        let stream = match self.config.security {
            ImapSecurity::Tls => connect_tls(host, *port).await,
            ImapSecurity::Plain => connect_plain(host, *port).await,
        }
        .map_err(|e| TransportError::Connection(format!("Cannot reach {host}:{port}: {e}")))?;

        let client = Client::from_stream(stream).await.map_err(|e| {
            TransportError::Connection(format!("{host}:{port} refused the session: {e}"))
        })?;
        let client = client
            .login(username, &self.config.password)
            .await
            .map_err(|e| TransportError::Connection(format!("Login as {username} failed: {e}")))?;
        let (client, status) = client
            .select(mailbox)
            .await
            .map_err(|e| TransportError::Connection(format!("Cannot select {mailbox}: {e}")))?;

        info!(
            host = %host,
            mailbox = %mailbox,
            messages = status.exists,
            uid_validity = ?status.uid_validity,
            idle = client.supports_idle(),
            "Connected to IMAP server"
        );
        Ok(client)
    }

    async fn session(&mut self) -> Result<&mut Session, TransportError> {
        match self.session {
            Some(ref mut session) => Ok(session),
            None => {
                let session = self.connect().await?;
                Ok(self.session.insert(session))
            }
        }
    }

    /// Wraps a failed command, dropping the session if it is unusable.
    fn fail(&mut self, operation: &str, error: &aliasguard_imap::Error) -> TransportError {
        if error.is_connection_lost() {
            warn!(operation, error = %error, "IMAP connection lost");
            self.session = None;
        }
        TransportError::Operation(format!("{operation} failed: {error}"))
    }
}

impl MailboxTransport for ImapTransport {
    async fn wait_for_new_mail(&mut self) -> Result<(), TransportError> {
        let idle_timeout = self.config.idle_timeout();
        let session = self.session().await?;

        let (operation, result) = if session.supports_idle() {
            let result = idle_once(session, idle_timeout).await;
            if let Ok(event) = &result {
                debug!(?event, "IDLE ended");
            }
            ("IDLE", result.map(drop))
        } else {
            tokio::time::sleep(idle_timeout.min(POLL_INTERVAL)).await;
            ("NOOP", session.noop().await)
        };

        match result {
            Ok(()) => Ok(()),
            // A dropped connection is a wake-up; the next listing reconnects.
            Err(e) if e.is_connection_lost() => {
                self.fail(operation, &e);
                Ok(())
            }
            Err(e) => Err(self.fail(operation, &e)),
        }
    }

    async fn new_message_ids(&mut self) -> Result<Vec<String>, TransportError> {
        let result = self.session().await?.uid_search("UNSEEN").await;
        let uids = result.map_err(|e| self.fail("UID SEARCH", &e))?;
        Ok(uids.iter().map(u32::to_string).collect())
    }

    async fn fetch_headers(&mut self, id: &str) -> Result<Option<String>, TransportError> {
        let uid = parse_uid(id)?;
        let result = self
            .session()
            .await?
            .uid_fetch_header_fields(uid, &HEADER_FIELDS)
            .await;
        let header = result.map_err(|e| self.fail("UID FETCH", &e))?;
        Ok(header.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn move_message(&mut self, id: &str, folder: &str) -> Result<(), TransportError> {
        let uid = parse_uid(id)?;
        let result = file_message(self.session().await?, uid, folder).await;
        result.map_err(|e| self.fail("Filing", &e))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(session) = self.session.take() {
            session
                .logout()
                .await
                .map_err(|e| TransportError::Operation(format!("LOGOUT failed: {e}")))?;
            info!("Logged out of IMAP server");
        }
        Ok(())
    }
}

async fn idle_once(session: &mut Session, timeout: Duration) -> aliasguard_imap::Result<IdleEvent> {
    let mut idle = session.idle().await?;
    let event = idle.wait(timeout).await?;
    idle.done().await?;
    Ok(event)
}

/// Moves one message, creating the folder when the server asks for it.
async fn file_message(session: &mut Session, uid: u32, folder: &str) -> aliasguard_imap::Result<()> {
    match transfer(session, uid, folder).await {
        Err(e) if e.is_try_create() => {
            info!(folder, "Creating folder");
            session.create(folder).await?;
            transfer(session, uid, folder).await
        }
        other => other,
    }
}

/// `UID MOVE`, or COPY + `\Deleted` + EXPUNGE on servers without MOVE.
async fn transfer(session: &mut Session, uid: u32, folder: &str) -> aliasguard_imap::Result<()> {
    if session.supports_move() {
        return session.uid_move(uid, folder).await;
    }

    session.uid_copy(uid, folder).await?;
    session.uid_store_deleted(uid).await?;
    if session.supports_uidplus() {
        session.uid_expunge(uid).await
    } else {
        session.expunge().await
    }
}

fn parse_uid(id: &str) -> Result<u32, TransportError> {
    id.parse()
        .map_err(|_| TransportError::Operation(format!("Invalid message UID: {id:?}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    const ALL_CAPS: &str = "IMAP4rev1 IDLE MOVE UIDPLUS";

    fn config(port: u16, idle_timeout_secs: u64) -> ImapConfig {
        ImapConfig {
            host: "127.0.0.1".to_string(),
            port,
            security: ImapSecurity::Plain,
            username: "alice".to_string(),
            password: "secret".to_string(),
            mailbox: "INBOX".to_string(),
            idle_timeout_secs,
        }
    }

    /// Plays the server side of one connection.
    ///
    /// Each step is the expected command (without its tag) and the reply,
    /// with `{tag}` standing for the command's tag and `{caps}` for the
    /// advertised capabilities. DONE carries no tag and is answered with
    /// the IDLE tag.
    async fn scripted_server(
        capabilities: &'static str,
        script: Vec<(&'static str, &'static str)>,
    ) -> (u16, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();

            let greeting = format!("* OK [CAPABILITY {capabilities}] ready\r\n");
            write.write_all(greeting.as_bytes()).await.unwrap();

            let mut last_tag = String::new();
            for (expected, reply) in script {
                let line = lines.next_line().await.unwrap().unwrap();
                let (tag, command) = match line.split_once(' ') {
                    Some((tag, command)) => (tag.to_string(), command.to_string()),
                    None => (last_tag.clone(), line.clone()),
                };
                assert_eq!(command, expected);
                write
                    .write_all(
                        reply
                            .replace("{tag}", &tag)
                            .replace("{caps}", capabilities)
                            .as_bytes(),
                    )
                    .await
                    .unwrap();
                last_tag = tag;
            }
        });

        (port, server)
    }

    fn login_steps() -> Vec<(&'static str, &'static str)> {
        vec![
            (
                "LOGIN alice secret",
                "{tag} OK [CAPABILITY {caps}] Logged in\r\n",
            ),
            (
                "SELECT INBOX",
                "* 2 EXISTS\r\n* OK [UIDVALIDITY 1] ok\r\n{tag} OK [READ-WRITE] selected\r\n",
            ),
        ]
    }

    #[tokio::test]
    async fn test_session_round() {
        let mut script = login_steps();
        script.extend([
            ("UID SEARCH UNSEEN", "* SEARCH 7 9\r\n{tag} OK done\r\n"),
            (
                "UID FETCH 7 (UID BODY.PEEK[HEADER.FIELDS (Authentication-Results Received From To Cc Bcc Date)])",
                "* 1 FETCH (UID 7 BODY[HEADER.FIELDS (FROM)] {24}\r\nFrom: a@shop.example\r\n\r\n)\r\n{tag} OK done\r\n",
            ),
            (
                "UID MOVE 7 Verified",
                "{tag} NO [TRYCREATE] Mailbox doesn't exist\r\n",
            ),
            ("CREATE Verified", "{tag} OK created\r\n"),
            ("UID MOVE 7 Verified", "{tag} OK moved\r\n"),
            ("IDLE", "+ idling\r\n* 3 EXISTS\r\n"),
            ("DONE", "{tag} OK IDLE terminated\r\n"),
            ("LOGOUT", "* BYE logging out\r\n{tag} OK done\r\n"),
        ]);
        let (port, server) = scripted_server(ALL_CAPS, script).await;
        let mut transport = ImapTransport::new(config(port, 300));

        assert_eq!(transport.new_message_ids().await.unwrap(), ["7", "9"]);
        assert_eq!(
            transport.fetch_headers("7").await.unwrap().unwrap(),
            "From: a@shop.example\r\n\r\n"
        );
        transport.move_message("7", "Verified").await.unwrap();
        transport.wait_for_new_mail().await.unwrap();
        transport.close().await.unwrap();

        assert!(transport.session.is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_without_move_or_idle() {
        let mut script = login_steps();
        script.extend([
            ("UID COPY 9 \"Failed Validation\"", "{tag} OK copied\r\n"),
            (
                "UID STORE 9 +FLAGS.SILENT (\\Deleted)",
                "{tag} OK stored\r\n",
            ),
            ("UID EXPUNGE 9", "* 2 EXPUNGE\r\n{tag} OK expunged\r\n"),
            ("NOOP", "* 3 EXISTS\r\n{tag} OK done\r\n"),
        ]);
        let (port, server) = scripted_server("IMAP4rev1 UIDPLUS", script).await;
        let mut transport = ImapTransport::new(config(port, 1));

        transport
            .move_message("9", "Failed Validation")
            .await
            .unwrap();
        transport.wait_for_new_mail().await.unwrap();

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_connection_is_discarded() {
        let mut script = login_steps();
        script.push(("UID SEARCH UNSEEN", "* SEARCH 4\r\n{tag} OK done\r\n"));
        let (port, server) = scripted_server(ALL_CAPS, script).await;
        let mut transport = ImapTransport::new(config(port, 300));

        assert_eq!(transport.new_message_ids().await.unwrap(), ["4"]);
        server.await.unwrap();

        let err = transport.fetch_headers("4").await.unwrap_err();
        assert!(matches!(err, TransportError::Operation(_)));
        assert!(transport.session.is_none());

        // The listener is gone, so logging in again fails.
        let err = transport.new_message_ids().await.unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }

    #[tokio::test]
    async fn test_idle_on_dropped_connection_is_a_wake_up() {
        let (port, server) = scripted_server(ALL_CAPS, login_steps()).await;
        let mut transport = ImapTransport::new(config(port, 300));

        transport.session().await.unwrap();
        server.await.unwrap();

        transport.wait_for_new_mail().await.unwrap();
        assert!(transport.session.is_none());
    }

    #[tokio::test]
    async fn test_rejected_login_is_a_connection_error() {
        let script = vec![(
            "LOGIN alice secret",
            "{tag} NO [AUTHENTICATIONFAILED] Authentication failed.\r\n",
        )];
        let (port, server) = scripted_server(ALL_CAPS, script).await;
        let mut transport = ImapTransport::new(config(port, 300));

        let err = transport.new_message_ids().await.unwrap_err();
        let TransportError::Connection(message) = err else {
            panic!("expected a connection error");
        };
        assert!(message.contains("Login as alice failed"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = ImapTransport::new(config(port, 300));
        let err = transport.new_message_ids().await.unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_rejected_without_connecting() {
        let mut transport = ImapTransport::new(config(1, 300));
        let err = transport.move_message("inbox/1.eml", "Verified").await.unwrap_err();
        assert!(matches!(err, TransportError::Operation(_)));
        assert!(transport.session.is_none());
    }
}
