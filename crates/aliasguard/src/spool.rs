//! Directory-backed mailbox.
//!
//! Each folder is a directory under the spool root and each message a
//! `*.eml` file in it. An MTA or fetcher drops new mail into the inbox
//! directory; filing a message renames it into the target folder.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use aliasguard_core::{MailboxTransport, TransportError};
use tracing::debug;

const MESSAGE_EXTENSION: &str = "eml";

/// A mailbox living in plain directories, polled at a fixed interval.
#[derive(Debug, Clone)]
pub struct SpoolTransport {
    root: PathBuf,
    inbox: PathBuf,
    poll_interval: Duration,
}

impl SpoolTransport {
    /// Creates a transport reading new mail from `root/mailbox`.
    pub fn new(root: impl Into<PathBuf>, mailbox: &str, poll_interval: Duration) -> Self {
        let root = root.into();
        let inbox = root.join(mailbox);
        Self {
            root,
            inbox,
            poll_interval,
        }
    }

    fn folder_path(&self, folder: &str) -> Result<PathBuf, TransportError> {
        let relative = Path::new(folder);
        let nested_only = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if folder.is_empty() || !nested_only {
            return Err(TransportError::Operation(format!(
                "Invalid folder name: {folder:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl MailboxTransport for SpoolTransport {
    async fn wait_for_new_mail(&mut self) -> Result<(), TransportError> {
        tokio::time::sleep(self.poll_interval).await;
        Ok(())
    }

    async fn new_message_ids(&mut self) -> Result<Vec<String>, TransportError> {
        tokio::fs::create_dir_all(&self.inbox).await?;

        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.inbox).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_message = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(MESSAGE_EXTENSION));
            if !is_message || !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                ids.push(name.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn fetch_headers(&mut self, id: &str) -> Result<Option<String>, TransportError> {
        match tokio::fs::read(self.inbox.join(id)).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn move_message(&mut self, id: &str, folder: &str) -> Result<(), TransportError> {
        let target = self.folder_path(folder)?;
        tokio::fs::create_dir_all(&target).await?;
        tokio::fs::rename(self.inbox.join(id), target.join(id)).await?;
        debug!(id, folder, "Moved message");
        Ok(())
    }
}
