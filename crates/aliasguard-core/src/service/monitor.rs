//! Classify-and-file loop.

use aliasguard_mime::HeaderExtractor;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::transport::MailboxTransport;
use crate::Result;
use crate::allowlist::AllowList;
use crate::decision::{Classification, DecisionEngine};
use crate::validation::{AddressValidator, SyntaxValidator};

/// Folder names classified messages are moved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFolders {
    /// Folder for verified messages.
    pub verified: String,
    /// Folder for everything else.
    pub failed_validation: String,
}

impl TargetFolders {
    /// Folder for a classification.
    #[must_use]
    pub fn for_classification(&self, classification: Classification) -> &str {
        match classification {
            Classification::Verified => &self.verified,
            Classification::FailedValidation => &self.failed_validation,
        }
    }
}

/// Watches a mailbox and files every new message.
pub struct Monitor<T, A, V = SyntaxValidator> {
    transport: T,
    engine: DecisionEngine<A, V>,
    extractor: HeaderExtractor,
    folders: TargetFolders,
}

impl<T, A, V> Monitor<T, A, V>
where
    T: MailboxTransport,
    A: AllowList,
    V: AddressValidator,
{
    /// Creates a monitor.
    #[must_use]
    pub const fn new(
        transport: T,
        engine: DecisionEngine<A, V>,
        extractor: HeaderExtractor,
        folders: TargetFolders,
    ) -> Self {
        Self {
            transport,
            engine,
            extractor,
            folders,
        }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Classifies and files every message currently waiting.
    ///
    /// A message that cannot be fetched or moved is logged and left where
    /// it is; the rest of the batch is still processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the waiting messages cannot be listed.
    pub async fn process_new_messages(&mut self) -> Result<usize> {
        let ids = self.transport.new_message_ids().await?;
        if ids.is_empty() {
            return Ok(0);
        }
        debug!(count = ids.len(), "Processing new messages");

        let mut processed = 0;
        for id in ids {
            let raw = match self.transport.fetch_headers(&id).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    debug!(id = %id, "Message disappeared before it was read");
                    continue;
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to fetch headers");
                    continue;
                }
            };

            let headers = self.extractor.extract(&raw);
            let classification = self.engine.decide(&headers).await;
            let folder = self.folders.for_classification(classification);

            match self.transport.move_message(&id, folder).await {
                Ok(()) => {
                    info!(id = %id, folder, "Message filed");
                    processed += 1;
                }
                Err(e) => error!(id = %id, folder, error = %e, "Failed to move message"),
            }
        }

        Ok(processed)
    }

    /// Processes mail until `shutdown` turns `true` or its sender is dropped,
    /// then closes the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails while listing or waiting.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Monitor started");
        let outcome = self.watch(shutdown).await;

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "Failed to close mailbox session");
        }
        info!("Monitor stopped");
        outcome
    }

    async fn watch(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        while !*shutdown.borrow() {
            self.process_new_messages().await?;

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                waited = self.transport.wait_for_new_mail() => waited?,
            }
        }
        Ok(())
    }
}
