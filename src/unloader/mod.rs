//! Export orchestration split into focused submodules.
//!
//! The [`Unloader`] owns the collaborators an export needs and drives the
//! pipeline for each [`Unloader::export`] call:
//! - [`orchestration`] - Step sequencing, progress tracking and failure context
//! - [`download`] - Bounded-parallel partition downloads

mod download;
mod orchestration;


use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ExportConfig};
use crate::credential::Credential;
use crate::error::Result;
use crate::storage::{BucketStorage, ObjectStorage};
use crate::types::Event;
use crate::warehouse::{RedshiftClient, Warehouse};

/// Exports query results from the warehouse into single local gzip files
///
/// Cloning is cheap: clones share the clients, the event channel and the
/// shutdown signal. Each [`Unloader::export`] call owns its own session, so
/// concurrent exports never share remote prefixes or staging directories.
#[derive(Clone)]
pub struct Unloader {
    /// Warehouse that runs the probe and the unload
    pub(crate) warehouse: Arc<dyn Warehouse>,
    /// Bucket the warehouse unloads into
    pub(crate) storage: Arc<dyn ObjectStorage>,
    /// Credential embedded in every unload statement
    pub(crate) credential: Arc<Credential>,
    /// Staging and merge settings
    pub(crate) settings: ExportConfig,
    /// Remote root under which each session gets its own prefix
    pub(crate) remote_root: String,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cancelled by [`Unloader::shutdown`]
    pub(crate) cancel: CancellationToken,
}

impl Unloader {
    /// Connect to the configured warehouse and bucket
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is invalid, `Query` or `Permission` if
    /// the warehouse connection cannot be established.
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = BucketStorage::s3(&config.storage, &config.credential)?;
        let warehouse = RedshiftClient::connect(&config.warehouse).await?;

        tracing::info!(
            warehouse = warehouse.name(),
            storage = storage.name(),
            bucket = storage.bucket(),
            "unloader connected"
        );

        Self::with_clients(config, Arc::new(warehouse), Arc::new(storage))
    }

    /// Build an unloader around existing clients
    ///
    /// Only the export settings of `config` are validated. Of the other
    /// sections only `credential` and `storage.remote_root` are used.
    pub fn with_clients(
        config: Config,
        warehouse: Arc<dyn Warehouse>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self> {
        config.export.validate()?;

        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            warehouse,
            storage,
            credential: Arc::new(config.credential),
            settings: config.export,
            remote_root: config.storage.remote_root,
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to export events
    ///
    /// Each subscriber receives every event emitted after it subscribed. A
    /// subscriber that falls more than 1000 events behind gets
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Stop running exports at their next step boundary and refuse new ones
    ///
    /// In-flight downloads are abandoned. Cancelled exports fail with
    /// `Error::Cancelled` as their source and leave their artifacts in place.
    pub fn shutdown(&self) {
        tracing::info!("unloader shutting down");
        self.cancel.cancel();
    }

    /// Whether [`Unloader::shutdown`] has been called
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Close the warehouse connection
    ///
    /// Clones of this unloader keep the clients alive but their exports fail
    /// once the connection is closed.
    pub async fn close(self) -> Result<()> {
        self.warehouse.close().await
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}
