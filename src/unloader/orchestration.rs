//! Export orchestration: the top-level lifecycle of a single export.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::{Error, ExportFailure, Result};
use crate::merge::{encode_header, merge_partitions};
use crate::session::Session;
use crate::statement::{UnloadOptions, unload_statement};
use crate::types::{Event, ExportSummary, Stage};

use super::Unloader;
use super::download::download_partitions;

/// What one export has done so far, kept to describe a failure
struct Progress {
    session: Session,
    reached: Stage,
    remote_keys: Vec<String>,
    staging_created: bool,
}

impl Progress {
    fn new(session: Session) -> Self {
        Self {
            session,
            reached: Stage::Init,
            remote_keys: Vec::new(),
            staging_created: false,
        }
    }

    fn into_failure(self, source: Error) -> ExportFailure {
        ExportFailure {
            session_id: self.session.id,
            reached: self.reached,
            failed_step: self.reached.next(),
            remote_prefix: self.session.remote_prefix,
            remote_keys: self.remote_keys,
            staging_dir: self.staging_created.then_some(self.session.staging_dir),
            source: Box::new(source),
        }
    }
}

impl Unloader {
    /// Export the result set of `query` into a single gzip file at `destination`
    ///
    /// Steps, each of which must succeed before the next starts:
    /// 1. Start a session with its own remote prefix and staging directory
    /// 2. Probe the query's column names (only when `with_header`)
    /// 3. Unload the query into the bucket under the session prefix
    /// 4. List the unloaded partitions
    /// 5. Create the staging directory (owner-only)
    /// 6. Download every partition into the staging directory
    /// 7. Write the header member, if any, then every partition in list order
    /// 8. Delete the remote partitions
    /// 9. Remove the staging directory
    ///
    /// On success nothing but `destination` is left behind.
    ///
    /// # Errors
    ///
    /// `Error::Cancelled` if [`Unloader::shutdown`] was called before the export
    /// started. Otherwise any failure is returned as `Error::Export`: nothing is
    /// cleaned up, and the [`ExportFailure`] names the failing step, the remote
    /// prefix and keys, and the staging directory that may remain.
    pub async fn export(
        &self,
        query: &str,
        destination: impl AsRef<Path>,
        with_header: bool,
    ) -> Result<ExportSummary> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let destination = destination.as_ref();
        let started = Instant::now();
        let mut progress = Progress::new(Session::new(
            &self.remote_root,
            &self.settings.staging_root,
        ));

        match self
            .run_export(query, destination, with_header, &mut progress)
            .await
        {
            Ok(mut summary) => {
                summary.elapsed = started.elapsed();
                info!(
                    session_id = %summary.session_id,
                    destination = ?summary.destination,
                    partitions = summary.partitions,
                    bytes_written = summary.bytes_written,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "export completed"
                );
                self.emit(Event::Completed {
                    session_id: summary.session_id,
                    destination: summary.destination.clone(),
                    bytes_written: summary.bytes_written,
                });
                Ok(summary)
            }
            Err(source) => {
                let failure = progress.into_failure(source);
                let remote_objects_may_remain = failure.remote_objects_may_remain();
                error!(
                    session_id = %failure.session_id,
                    stage = %failure.failed_step,
                    reached = %failure.reached,
                    remote_prefix = %failure.remote_prefix,
                    remote_objects_may_remain,
                    staging_dir = ?failure.staging_dir,
                    error = %failure.source,
                    "export failed"
                );
                self.emit(Event::Failed {
                    session_id: failure.session_id,
                    stage: failure.failed_step,
                    error: failure.source.to_string(),
                    remote_objects_may_remain,
                });
                Err(Error::Export(Box::new(failure)))
            }
        }
    }

    async fn run_export(
        &self,
        query: &str,
        destination: &Path,
        with_header: bool,
        progress: &mut Progress,
    ) -> Result<ExportSummary> {
        let session_id = progress.session.id;
        self.advance(progress, Stage::SessionCreated);

        // Probe before anything reaches the bucket
        self.ensure_running()?;
        let columns = if with_header {
            let columns = self.warehouse.probe_columns(query).await?;
            debug!(%session_id, ?columns, "columns resolved");
            Some(columns)
        } else {
            None
        };
        self.advance(progress, Stage::ColumnsResolved);

        self.ensure_running()?;
        let options = UnloadOptions::export_policy();
        let uri = self.storage.uri(&progress.session.remote_prefix);
        debug!(
            %session_id,
            warehouse = self.warehouse.name(),
            statement = %unload_statement(query, &uri, &self.credential.redacted(), &options),
            "executing unload"
        );
        self.warehouse
            .execute(&unload_statement(query, &uri, &self.credential, &options))
            .await?;
        self.advance(progress, Stage::Unloaded);

        self.ensure_running()?;
        progress.remote_keys = self.storage.list(&progress.session.remote_prefix).await?;
        debug!(
            %session_id,
            storage = self.storage.name(),
            partitions = progress.remote_keys.len(),
            "partitions listed"
        );
        self.advance(progress, Stage::Listed);

        self.ensure_running()?;
        let partitions = progress.session.plan_partitions(&progress.remote_keys)?;
        progress.session.create_staging_dir().await?;
        progress.staging_created = true;
        debug!(%session_id, path = ?progress.session.staging_dir, "staging directory created");
        self.advance(progress, Stage::StagingReady);

        self.ensure_running()?;
        let total = partitions.len();
        let mut completed = 0;
        download_partitions(
            self.storage.as_ref(),
            &partitions,
            self.settings.download_concurrency,
            &self.cancel,
            |partition, bytes| {
                completed += 1;
                debug!(
                    %session_id,
                    key = %partition.key,
                    path = ?partition.local_path,
                    bytes,
                    completed,
                    total,
                    "partition downloaded"
                );
                self.emit(Event::PartitionDownloaded {
                    session_id,
                    key: partition.key.clone(),
                    bytes,
                    completed,
                    total,
                });
            },
        )
        .await?;
        self.advance(progress, Stage::Downloaded);

        self.ensure_running()?;
        let header = columns
            .as_deref()
            .map(|columns| encode_header(columns, options.delimiter.unwrap_or(',')))
            .transpose()?;
        let staged: Vec<PathBuf> = partitions.iter().map(|p| p.local_path.clone()).collect();
        let bytes_written = merge_partitions(
            destination,
            header.as_deref(),
            &staged,
            self.settings.copy_buffer_size,
        )
        .await?;
        debug!(%session_id, path = ?destination, bytes_written, "partitions merged");
        self.advance(progress, Stage::Merged);

        self.ensure_running()?;
        self.storage.delete(&progress.remote_keys).await?;
        self.advance(progress, Stage::RemoteCleaned);

        self.ensure_running()?;
        progress.session.remove_staging_dir().await?;
        self.advance(progress, Stage::LocalCleaned);

        self.advance(progress, Stage::Done);

        Ok(ExportSummary {
            session_id,
            destination: destination.to_path_buf(),
            columns,
            partitions: total,
            bytes_written,
            elapsed: Default::default(),
        })
    }

    fn advance(&self, progress: &mut Progress, stage: Stage) {
        progress.reached = stage;
        debug!(session_id = %progress.session.id, %stage, "stage reached");
        self.emit(Event::StageReached {
            session_id: progress.session.id,
            stage,
        });
    }

    fn ensure_running(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
