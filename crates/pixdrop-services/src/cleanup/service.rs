use chrono::{DateTime, Utc};
use pixdrop_storage::{MetadataError, MetadataStore, Storage, StorageError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("Failed to delete expired file {filename} ({pruned} entries pruned before the failure): {source}")]
    Delete {
        filename: String,
        pruned: usize,
        #[source]
        source: StorageError,
    },
}

/// Counters for one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    /// Files removed from disk
    pub deleted: usize,
    /// Expired entries whose file was already gone
    pub missing: usize,
    pub retained: usize,
}

impl SweepReport {
    pub fn pruned(&self) -> usize {
        self.deleted + self.missing
    }
}

/// Retention sweeper: deletes uploads older than the retention window.
#[derive(Clone)]
pub struct CleanupService {
    storage: Arc<dyn Storage>,
    metadata: Arc<MetadataStore>,
    retention: chrono::Duration,
    period: Duration,
}

impl CleanupService {
    pub fn new(
        storage: Arc<dyn Storage>,
        metadata: Arc<MetadataStore>,
        retention: chrono::Duration,
        period: Duration,
    ) -> Self {
        Self {
            storage,
            metadata,
            retention,
            period,
        }
    }

    /// Start the background sweep. The first run happens immediately.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut cleanup_interval = interval(self.period);

            loop {
                cleanup_interval.tick().await;

                tracing::info!(
                    retention_days = self.retention.num_days(),
                    "Starting scheduled cleanup of expired uploads"
                );

                match self.run_sweep().await {
                    Ok(report) => {
                        tracing::info!(
                            scanned = report.scanned,
                            deleted = report.deleted,
                            missing = report.missing,
                            retained = report.retained,
                            "Cleanup task completed successfully"
                        );
                    }
                    Err(e) => tracing::error!(error = %e, "Cleanup task failed"),
                }
            }
        })
    }

    pub async fn run_sweep(&self) -> Result<SweepReport, SweepError> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep as if the current time were `now`.
    ///
    /// Entries pruned before a delete failure are persisted before the error is returned.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_uploads"))]
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let guard = self.metadata.lock().await;
        let mut index = guard.load().await?;

        let mut report = SweepReport {
            scanned: index.len(),
            ..SweepReport::default()
        };

        let expired: Vec<String> = index
            .iter()
            .filter(|(_, uploaded_at)| now.signed_duration_since(**uploaded_at) > self.retention)
            .map(|(filename, _)| filename.clone())
            .collect();
        report.retained = report.scanned - expired.len();

        let mut failure = None;
        for filename in expired {
            match self.storage.delete(&filename).await {
                Ok(true) => {
                    tracing::info!(filename = %filename, "Deleted expired upload");
                    report.deleted += 1;
                }
                Ok(false) => {
                    tracing::debug!(filename = %filename, "Expired upload already missing from disk");
                    report.missing += 1;
                }
                Err(StorageError::InvalidKey(reason)) => {
                    tracing::warn!(
                        filename = %filename,
                        reason = %reason,
                        "Dropping metadata entry that cannot name a stored file"
                    );
                    report.missing += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, filename = %filename, "Failed to delete expired upload");
                    failure = Some((filename, e));
                    break;
                }
            }
            index.remove(&filename);
        }

        if report.pruned() > 0 {
            guard.save(&index).await?;
        }

        match failure {
            Some((filename, source)) => Err(SweepError::Delete {
                filename,
                pruned: report.pruned(),
                source,
            }),
            None => Ok(report),
        }
    }
}
