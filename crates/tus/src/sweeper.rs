//! Expiration sweeper (component F): a periodic background task that
//! reclaims staging bytes and metadata rows for sessions nobody finished
//! uploading.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::TusResult;
use crate::metadata_store::MetadataStore;
use crate::staging::StagingStore;

/// Runs [`Sweeper::sweep_once`] on an interval for as long as the returned
/// task is not aborted. Races with concurrent APPENDs are tolerated: a
/// session whose `updated_at` advances after this sweep read it fails the
/// conditional delete and is picked up (or not) by the next cycle, per §4.F.
pub(crate) struct Sweeper {
    metadata: Arc<dyn MetadataStore>,
    staging: Arc<dyn StagingStore>,
    timeout: Duration,
    interval: Duration,
}

impl Sweeper {
    pub(crate) fn new(
        metadata: Arc<dyn MetadataStore>,
        staging: Arc<dyn StagingStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            metadata,
            staging,
            timeout: config.expiration_timeout(),
            interval: config.expiration_interval(),
        }
    }

    /// Spawns the periodic sweep as a background task.
    pub(crate) fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep_once().await {
                    warn!(error = %err, "expiration sweep failed");
                }
            }
        })
    }

    /// Deletes every `uploading` session whose `updated_at` is older than
    /// the configured timeout, along with its staging bytes. A row touched
    /// by a concurrent APPEND since the staleness query is left alone.
    /// Returns the count of sessions actually swept.
    pub(crate) async fn sweep_once(&self) -> TusResult<usize> {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.timeout).unwrap_or_default();
        let stale = self.metadata.find_stale_uploading(cutoff).await?;

        let mut swept = 0;
        for info in stale {
            if let Err(err) = self.staging.delete(&info.upload_uri).await {
                warn!(upload_uri = %info.upload_uri, error = %err, "failed to delete stale staging bytes");
            }
            let deleted = self
                .metadata
                .delete_if_unchanged(&info.upload_uri, info.updated_at)
                .await?;
            if !deleted {
                continue;
            }
            swept += 1;
        }

        if swept > 0 {
            info!(swept, "expiration sweep completed");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::{FileInfo, InMemoryMetadataStore};
    use crate::staging::DiskStagingStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sweep_once_deletes_stale_uploading_sessions() {
        let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let dir = TempDir::new().unwrap();
        let staging: Arc<dyn StagingStore> = Arc::new(DiskStagingStore::new(dir.path()));

        let mut stale = FileInfo::new("/files/stale", "s.txt", 5);
        stale.updated_at = Utc::now() - chrono::Duration::hours(48);
        metadata.insert(stale).await.unwrap();
        staging.create("/files/stale").await.unwrap();

        let fresh = FileInfo::new("/files/fresh", "f.txt", 5);
        metadata.insert(fresh).await.unwrap();
        staging.create("/files/fresh").await.unwrap();

        let mut config = EngineConfig::default();
        config.expiration_timeout_secs = 24 * 60 * 60;
        let sweeper = Sweeper::new(metadata.clone(), staging.clone(), &config);

        let swept = sweeper.sweep_once().await.unwrap();
        assert_eq!(swept, 1);

        assert!(metadata.find_by_uri("/files/stale").await.unwrap().is_none());
        assert!(staging.length("/files/stale").await.is_err());

        assert!(metadata.find_by_uri("/files/fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_once_is_noop_when_nothing_stale() {
        let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let dir = TempDir::new().unwrap();
        let staging: Arc<dyn StagingStore> = Arc::new(DiskStagingStore::new(dir.path()));
        let config = EngineConfig::default();
        let sweeper = Sweeper::new(metadata, staging, &config);

        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_once_skips_row_touched_after_query() {
        let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let dir = TempDir::new().unwrap();
        let staging: Arc<dyn StagingStore> = Arc::new(DiskStagingStore::new(dir.path()));

        let mut stale = FileInfo::new("/files/raced", "r.txt", 5);
        stale.updated_at = Utc::now() - chrono::Duration::hours(48);
        metadata.insert(stale.clone()).await.unwrap();
        staging.create("/files/raced").await.unwrap();

        // Simulate a concurrent APPEND advancing updated_at between the
        // staleness query and the delete attempt.
        stale.offset = 1;
        stale.updated_at = Utc::now();
        metadata.save(stale).await.unwrap();

        let mut config = EngineConfig::default();
        config.expiration_timeout_secs = 24 * 60 * 60;
        let sweeper = Sweeper::new(metadata.clone(), staging, &config);
        let swept = sweeper.sweep_once().await.unwrap();

        assert_eq!(swept, 0);
        assert!(metadata.find_by_uri("/files/raced").await.unwrap().is_some());
    }
}
