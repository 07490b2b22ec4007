//! Completion pipeline (component E): runs once an upload's final byte
//! lands, verifying integrity, promoting to object storage, and notifying
//! a webhook. Triggered synchronously from the APPEND handler per the
//! Open Question decision recorded in design notes (§9).

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::CallbackConfig;
use crate::error::{TusError, TusResult};
use crate::metadata_store::{FileInfo, MetadataStore};
use crate::objectstore::ObjectStore;
use crate::staging::{self, StagingStore};

/// Runs the three completion steps against a `FileInfo` already transitioned
/// to `completed` by [`MetadataStore::complete_if_uploading`].
pub struct CompletionPipeline {
    metadata: Arc<dyn MetadataStore>,
    staging: Arc<dyn StagingStore>,
    objects: Arc<dyn ObjectStore>,
    callback: CallbackConfig,
    http: reqwest::Client,
}

impl CompletionPipeline {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        staging: Arc<dyn StagingStore>,
        objects: Arc<dyn ObjectStore>,
        callback: CallbackConfig,
    ) -> Self {
        Self {
            metadata,
            staging,
            objects,
            callback,
            http: reqwest::Client::new(),
        }
    }

    /// Runs checksum verification, promotion, and webhook notification for
    /// `uri`. Checksum mismatch and webhook failure are recorded but
    /// non-fatal; a promotion failure marks the upload `failed` (§4.E, §7).
    pub async fn run(&self, uri: &str) -> TusResult<()> {
        let mut info = self
            .metadata
            .find_by_uri(uri)
            .await?
            .ok_or(TusError::NotFound)?;

        let mut file = self.staging.open(uri).await?;
        let bytes = staging::read_all(&mut file).await?;

        if let Some(expected) = info.expected_checksum.clone() {
            info.checksum_verified = verify_checksum(&bytes, &expected);
            if !info.checksum_verified {
                warn!(upload_uri = %uri, "checksum mismatch on completed upload");
            }
        }

        let object_key = format!("{}/{}", info.upload_id(), info.file_name);
        match self.objects.put_object(&object_key, bytes).await {
            Ok(()) => {
                info.object_key = Some(object_key);
                info.status = crate::metadata_store::UploadStatus::Transferred;
            }
            Err(err) => {
                warn!(upload_uri = %uri, error = %err, "promotion to object store failed");
                info.status = crate::metadata_store::UploadStatus::Failed;
                info.updated_at = chrono::Utc::now();
                self.metadata.save(info).await?;
                return Err(err);
            }
        }

        info.updated_at = chrono::Utc::now();
        self.metadata.save(info.clone()).await?;

        if self.callback.enabled {
            self.deliver_webhook(&info).await;
        }

        info!(upload_uri = %uri, "completion pipeline finished");
        Ok(())
    }

    async fn deliver_webhook(&self, info: &FileInfo) {
        let Some(url) = self.callback.url.as_ref() else {
            return;
        };
        let payload = serde_json::json!({
            "uploadURI": info.upload_uri,
            "fileName": info.file_name,
            "totalSize": info.total_size,
            "status": info.status.as_str(),
            "objectKey": info.object_key,
            "checksumVerified": info.checksum_verified,
        });

        let result = self.http.post(url).json(&payload).send().await;
        let sent = match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "webhook responded with failure status");
                false
            }
            Err(err) => {
                warn!(error = %err, "webhook delivery failed");
                false
            }
        };

        if sent {
            let mut updated = info.clone();
            updated.callback_sent = true;
            updated.updated_at = chrono::Utc::now();
            if let Err(err) = self.metadata.save(updated).await {
                warn!(error = %err, "failed to record callback_sent");
            }
        }
    }
}

fn verify_checksum(bytes: &[u8], expected: &str) -> bool {
    let digest = Sha256::digest(bytes);
    hex::encode(digest).eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::InMemoryMetadataStore;
    use crate::objectstore::FilesystemObjectStore;
    use crate::staging::DiskStagingStore;
    use futures_util::stream;
    use tempfile::TempDir;

    async fn setup(checksum: Option<&str>) -> (CompletionPipeline, Arc<InMemoryMetadataStore>, TempDir, TempDir) {
        let staging_dir = TempDir::new().unwrap();
        let object_dir = TempDir::new().unwrap();

        let metadata = Arc::new(InMemoryMetadataStore::new());
        let staging = Arc::new(DiskStagingStore::new(staging_dir.path()));
        let objects = Arc::new(FilesystemObjectStore::new(object_dir.path(), "https://o.example"));

        staging.create("/files/abc").await.unwrap();
        let chunk = Box::pin(stream::iter(vec![Ok(bytes::Bytes::from_static(b"hello"))]));
        staging.append_at("/files/abc", 0, chunk).await.unwrap();

        let mut info = FileInfo::new("/files/abc", "greeting.txt", 5);
        info.offset = 5;
        info.status = crate::metadata_store::UploadStatus::Completed;
        info.expected_checksum = checksum.map(|s| s.to_string());
        metadata.insert(info).await.unwrap();

        let pipeline = CompletionPipeline::new(metadata.clone(), staging, objects, CallbackConfig::default());
        (pipeline, metadata, staging_dir, object_dir)
    }

    #[tokio::test]
    async fn run_promotes_and_marks_transferred() {
        let (pipeline, metadata, _staging_dir, object_dir) = setup(None).await;
        pipeline.run("/files/abc").await.unwrap();

        let info = metadata.find_by_uri("/files/abc").await.unwrap().unwrap();
        assert_eq!(info.status, crate::metadata_store::UploadStatus::Transferred);
        assert_eq!(info.object_key.as_deref(), Some("abc/greeting.txt"));

        let written = tokio::fs::read(object_dir.path().join("abc/greeting.txt"))
            .await
            .unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn run_verifies_correct_checksum() {
        let sha_of_hello = hex::encode(Sha256::digest(b"hello"));
        let (pipeline, metadata, _s, _o) = setup(Some(&sha_of_hello)).await;
        pipeline.run("/files/abc").await.unwrap();

        let info = metadata.find_by_uri("/files/abc").await.unwrap().unwrap();
        assert!(info.checksum_verified);
    }

    #[tokio::test]
    async fn run_flags_checksum_mismatch_without_failing() {
        let (pipeline, metadata, _s, _o) = setup(Some("deadbeef")).await;
        let result = pipeline.run("/files/abc").await;
        assert!(result.is_ok());

        let info = metadata.find_by_uri("/files/abc").await.unwrap().unwrap();
        assert!(!info.checksum_verified);
        assert_eq!(info.status, crate::metadata_store::UploadStatus::Transferred);
    }
}
