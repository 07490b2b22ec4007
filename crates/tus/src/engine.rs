//! Coordinates components A-F behind the five TUS verbs (§4). Handlers stay
//! thin HTTP adapters; all protocol and concurrency logic lives here so it
//! can be unit-tested without spinning up a router.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{ProtocolError, TusError, TusResult};
use crate::locker::Locker;
use crate::metadata_store::{FileInfo, MetadataStore, UploadStatus};
use crate::pipeline::CompletionPipeline;
use crate::staging::{self, ByteStream, StagingStore};

/// Everything a CREATE call needs beyond size: the optional filename and
/// client-declared checksum parsed from `Upload-Metadata` (§4.D, §6).
#[derive(Clone, Debug, Default)]
pub struct CreateRequest {
    pub total_size: u64,
    pub file_name: Option<String>,
    pub expected_checksum: Option<String>,
}

/// The shared engine backing a mounted TUS endpoint (components A-F wired
/// together). Cheaply `Clone`-able; every field is an `Arc`.
#[derive(Clone)]
pub struct TusEngine {
    config: EngineConfig,
    metadata: Arc<dyn MetadataStore>,
    staging: Arc<dyn StagingStore>,
    locker: Arc<dyn Locker>,
    pipeline: Arc<CompletionPipeline>,
}

impl TusEngine {
    pub fn new(
        config: EngineConfig,
        metadata: Arc<dyn MetadataStore>,
        staging: Arc<dyn StagingStore>,
        locker: Arc<dyn Locker>,
        pipeline: CompletionPipeline,
    ) -> Self {
        Self {
            config,
            metadata,
            staging,
            locker,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// CREATE (§4.B): validates size and extension, mints a new
    /// `/files/<id>` URI, and reserves both the metadata row and staging
    /// file. Returns the created `FileInfo`.
    pub async fn create(&self, req: CreateRequest) -> TusResult<FileInfo> {
        if req.total_size > self.config.max_upload_size {
            return Err(TusError::PayloadTooLarge);
        }
        if let Some(name) = req.file_name.as_deref() {
            if !self.config.extension_allowed(name) {
                return Err(TusError::Protocol(ProtocolError::ExtensionRejected(
                    name.to_string(),
                )));
            }
        }

        let id = Uuid::new_v4().simple().to_string();
        let uri = format!("/files/{id}");

        self.staging.create(&uri).await?;

        let mut info = FileInfo::new(&uri, req.file_name.unwrap_or_default(), req.total_size);
        info.expected_checksum = req.expected_checksum;
        if let Err(err) = self.metadata.insert(info.clone()).await {
            if let Err(cleanup_err) = self.staging.delete(&uri).await {
                tracing::warn!(
                    upload_uri = %uri,
                    error = %cleanup_err,
                    "failed to roll back staging file after metadata insert failure"
                );
            }
            return Err(err);
        }

        Ok(info)
    }

    /// HEAD (§4.C): current offset and status for `uri`.
    pub async fn inspect(&self, uri: &str) -> TusResult<FileInfo> {
        self.metadata.find_by_uri(uri).await?.ok_or(TusError::NotFound)
    }

    /// PATCH (§4.D): appends `body` at `client_offset`, enforcing the
    /// declared total size, and triggers the completion pipeline
    /// synchronously the instant the upload reaches `total_size` (§5, §9).
    pub async fn append(
        &self,
        uri: &str,
        client_offset: u64,
        body: ByteStream,
    ) -> TusResult<FileInfo> {
        let _guard = self.locker.write_lock(uri).await?;

        let info = self.metadata.find_by_uri(uri).await?.ok_or(TusError::NotFound)?;
        if info.status != UploadStatus::Uploading {
            return Err(TusError::FileNoLongerExists);
        }
        if info.offset != client_offset {
            return Err(TusError::OffsetMismatch {
                expected: info.offset,
                got: client_offset,
            });
        }

        let remaining = info.total_size - info.offset;
        let limited = staging::limit_bytes(body, remaining);
        let written = self.staging.append_at(uri, info.offset, limited).await?;

        let mut updated = info.clone();
        updated.offset += written;
        updated.updated_at = chrono::Utc::now();
        self.metadata.save(updated.clone()).await?;

        if updated.offset == updated.total_size {
            let became_completed = self
                .metadata
                .complete_if_uploading(uri, updated.offset)
                .await?;
            if became_completed {
                if let Err(err) = self.pipeline.run(uri).await {
                    tracing::warn!(upload_uri = %uri, error = %err, "completion pipeline failed");
                }
            }
        }

        self.metadata.find_by_uri(uri).await?.ok_or(TusError::NotFound)
    }

    /// DELETE (§4.F's on-demand counterpart): removes the staging bytes and
    /// metadata row outright, regardless of lifecycle status.
    pub async fn terminate(&self, uri: &str) -> TusResult<()> {
        let _guard = self.locker.write_lock(uri).await?;
        self.metadata.find_by_uri(uri).await?.ok_or(TusError::NotFound)?;
        self.staging.delete(uri).await?;
        self.metadata.delete(uri).await?;
        Ok(())
    }

    /// Progress listing for the `/api/progress` surface (§4's management
    /// API): every known upload's offset/percent/status.
    pub async fn progress_list(&self) -> TusResult<Vec<FileInfo>> {
        self.metadata.find_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CallbackConfig;
    use crate::locker::MemoryLocker;
    use crate::metadata_store::InMemoryMetadataStore;
    use crate::objectstore::FilesystemObjectStore;
    use crate::staging::DiskStagingStore;
    use bytes::Bytes;
    use futures_util::stream;
    use tempfile::TempDir;

    fn chunk(bytes: &'static [u8]) -> ByteStream {
        Box::pin(stream::iter(vec![Ok(Bytes::from_static(bytes))]))
    }

    async fn make_engine() -> (TusEngine, TempDir, TempDir) {
        let staging_dir = TempDir::new().unwrap();
        let object_dir = TempDir::new().unwrap();

        let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let staging: Arc<dyn StagingStore> = Arc::new(DiskStagingStore::new(staging_dir.path()));
        let locker: Arc<dyn Locker> = Arc::new(MemoryLocker::new());
        let objects = Arc::new(FilesystemObjectStore::new(object_dir.path(), "https://o.example"));
        let pipeline = CompletionPipeline::new(
            metadata.clone(),
            staging.clone(),
            objects,
            CallbackConfig::default(),
        );

        let engine = TusEngine::new(EngineConfig::default(), metadata, staging, locker, pipeline);
        (engine, staging_dir, object_dir)
    }

    #[tokio::test]
    async fn create_reserves_row_and_staging_file() {
        let (engine, _s, _o) = make_engine().await;
        let info = engine
            .create(CreateRequest {
                total_size: 5,
                file_name: Some("greeting.txt".to_string()),
                expected_checksum: None,
            })
            .await
            .unwrap();

        assert_eq!(info.offset, 0);
        assert_eq!(info.status, UploadStatus::Uploading);
        assert!(info.upload_uri.starts_with("/files/"));

        let fetched = engine.inspect(&info.upload_uri).await.unwrap();
        assert_eq!(fetched.upload_uri, info.upload_uri);
    }

    #[tokio::test]
    async fn create_rejects_oversized_upload() {
        let (engine, _s, _o) = make_engine().await;
        let err = engine
            .create(CreateRequest {
                total_size: EngineConfig::default().max_upload_size + 1,
                file_name: None,
                expected_checksum: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TusError::PayloadTooLarge));
    }

    #[tokio::test]
    async fn create_rejects_disallowed_extension() {
        let staging_dir = TempDir::new().unwrap();
        let object_dir = TempDir::new().unwrap();
        let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let staging: Arc<dyn StagingStore> = Arc::new(DiskStagingStore::new(staging_dir.path()));
        let locker: Arc<dyn Locker> = Arc::new(MemoryLocker::new());
        let objects = Arc::new(FilesystemObjectStore::new(object_dir.path(), "https://o.example"));
        let pipeline = CompletionPipeline::new(
            metadata.clone(),
            staging.clone(),
            objects,
            CallbackConfig::default(),
        );
        let mut config = EngineConfig::default();
        config.allowed_extensions = vec![".pdf".to_string()];
        let engine = TusEngine::new(config, metadata, staging, locker, pipeline);

        let err = engine
            .create(CreateRequest {
                total_size: 5,
                file_name: Some("picture.png".to_string()),
                expected_checksum: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TusError::Protocol(crate::error::ProtocolError::ExtensionRejected(_))
        ));
    }

    #[tokio::test]
    async fn append_advances_offset_and_completes_on_final_chunk() {
        let (engine, _s, _o) = make_engine().await;
        let info = engine
            .create(CreateRequest {
                total_size: 5,
                file_name: Some("greeting.txt".to_string()),
                expected_checksum: None,
            })
            .await
            .unwrap();

        let after = engine.append(&info.upload_uri, 0, chunk(b"hello")).await.unwrap();
        assert_eq!(after.offset, 5);
        assert_eq!(after.status, UploadStatus::Transferred);
    }

    #[tokio::test]
    async fn append_rejects_mismatched_offset() {
        let (engine, _s, _o) = make_engine().await;
        let info = engine
            .create(CreateRequest {
                total_size: 5,
                file_name: None,
                expected_checksum: None,
            })
            .await
            .unwrap();

        let err = engine
            .append(&info.upload_uri, 3, chunk(b"hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, TusError::OffsetMismatch { expected: 0, got: 3 }));
    }

    #[tokio::test]
    async fn append_truncates_bytes_beyond_declared_length() {
        let (engine, _s, _o) = make_engine().await;
        let info = engine
            .create(CreateRequest {
                total_size: 3,
                file_name: None,
                expected_checksum: None,
            })
            .await
            .unwrap();

        let after = engine
            .append(&info.upload_uri, 0, chunk(b"hello world"))
            .await
            .unwrap();
        assert_eq!(after.offset, 3);
        assert_eq!(after.status, UploadStatus::Transferred);
    }

    #[tokio::test]
    async fn terminate_removes_row_and_staging_bytes() {
        let (engine, _s, _o) = make_engine().await;
        let info = engine
            .create(CreateRequest {
                total_size: 5,
                file_name: None,
                expected_checksum: None,
            })
            .await
            .unwrap();

        engine.terminate(&info.upload_uri).await.unwrap();
        assert!(matches!(
            engine.inspect(&info.upload_uri).await.unwrap_err(),
            TusError::NotFound
        ));
    }

    #[tokio::test]
    async fn progress_list_reports_every_upload() {
        let (engine, _s, _o) = make_engine().await;
        engine
            .create(CreateRequest {
                total_size: 5,
                file_name: None,
                expected_checksum: None,
            })
            .await
            .unwrap();
        engine
            .create(CreateRequest {
                total_size: 8,
                file_name: None,
                expected_checksum: None,
            })
            .await
            .unwrap();

        let all = engine.progress_list().await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
