//! Remote object storage seam the completion pipeline promotes finished
//! uploads into (component E's downstream collaborator).

use std::path::PathBuf;

use salvo_core::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{TusError, TusResult};

/// Durable object storage a completed upload is promoted into. A real
/// deployment backs this with S3-compatible storage via
/// [`EngineConfig::object_store`](crate::config::ObjectStoreConfig); the
/// filesystem implementation below exists for tests and the demo server.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Uploads `bytes` under `key`, returning nothing on success. Failures
    /// here are pipeline-fatal (§4.E, §7).
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> TusResult<()>;

    /// Returns a URL a client can use to fetch the promoted object. Not
    /// necessarily presigned/time-limited for the filesystem implementation.
    fn object_url(&self, key: &str) -> String;
}

/// Reference `ObjectStore` that writes promoted files to a local directory,
/// standing in for an S3-compatible bucket in tests and the demo server.
#[derive(Clone)]
pub struct FilesystemObjectStore {
    root: PathBuf,
    base_url: String,
}

impl FilesystemObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> TusResult<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TusError::RemoteStoreIO(e.to_string()))?;
        }
        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| TusError::RemoteStoreIO(e.to_string()))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| TusError::RemoteStoreIO(e.to_string()))?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_object_writes_file_to_root() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemObjectStore::new(dir.path(), "https://objects.example");
        store.put_object("abc/file.bin", b"hello".to_vec()).await.unwrap();

        let contents = tokio::fs::read(dir.path().join("abc/file.bin")).await.unwrap();
        assert_eq!(contents, b"hello");
    }

    #[test]
    fn object_url_joins_base_and_key() {
        let store = FilesystemObjectStore::new("/tmp/objects", "https://objects.example/");
        assert_eq!(
            store.object_url("abc/file.bin"),
            "https://objects.example/abc/file.bin"
        );
    }
}
