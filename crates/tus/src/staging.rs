//! Byte-level staging storage (component C), adapted from the teacher's
//! `DiskStore`. Unlike the teacher, this module owns only bytes — offset
//! and lifecycle bookkeeping live in [`crate::metadata_store`], so writes
//! here are pure positioned appends with no JSON sidecar.

use std::io::SeekFrom;
use std::path::PathBuf;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use salvo_core::async_trait;
use tokio::fs;
use tokio::io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{TusError, TusResult};

pub type ByteStream = std::pin::Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Positioned, append-only byte storage for in-flight uploads.
#[async_trait]
pub trait StagingStore: Send + Sync + 'static {
    /// Creates an empty staging file for `uri`. Errors if one already exists.
    async fn create(&self, uri: &str) -> TusResult<()>;

    /// Appends `stream` at `offset`, returning the number of bytes written.
    /// Rejects (without partial write beyond `offset`) if `offset` does not
    /// match the file's current length.
    async fn append_at(&self, uri: &str, offset: u64, stream: ByteStream) -> TusResult<u64>;

    /// Current length of the staging file in bytes.
    async fn length(&self, uri: &str) -> TusResult<u64>;

    /// Opens the staging file for reading in full, for the completion
    /// pipeline's checksum/promotion steps.
    async fn open(&self, uri: &str) -> TusResult<tokio::fs::File>;

    async fn delete(&self, uri: &str) -> TusResult<()>;
}

fn uri_to_filename(uri: &str) -> String {
    uri.rsplit('/').next().unwrap_or(uri).to_string()
}

/// Disk-backed staging store rooted at a configured directory.
#[derive(Clone)]
pub struct DiskStagingStore {
    root: PathBuf,
}

impl DiskStagingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, uri: &str) -> PathBuf {
        self.root.join(format!("{}.bin", uri_to_filename(uri)))
    }

    async fn ensure_root(&self) -> TusResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| TusError::StorageIO(e.to_string()))
    }
}

#[async_trait]
impl StagingStore for DiskStagingStore {
    async fn create(&self, uri: &str) -> TusResult<()> {
        self.ensure_root().await?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(uri))
            .await
            .map_err(|e| TusError::StorageIO(e.to_string()))?;
        Ok(())
    }

    async fn append_at(&self, uri: &str, offset: u64, stream: ByteStream) -> TusResult<u64> {
        self.ensure_root().await?;
        let path = self.path_for(uri);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => TusError::NotFound,
                _ => TusError::StorageIO(e.to_string()),
            })?;

        let current_len = file
            .metadata()
            .await
            .map_err(|e| TusError::StorageIO(e.to_string()))?
            .len();
        if current_len != offset {
            return Err(TusError::OffsetMismatch {
                expected: current_len,
                got: offset,
            });
        }

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| TusError::StorageIO(e.to_string()))?;

        let mut written: u64 = 0;
        let mut stream = stream;
        while let Some(item) = stream.next().await {
            let chunk = item.map_err(|e| TusError::StorageIO(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TusError::StorageIO(e.to_string()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| TusError::StorageIO(e.to_string()))?;

        Ok(written)
    }

    async fn length(&self, uri: &str) -> TusResult<u64> {
        let path = self.path_for(uri);
        let meta = fs::metadata(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TusError::NotFound,
            _ => TusError::StorageIO(e.to_string()),
        })?;
        Ok(meta.len())
    }

    async fn open(&self, uri: &str) -> TusResult<tokio::fs::File> {
        let path = self.path_for(uri);
        fs::File::open(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TusError::NotFound,
            _ => TusError::StorageIO(e.to_string()),
        })
    }

    async fn delete(&self, uri: &str) -> TusResult<()> {
        let path = self.path_for(uri);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TusError::StorageIO(e.to_string())),
        }
    }
}

/// Truncates `stream` to at most `limit` bytes, dropping anything past it.
/// Used by the APPEND handler to enforce `totalSize - offset` (§4.D, §7):
/// the server writes up to the declared length and discards the rest
/// rather than growing the staging file past `totalSize`.
pub fn limit_bytes(stream: ByteStream, limit: u64) -> ByteStream {
    Box::pin(futures_util::stream::unfold(
        (stream, limit),
        |(mut stream, remaining)| async move {
            if remaining == 0 {
                return None;
            }
            match stream.next().await {
                Some(Ok(chunk)) => {
                    let take = (chunk.len() as u64).min(remaining) as usize;
                    Some((Ok(chunk.slice(0..take)), (stream, remaining - take as u64)))
                }
                Some(Err(e)) => Some((Err(e), (stream, remaining))),
                None => None,
            }
        },
    ))
}

/// Reads a staging file in full, used by the completion pipeline's
/// checksum step. Not part of the `StagingStore` trait since only the
/// pipeline needs whole-file reads.
pub async fn read_all(file: &mut tokio::fs::File) -> TusResult<Vec<u8>> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))
        .await
        .map_err(|e| TusError::StorageIO(e.to_string()))?;
    file.read_to_end(&mut buf)
        .await
        .map_err(|e| TusError::StorageIO(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tempfile::TempDir;

    fn chunk_stream(bytes: &'static [u8]) -> ByteStream {
        Box::pin(stream::iter(vec![Ok(Bytes::from_static(bytes))]))
    }

    #[tokio::test]
    async fn create_then_append_then_length() {
        let dir = TempDir::new().unwrap();
        let store = DiskStagingStore::new(dir.path());
        store.create("/files/abc").await.unwrap();

        let written = store
            .append_at("/files/abc", 0, chunk_stream(b"hello"))
            .await
            .unwrap();
        assert_eq!(written, 5);
        assert_eq!(store.length("/files/abc").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn append_rejects_offset_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = DiskStagingStore::new(dir.path());
        store.create("/files/abc").await.unwrap();
        store
            .append_at("/files/abc", 0, chunk_stream(b"hello"))
            .await
            .unwrap();

        let err = store
            .append_at("/files/abc", 0, chunk_stream(b"world"))
            .await
            .unwrap_err();
        assert!(matches!(err, TusError::OffsetMismatch { expected: 5, got: 0 }));
    }

    #[tokio::test]
    async fn append_at_missing_uri_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = DiskStagingStore::new(dir.path());
        let err = store
            .append_at("/files/missing", 0, chunk_stream(b"hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, TusError::NotFound));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = DiskStagingStore::new(dir.path());
        store.create("/files/abc").await.unwrap();
        store.delete("/files/abc").await.unwrap();
        store.delete("/files/abc").await.unwrap();
    }

    #[tokio::test]
    async fn limit_bytes_truncates_excess() {
        let stream = chunk_stream(b"hello world");
        let mut limited = limit_bytes(stream, 5);
        let mut collected = Vec::new();
        while let Some(item) = limited.next().await {
            collected.extend_from_slice(&item.unwrap());
        }
        assert_eq!(collected, b"hello");
    }

    #[tokio::test]
    async fn limit_bytes_passes_through_when_under_limit() {
        let stream = chunk_stream(b"hi");
        let mut limited = limit_bytes(stream, 100);
        let mut collected = Vec::new();
        while let Some(item) = limited.next().await {
            collected.extend_from_slice(&item.unwrap());
        }
        assert_eq!(collected, b"hi");
    }

    #[tokio::test]
    async fn read_all_returns_full_contents() {
        let dir = TempDir::new().unwrap();
        let store = DiskStagingStore::new(dir.path());
        store.create("/files/abc").await.unwrap();
        store
            .append_at("/files/abc", 0, chunk_stream(b"hello"))
            .await
            .unwrap();

        let mut file = store.open("/files/abc").await.unwrap();
        let bytes = read_all(&mut file).await.unwrap();
        assert_eq!(bytes, b"hello");
    }
}
