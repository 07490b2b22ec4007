//! Durable store for [`FileInfo`], the one record per upload session that
//! tracks offset and lifecycle status (component A).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use salvo_core::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{TusError, TusResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Uploading,
    Completed,
    Transferred,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Transferred => "transferred",
            UploadStatus::Failed => "failed",
        }
    }
}

/// One row in the upload metadata store; see data model §3 `FileInfo`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileInfo {
    pub upload_uri: String,
    pub file_name: String,
    pub total_size: u64,
    pub offset: u64,
    pub status: UploadStatus,
    pub expected_checksum: Option<String>,
    pub checksum_verified: bool,
    pub object_key: Option<String>,
    pub callback_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileInfo {
    pub fn new(upload_uri: impl Into<String>, file_name: impl Into<String>, total_size: u64) -> Self {
        let now = Utc::now();
        Self {
            upload_uri: upload_uri.into(),
            file_name: file_name.into(),
            total_size,
            offset: 0,
            status: UploadStatus::Uploading,
            expected_checksum: None,
            checksum_verified: false,
            object_key: None,
            callback_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn upload_id(&self) -> &str {
        self.upload_uri
            .rsplit('/')
            .next()
            .unwrap_or(&self.upload_uri)
    }

    pub fn percent(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        ((self.offset as f64 / self.total_size as f64) * 100.0 * 100.0).round() / 100.0
    }
}

/// Durable offset/metadata store (component A). Mutations that move
/// `status` out of `uploading` must be atomic with respect to concurrent
/// callers racing the same URI; see [`MetadataStore::complete_if_uploading`].
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn insert(&self, info: FileInfo) -> TusResult<()>;
    async fn find_by_uri(&self, uri: &str) -> TusResult<Option<FileInfo>>;
    async fn save(&self, info: FileInfo) -> TusResult<()>;
    async fn delete(&self, uri: &str) -> TusResult<()>;
    async fn find_all(&self) -> TusResult<Vec<FileInfo>>;
    async fn find_stale_uploading(&self, older_than: DateTime<Utc>) -> TusResult<Vec<FileInfo>>;

    /// Conditionally transition `uploading -> completed`, succeeding only if
    /// the row is still `uploading` at `expected_offset`. Returns `true` iff
    /// this call performed the transition, so exactly one concurrent APPEND
    /// triggers the completion pipeline (§5).
    async fn complete_if_uploading(&self, uri: &str, expected_offset: u64) -> TusResult<bool>;

    /// Conditionally deletes the row, succeeding only if `updated_at` still
    /// matches `expected_updated_at`. Used by the sweeper (§4.F) so a row
    /// touched by a concurrent APPEND after the staleness query survives.
    async fn delete_if_unchanged(
        &self,
        uri: &str,
        expected_updated_at: DateTime<Utc>,
    ) -> TusResult<bool>;
}

/// In-process reference implementation, used by tests and as the default
/// when no `store-sqlite` backing is configured.
#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    rows: Arc<Mutex<HashMap<String, FileInfo>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert(&self, info: FileInfo) -> TusResult<()> {
        let mut rows = self.rows.lock().await;
        rows.insert(info.upload_uri.clone(), info);
        Ok(())
    }

    async fn find_by_uri(&self, uri: &str) -> TusResult<Option<FileInfo>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(uri).cloned())
    }

    async fn save(&self, info: FileInfo) -> TusResult<()> {
        let mut rows = self.rows.lock().await;
        rows.insert(info.upload_uri.clone(), info);
        Ok(())
    }

    async fn delete(&self, uri: &str) -> TusResult<()> {
        let mut rows = self.rows.lock().await;
        rows.remove(uri);
        Ok(())
    }

    async fn find_all(&self) -> TusResult<Vec<FileInfo>> {
        let rows = self.rows.lock().await;
        Ok(rows.values().cloned().collect())
    }

    async fn find_stale_uploading(&self, older_than: DateTime<Utc>) -> TusResult<Vec<FileInfo>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|info| info.status == UploadStatus::Uploading && info.updated_at < older_than)
            .cloned()
            .collect())
    }

    async fn complete_if_uploading(&self, uri: &str, expected_offset: u64) -> TusResult<bool> {
        let mut rows = self.rows.lock().await;
        let Some(info) = rows.get_mut(uri) else {
            return Err(TusError::NotFound);
        };
        if info.status != UploadStatus::Uploading || info.offset != expected_offset {
            return Ok(false);
        }
        info.status = UploadStatus::Completed;
        info.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_if_unchanged(
        &self,
        uri: &str,
        expected_updated_at: DateTime<Utc>,
    ) -> TusResult<bool> {
        let mut rows = self.rows.lock().await;
        let Some(info) = rows.get(uri) else {
            return Ok(false);
        };
        if info.updated_at != expected_updated_at {
            return Ok(false);
        }
        rows.remove(uri);
        Ok(true)
    }
}

#[cfg(feature = "store-sqlite")]
pub mod sqlite {
    use chrono::{DateTime, Utc};
    use salvo_core::async_trait;
    use sqlx::{Row, SqlitePool};

    use super::{FileInfo, MetadataStore, UploadStatus};
    use crate::error::{TusError, TusResult};

    /// `sqlx`-backed implementation against SQLite, fulfilling the
    /// "relational persistence driver" collaborator concretely.
    #[derive(Clone)]
    pub struct SqliteMetadataStore {
        pool: SqlitePool,
    }

    impl SqliteMetadataStore {
        pub fn new(pool: SqlitePool) -> Self {
            Self { pool }
        }

        pub async fn migrate(&self) -> TusResult<()> {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS file_info (
                    upload_uri TEXT PRIMARY KEY,
                    file_name TEXT NOT NULL,
                    total_size INTEGER NOT NULL,
                    offset INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    expected_checksum TEXT,
                    checksum_verified INTEGER NOT NULL,
                    object_key TEXT,
                    callback_sent INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            )
            .execute(&self.pool)
            .await
            .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            Ok(())
        }

        fn row_to_info(row: &sqlx::sqlite::SqliteRow) -> TusResult<FileInfo> {
            let status = match row
                .try_get::<String, _>("status")
                .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?
                .as_str()
            {
                "uploading" => UploadStatus::Uploading,
                "completed" => UploadStatus::Completed,
                "transferred" => UploadStatus::Transferred,
                "failed" => UploadStatus::Failed,
                other => {
                    return Err(TusError::MetadataStoreIO(format!(
                        "unknown status in row: {other}"
                    )));
                }
            };
            Ok(FileInfo {
                upload_uri: row
                    .try_get("upload_uri")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?,
                file_name: row
                    .try_get("file_name")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?,
                total_size: row
                    .try_get::<i64, _>("total_size")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))? as u64,
                offset: row
                    .try_get::<i64, _>("offset")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))? as u64,
                status,
                expected_checksum: row
                    .try_get("expected_checksum")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?,
                checksum_verified: row
                    .try_get::<i64, _>("checksum_verified")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?
                    != 0,
                object_key: row
                    .try_get("object_key")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?,
                callback_sent: row
                    .try_get::<i64, _>("callback_sent")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?
                    != 0,
                created_at: row
                    .try_get("created_at")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?,
                updated_at: row
                    .try_get("updated_at")
                    .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?,
            })
        }
    }

    #[async_trait]
    impl MetadataStore for SqliteMetadataStore {
        async fn insert(&self, info: FileInfo) -> TusResult<()> {
            sqlx::query(
                r#"INSERT INTO file_info
                    (upload_uri, file_name, total_size, offset, status, expected_checksum,
                     checksum_verified, object_key, callback_sent, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&info.upload_uri)
            .bind(&info.file_name)
            .bind(info.total_size as i64)
            .bind(info.offset as i64)
            .bind(info.status.as_str())
            .bind(&info.expected_checksum)
            .bind(info.checksum_verified as i64)
            .bind(&info.object_key)
            .bind(info.callback_sent as i64)
            .bind(info.created_at)
            .bind(info.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            Ok(())
        }

        async fn find_by_uri(&self, uri: &str) -> TusResult<Option<FileInfo>> {
            let row = sqlx::query("SELECT * FROM file_info WHERE upload_uri = ?")
                .bind(uri)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            row.as_ref().map(Self::row_to_info).transpose()
        }

        async fn save(&self, info: FileInfo) -> TusResult<()> {
            sqlx::query(
                r#"UPDATE file_info SET file_name = ?, total_size = ?, offset = ?, status = ?,
                    expected_checksum = ?, checksum_verified = ?, object_key = ?,
                    callback_sent = ?, updated_at = ? WHERE upload_uri = ?"#,
            )
            .bind(&info.file_name)
            .bind(info.total_size as i64)
            .bind(info.offset as i64)
            .bind(info.status.as_str())
            .bind(&info.expected_checksum)
            .bind(info.checksum_verified as i64)
            .bind(&info.object_key)
            .bind(info.callback_sent as i64)
            .bind(info.updated_at)
            .bind(&info.upload_uri)
            .execute(&self.pool)
            .await
            .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            Ok(())
        }

        async fn delete(&self, uri: &str) -> TusResult<()> {
            sqlx::query("DELETE FROM file_info WHERE upload_uri = ?")
                .bind(uri)
                .execute(&self.pool)
                .await
                .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            Ok(())
        }

        async fn find_all(&self) -> TusResult<Vec<FileInfo>> {
            let rows = sqlx::query("SELECT * FROM file_info")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            rows.iter().map(Self::row_to_info).collect()
        }

        async fn find_stale_uploading(&self, older_than: DateTime<Utc>) -> TusResult<Vec<FileInfo>> {
            let rows = sqlx::query(
                "SELECT * FROM file_info WHERE status = 'uploading' AND updated_at < ?",
            )
            .bind(older_than)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            rows.iter().map(Self::row_to_info).collect()
        }

        async fn complete_if_uploading(&self, uri: &str, expected_offset: u64) -> TusResult<bool> {
            let result = sqlx::query(
                r#"UPDATE file_info SET status = 'completed', updated_at = ?
                   WHERE upload_uri = ? AND status = 'uploading' AND offset = ?"#,
            )
            .bind(Utc::now())
            .bind(uri)
            .bind(expected_offset as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            Ok(result.rows_affected() == 1)
        }

        async fn delete_if_unchanged(
            &self,
            uri: &str,
            expected_updated_at: DateTime<Utc>,
        ) -> TusResult<bool> {
            let result = sqlx::query(
                "DELETE FROM file_info WHERE upload_uri = ? AND updated_at = ?",
            )
            .bind(uri)
            .bind(expected_updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| TusError::MetadataStoreIO(e.to_string()))?;
            Ok(result.rows_affected() == 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let store = InMemoryMetadataStore::new();
        let info = FileInfo::new("/files/abc", "a.txt", 10);
        store.insert(info.clone()).await.unwrap();
        let found = store.find_by_uri("/files/abc").await.unwrap().unwrap();
        assert_eq!(found.upload_uri, "/files/abc");
        assert_eq!(found.status, UploadStatus::Uploading);
    }

    #[tokio::test]
    async fn complete_if_uploading_transitions_exactly_once() {
        let store = InMemoryMetadataStore::new();
        let mut info = FileInfo::new("/files/abc", "a.txt", 10);
        info.offset = 10;
        store.insert(info).await.unwrap();

        let first = store.complete_if_uploading("/files/abc", 10).await.unwrap();
        assert!(first);
        let second = store.complete_if_uploading("/files/abc", 10).await.unwrap();
        assert!(!second, "second racer must not also observe the transition");

        let found = store.find_by_uri("/files/abc").await.unwrap().unwrap();
        assert_eq!(found.status, UploadStatus::Completed);
    }

    #[tokio::test]
    async fn complete_if_uploading_rejects_offset_mismatch() {
        let store = InMemoryMetadataStore::new();
        let info = FileInfo::new("/files/abc", "a.txt", 10);
        store.insert(info).await.unwrap();

        let transitioned = store.complete_if_uploading("/files/abc", 5).await.unwrap();
        assert!(!transitioned);
    }

    #[tokio::test]
    async fn find_stale_uploading_only_returns_idle_rows() {
        let store = InMemoryMetadataStore::new();
        let mut stale = FileInfo::new("/files/stale", "s.txt", 5);
        stale.updated_at = Utc::now() - chrono::Duration::hours(48);
        store.insert(stale).await.unwrap();

        let fresh = FileInfo::new("/files/fresh", "f.txt", 5);
        store.insert(fresh).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(24);
        let results = store.find_stale_uploading(cutoff).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].upload_uri, "/files/stale");
    }

    #[test]
    fn percent_handles_zero_total_size() {
        let info = FileInfo::new("/files/empty", "e.txt", 0);
        assert_eq!(info.percent(), 0.0);
    }

    #[test]
    fn percent_rounds_to_two_decimals() {
        let mut info = FileInfo::new("/files/abc", "a.txt", 3);
        info.offset = 1;
        assert_eq!(info.percent(), 33.33);
    }

    #[test]
    fn upload_id_is_last_path_segment() {
        let info = FileInfo::new("/files/abc123", "a.txt", 10);
        assert_eq!(info.upload_id(), "abc123");
    }
}
