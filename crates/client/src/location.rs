//! Client Location Store (component B, §4.B): durable fingerprint → server
//! URL mapping so a restarted client recognizes an in-flight upload without
//! re-asking the server for every local file it knows about.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use crate::error::ClientResult;

/// `put`/`get`/`remove` over the fingerprint → URL mapping. `get` self-heals:
/// a stored string that no longer parses as a URL is treated as absent and
/// dropped, rather than returned to the caller.
#[async_trait::async_trait]
pub trait LocationStore: Send + Sync + 'static {
    async fn put(&self, fingerprint: &str, url: &str) -> ClientResult<()>;
    async fn get(&self, fingerprint: &str) -> ClientResult<Option<Url>>;
    async fn remove(&self, fingerprint: &str) -> ClientResult<()>;
}

/// In-process reference implementation, used by tests and as the default
/// when no `store-sqlite` backing is configured.
#[derive(Clone, Default)]
pub struct InMemoryLocationStore {
    rows: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn put(&self, fingerprint: &str, url: &str) -> ClientResult<()> {
        let mut rows = self.rows.lock().await;
        rows.insert(fingerprint.to_string(), url.to_string());
        Ok(())
    }

    async fn get(&self, fingerprint: &str) -> ClientResult<Option<Url>> {
        let mut rows = self.rows.lock().await;
        let Some(raw) = rows.get(fingerprint).cloned() else {
            return Ok(None);
        };
        match Url::parse(&raw) {
            Ok(url) => Ok(Some(url)),
            Err(_) => {
                rows.remove(fingerprint);
                Ok(None)
            }
        }
    }

    async fn remove(&self, fingerprint: &str) -> ClientResult<()> {
        let mut rows = self.rows.lock().await;
        rows.remove(fingerprint);
        Ok(())
    }
}

#[cfg(feature = "store-sqlite")]
pub mod sqlite {
    use sqlx::{Row, SqlitePool};

    use super::{ClientResult, LocationStore, Url};
    use crate::error::ClientError;

    /// `sqlx`-backed implementation against SQLite, giving the `ClientLocation`
    /// table concrete persistence across restarts.
    #[derive(Clone)]
    pub struct SqliteLocationStore {
        pool: SqlitePool,
    }

    impl SqliteLocationStore {
        pub fn new(pool: SqlitePool) -> Self {
            Self { pool }
        }

        pub async fn migrate(&self) -> ClientResult<()> {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS client_location (
                    fingerprint TEXT PRIMARY KEY,
                    url TEXT NOT NULL
                )
                "#,
            )
            .execute(&self.pool)
            .await
            .map_err(|e| ClientError::FileIO(e.to_string()))?;
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl LocationStore for SqliteLocationStore {
        async fn put(&self, fingerprint: &str, url: &str) -> ClientResult<()> {
            sqlx::query(
                "INSERT INTO client_location (fingerprint, url) VALUES (?, ?)
                 ON CONFLICT(fingerprint) DO UPDATE SET url = excluded.url",
            )
            .bind(fingerprint)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| ClientError::FileIO(e.to_string()))?;
            Ok(())
        }

        async fn get(&self, fingerprint: &str) -> ClientResult<Option<Url>> {
            let row = sqlx::query("SELECT url FROM client_location WHERE fingerprint = ?")
                .bind(fingerprint)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ClientError::FileIO(e.to_string()))?;
            let Some(row) = row else {
                return Ok(None);
            };
            let raw: String = row
                .try_get("url")
                .map_err(|e| ClientError::FileIO(e.to_string()))?;
            match Url::parse(&raw) {
                Ok(url) => Ok(Some(url)),
                Err(_) => {
                    self.remove(fingerprint).await?;
                    Ok(None)
                }
            }
        }

        async fn remove(&self, fingerprint: &str) -> ClientResult<()> {
            sqlx::query("DELETE FROM client_location WHERE fingerprint = ?")
                .bind(fingerprint)
                .execute(&self.pool)
                .await
                .map_err(|e| ClientError::FileIO(e.to_string()))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryLocationStore::new();
        store.put("fp1", "https://example.com/files/abc").await.unwrap();
        let url = store.get("fp1").await.unwrap().unwrap();
        assert_eq!(url.as_str(), "https://example.com/files/abc");
    }

    #[tokio::test]
    async fn get_self_heals_malformed_url() {
        let store = InMemoryLocationStore::new();
        store.put("fp1", "not a url").await.unwrap();
        assert!(store.get("fp1").await.unwrap().is_none());
        // self-heal removed the row; a second get also returns none without error
        assert!(store.get("fp1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_drops_the_row() {
        let store = InMemoryLocationStore::new();
        store.put("fp1", "https://example.com/files/abc").await.unwrap();
        store.remove("fp1").await.unwrap();
        assert!(store.get("fp1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_missing_fingerprint_returns_none() {
        let store = InMemoryLocationStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
