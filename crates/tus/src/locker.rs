//! In-process advisory locking keyed by upload URI (component C's lock
//! seam), adapted from the teacher's `lockers` module.

use std::collections::HashMap;
use std::sync::Arc;

use salvo_core::async_trait;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::error::TusResult;

/// Holds a lock for as long as it's alive; dropping it releases the lock.
pub enum LockGuard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
}

/// Per-URI advisory locking so concurrent requests against the same upload
/// serialize, while unrelated uploads never contend (§5).
#[async_trait]
pub trait Locker: Send + Sync + 'static {
    async fn read_lock(&self, uri: &str) -> TusResult<LockGuard>;
    async fn write_lock(&self, uri: &str) -> TusResult<LockGuard>;
}

/// Reference `Locker` backed by a map of `Arc<RwLock<()>>`, one per URI,
/// created lazily and retained for the process lifetime.
#[derive(Default)]
pub struct MemoryLocker {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl MemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, uri: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(uri.to_string()).or_default().clone()
    }
}

#[async_trait]
impl Locker for MemoryLocker {
    async fn read_lock(&self, uri: &str) -> TusResult<LockGuard> {
        let lock = self.lock_for(uri).await;
        Ok(LockGuard::Read(lock.read_owned().await))
    }

    async fn write_lock(&self, uri: &str) -> TusResult<LockGuard> {
        let lock = self.lock_for(uri).await;
        Ok(LockGuard::Write(lock.write_owned().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn write_lock_excludes_concurrent_write_lock() {
        let locker = Arc::new(MemoryLocker::new());
        let first = locker.write_lock("/files/abc").await.unwrap();

        let locker2 = locker.clone();
        let attempt = tokio::spawn(async move { locker2.write_lock("/files/abc").await.unwrap() });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!attempt.is_finished());

        drop(first);
        let second = attempt.await.unwrap();
        drop(second);
    }

    #[tokio::test]
    async fn distinct_uris_do_not_contend() {
        let locker = MemoryLocker::new();
        let a = locker.write_lock("/files/a").await.unwrap();
        let b = locker.write_lock("/files/b").await.unwrap();
        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn multiple_read_locks_coexist() {
        let locker = MemoryLocker::new();
        let a = locker.read_lock("/files/abc").await.unwrap();
        let b = locker.read_lock("/files/abc").await.unwrap();
        drop(a);
        drop(b);
    }
}
