//! Bounded-concurrency batch executor (§4.G): runs many files' uploads
//! concurrently under a permit semaphore, reporting COMPLETED/FAILED counts.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::uploader::{UploadOutcome, Uploader};

#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Permits held around each file's full upload lifecycle.
    pub max_concurrent: usize,
    /// Size of the worker pool the uploads are spawned onto.
    pub thread_pool_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            thread_pool_size: 5,
        }
    }
}

/// One file's batch result: either the uploader's success outcome or the
/// error it failed with.
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: Result<UploadOutcome, crate::error::ClientError>,
}

impl FileResult {
    pub fn is_completed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Aggregate counts the CLI reports at the end of a batch run.
#[derive(Clone, Debug, Default)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Builds the worker-thread pool the batch runs on (`thread_pool_size`, the
/// batch executor's second limit alongside the concurrency semaphore).
pub fn build_runtime(config: &BatchConfig) -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.thread_pool_size.max(1))
        .enable_all()
        .build()
}

/// Uploads `paths` concurrently, bounded by `config.max_concurrent` permits.
/// Must run on a runtime sized by [`build_runtime`] for `thread_pool_size` to
/// take effect.
pub async fn run_batch(uploader: Arc<Uploader>, paths: Vec<PathBuf>, config: BatchConfig) -> (Vec<FileResult>, BatchSummary) {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let semaphore = semaphore.clone();
        let uploader = uploader.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let outcome = uploader.upload_file(&path).await;
            FileResult { path, outcome }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(join_err) => {
                tracing::error!(error = %join_err, "upload task panicked");
            }
        }
    }

    let mut summary = BatchSummary::default();
    for result in &results {
        if result.is_completed() {
            summary.completed += 1;
        } else {
            summary.failed += 1;
        }
    }

    (results, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::InMemoryLocationStore;
    use crate::uploader::UploaderConfig;
    use reqwest::Url;

    #[tokio::test]
    async fn batch_reports_failure_when_file_is_missing() {
        let uploader = Arc::new(Uploader::new(
            Url::parse("http://127.0.0.1:1/files").unwrap(),
            Arc::new(InMemoryLocationStore::new()),
            UploaderConfig::default(),
        ));
        let paths = vec![PathBuf::from("/nonexistent/does-not-exist.bin")];
        let (results, summary) = run_batch(uploader, paths, BatchConfig::default()).await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].is_completed());
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn batch_summary_counts_multiple_files() {
        let uploader = Arc::new(Uploader::new(
            Url::parse("http://127.0.0.1:1/files").unwrap(),
            Arc::new(InMemoryLocationStore::new()),
            UploaderConfig::default(),
        ));
        let paths = vec![
            PathBuf::from("/nonexistent/a.bin"),
            PathBuf::from("/nonexistent/b.bin"),
        ];
        let (results, summary) = run_batch(uploader, paths, BatchConfig::default()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.completed, 0);
    }
}
